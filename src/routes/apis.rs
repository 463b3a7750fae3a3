use axum::{extract::State, response::Html, routing::get, Router};

use super::AppState;
use crate::error::Result;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/apis", get(apis))
}

/// Endpoint reference rendered against the public base URL.
async fn apis(State((_db, config, templates)): State<AppState>) -> Result<Html<String>> {
    Ok(Html(templates.apis(&config.public_base_url)?))
}
