use axum::Router;

use crate::{error::AppError, html::Templates, Config, Db};

mod apis;
mod health;
mod history;
mod locations;
mod map;
mod nodes;
mod upload;

// ---

/// State shared by every route: the connection factory, the loaded config
/// and the compiled page templates.
pub type AppState = (Db, Config, Templates);

pub fn router(db: Db, config: Config, templates: Templates) -> Router {
    // ---
    Router::new()
        .merge(upload::router())
        .merge(history::router())
        .merge(nodes::router())
        .merge(locations::router())
        .merge(map::router())
        .merge(apis::router())
        .merge(health::router())
        .with_state((db, config, templates))
}

/// A required field exactly as sent, or a validation error naming it.
///
/// Whitespace-only counts as missing, but accepted values are not trimmed:
/// `"A1 "` and `"A1"` are different nodes.
fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    // ---
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation(format!("Missing {field}")))
}
