use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use tracing::info;

use super::AppState;
use crate::{error::Result, store, Measurement};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/history", get(history))
        .route("/latest", get(latest))
}

/// Every measurement, oldest first.
async fn history(
    State((db, _config, _templates)): State<AppState>,
) -> Result<Json<Vec<Measurement>>> {
    // ---
    let mut conn = db.acquire().await?;
    let records = store::list_measurements(&mut conn).await?;
    info!("GET /history - returning {} records", records.len());
    Ok(Json(records))
}

/// Most recent height of each node.
async fn latest(
    State((db, _config, _templates)): State<AppState>,
) -> Result<Json<BTreeMap<String, f64>>> {
    // ---
    let mut conn = db.acquire().await?;
    let latest = store::latest_per_node(&mut conn).await?;
    info!("GET /latest - returning {} nodes", latest.len());
    Ok(Json(latest))
}
