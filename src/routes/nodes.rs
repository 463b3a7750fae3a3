//! Per-node views: home page, node directory, and node HTML/JSON.
//!
//! Unknown nodes are not errors; their responses carry empty structures.

use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::{error::Result, store};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/", get(index))
        .route("/displaynode", get(display_nodes))
        .route("/displaynode/{node}", get(display_node))
        .route("/getnodejson/{node}", get(node_json))
        .route("/getnodelatestjson/{node}", get(node_latest_json))
}

/// `{}` for an absent value, its JSON form otherwise.
fn or_empty<T: Serialize>(value: Option<T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or_else(|| json!({}))
}

async fn index(State((db, _config, templates)): State<AppState>) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let total = store::count_measurements(&mut conn).await?;
    let latest = store::latest_per_node(&mut conn).await?;
    info!("GET / - {} records across {} nodes", total, latest.len());
    Ok(Html(templates.index(total, &latest)?))
}

async fn display_nodes(
    State((db, _config, templates)): State<AppState>,
) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let nodes = store::list_reporting_nodes(&mut conn).await?;
    let latest = store::latest_measurement(&mut conn).await?;
    info!("GET /displaynode - {} nodes", nodes.len());
    Ok(Html(templates.node_list(&nodes, latest.as_ref())?))
}

async fn display_node(
    Path(node): Path<String>,
    State((db, _config, templates)): State<AppState>,
) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let detail = store::get_node(&mut conn, &node).await?;
    info!("GET /displaynode/{} - {} records", node, detail.values.len());
    Ok(Html(templates.node_detail(&node, &detail)?))
}

async fn node_json(
    Path(node): Path<String>,
    State((db, _config, _templates)): State<AppState>,
) -> Result<Json<Value>> {
    // ---
    let mut conn = db.acquire().await?;
    let detail = store::get_node(&mut conn, &node).await?;
    info!("GET /getnodejson/{} - {} records", node, detail.values.len());

    Ok(Json(json!({
        "node_values": detail.values,
        "node_data": or_empty(detail.location),
        "latest_record": or_empty(detail.latest),
    })))
}

async fn node_latest_json(
    Path(node): Path<String>,
    State((db, _config, _templates)): State<AppState>,
) -> Result<Json<Value>> {
    // ---
    let mut conn = db.acquire().await?;
    let latest = store::latest_for_node(&mut conn, &node).await?;
    let location = store::get_location(&mut conn, &node).await?;
    info!("GET /getnodelatestjson/{}", node);

    Ok(Json(json!({
        "latest_record": or_empty(latest),
        "node_data": or_empty(location),
    })))
}
