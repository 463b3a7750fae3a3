//! Operator location editing.
//!
//! Updates are unconditional; an unknown node or row id changes zero rows
//! and still redirects like a successful save. Node names are matched
//! exactly as sent, without trimming.

use std::fmt;

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::{required, AppState};
use crate::{
    error::{AppError, Result},
    store, Db,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/latlogedit", get(list_locations).post(save_location))
        .route("/edit", get(edit_list))
        .route("/edit/{node}", get(edit_node).post(save_node))
}

/// Bulk editor form: a row addressed by location `id` or by `node`, plus
/// both coordinates. `id` wins when both are sent.
#[derive(Debug, Deserialize)]
struct LocationForm {
    id: Option<String>,
    node: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<String>,
    #[serde(alias = "longitude")]
    long: Option<String>,
}

/// Single-node form; the node comes from the path.
#[derive(Debug, Deserialize)]
struct CoordinatesForm {
    #[serde(alias = "lat")]
    latitude: Option<String>,
    #[serde(alias = "long")]
    longitude: Option<String>,
}

/// Which location row an update addresses.
#[derive(Debug)]
enum Target {
    Id(i64),
    Node(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "location id {id}"),
            Target::Node(node) => write!(f, "node {node}"),
        }
    }
}

impl LocationForm {
    // ---
    fn target(&self) -> Result<Target> {
        // ---
        match self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id
                .parse()
                .map(Target::Id)
                .map_err(|_| AppError::validation(format!("Invalid id: {id}"))),
            None => required(self.node.clone(), "node").map(Target::Node),
        }
    }
}

async fn apply_update(db: &Db, target: &Target, latitude: &str, longitude: &str) -> Result<()> {
    // ---
    let mut conn = db.acquire().await?;
    let changed = match target {
        Target::Id(id) => {
            store::update_location_by_id(&mut conn, *id, latitude, longitude).await?
        }
        Target::Node(node) => {
            store::update_location(&mut conn, node, latitude, longitude).await?
        }
    };

    if changed == 0 {
        warn!("Location update for unknown {} changed no rows", target);
    } else {
        info!("{} location set to ({}, {})", target, latitude, longitude);
    }
    Ok(())
}

async fn list_locations(
    State((db, _config, templates)): State<AppState>,
) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let locations = store::get_locations(&mut conn).await?;
    info!("GET /latlogedit - {} locations", locations.len());
    Ok(Html(templates.location_editor(&locations)?))
}

async fn save_location(
    State((db, _config, _templates)): State<AppState>,
    Form(form): Form<LocationForm>,
) -> Result<Redirect> {
    // ---
    let target = form.target()?;
    let lat = required(form.lat, "lat")?;
    let long = required(form.long, "long")?;

    apply_update(&db, &target, &lat, &long).await?;
    Ok(Redirect::to("/latlogedit"))
}

async fn edit_list(State((db, _config, templates)): State<AppState>) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let locations = store::get_locations(&mut conn).await?;
    Ok(Html(templates.edit_list(&locations)?))
}

async fn edit_node(
    Path(node): Path<String>,
    State((db, _config, templates)): State<AppState>,
) -> Result<Html<String>> {
    // ---
    let mut conn = db.acquire().await?;
    let location = store::get_location(&mut conn, &node).await?;
    info!("GET /edit/{}", node);
    Ok(Html(templates.edit_node(&node, location.as_ref())?))
}

async fn save_node(
    Path(node): Path<String>,
    State((db, _config, _templates)): State<AppState>,
    Form(form): Form<CoordinatesForm>,
) -> Result<Redirect> {
    // ---
    let target = Target::Node(required(Some(node), "node")?);
    let latitude = required(form.latitude, "latitude")?;
    let longitude = required(form.longitude, "longitude")?;

    apply_update(&db, &target, &latitude, &longitude).await?;
    Ok(Redirect::to("/edit"))
}
