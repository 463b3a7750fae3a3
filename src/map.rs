//! Leaflet map of node locations.
//!
//! The view is always centered on [`DEFAULT_CENTER`] at [`DEFAULT_ZOOM`];
//! markers never move the initial viewport.

use std::path::Path;

use serde::Serialize;
use tera::Context;
use tracing::debug;

use crate::{error::Result, html::Templates, Location};

// ---

pub const DEFAULT_CENTER: (f64, f64) = (19.0760, 72.8777);
pub const DEFAULT_ZOOM: u8 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

impl MapView {
    // ---
    /// One marker per location with usable coordinates; unset rows are skipped.
    pub fn from_locations(locations: &[Location]) -> Self {
        // ---
        let markers = locations
            .iter()
            .filter_map(|loc| match loc.coordinates() {
                Some((lat, lon)) => Some(Marker {
                    lat,
                    lon,
                    label: loc.node.clone(),
                }),
                None => {
                    debug!(
                        "Skipping node {} with unusable coordinates ({}, {})",
                        loc.node, loc.latitude, loc.longitude
                    );
                    None
                }
            })
            .collect();

        MapView {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            markers,
        }
    }

    fn context(&self) -> Context {
        // ---
        // Marker data lands inside <script>; "</" must not close the tag early.
        let markers = serde_json::to_string(&self.markers)
            .unwrap_or_else(|_| "[]".to_string())
            .replace("</", "<\\/");

        let mut ctx = Context::new();
        ctx.insert("title", "Plant map");
        ctx.insert("center_lat", &self.center.0);
        ctx.insert("center_lon", &self.center.1);
        ctx.insert("zoom", &self.zoom);
        ctx.insert("markers", &markers);
        ctx
    }

    /// Embeddable HTML: the map container, Leaflet assets and the init script.
    pub fn render_fragment(&self, templates: &Templates) -> Result<String> {
        Ok(templates.render("map_fragment.html", &self.context())?)
    }

    /// Standalone page wrapping the fragment.
    pub fn render_page(&self, templates: &Templates) -> Result<String> {
        Ok(templates.render("map.html", &self.context())?)
    }

    /// Persist the standalone page to `path`, creating parent directories.
    pub async fn write_page(&self, templates: &Templates, path: &Path) -> Result<String> {
        // ---
        let page = self.render_page(templates)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &page).await?;
        debug!("Map written to {}", path.display());
        Ok(page)
    }
}
