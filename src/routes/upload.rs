use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::request::Parts,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use super::{required, AppState};
use crate::{
    error::{AppError, Result},
    models::{format_timestamp, normalize_timestamp, parse_height},
    store, Measurement,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/uploadvalue", get(handler))
        .route("/uploaddata", get(handler))
}

/// Query parameters accepted by both upload paths.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(alias = "nodename")]
    node: Option<String>,
    #[serde(alias = "height")]
    plantheight: Option<String>,
    /// Optional caller-supplied time; the server clock is used otherwise.
    timestamp: Option<String>,
}

impl UploadQuery {
    // ---
    fn into_measurement(self, reporter_addr: Option<String>) -> Result<Measurement> {
        // ---
        let (node, raw_height) = match (
            required(self.node, "node"),
            required(self.plantheight, "plantheight"),
        ) {
            (Ok(node), Ok(height)) => (node, height),
            _ => return Err(AppError::validation("Missing node or plantheight")),
        };

        let height = parse_height(&raw_height).ok_or_else(|| {
            AppError::validation(format!("plantheight must be a number, got '{raw_height}'"))
        })?;

        let timestamp = match self.timestamp.filter(|t| !t.trim().is_empty()) {
            Some(raw) => normalize_timestamp(&raw).ok_or_else(|| {
                AppError::validation(format!("timestamp is not ISO-8601: '{raw}'"))
            })?,
            None => format_timestamp(Utc::now()),
        };

        Ok(Measurement {
            node,
            height,
            timestamp,
            reporter_addr,
        })
    }
}

/// Address of the reporting node: the peer socket, else the first forwarded hop.
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterAddr(pub Option<String>);

impl<S> FromRequestParts<S> for ReporterAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // ---
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let forwarded = || {
            parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(ReporterAddr(peer.or_else(forwarded)))
    }
}

async fn handler(
    Query(params): Query<UploadQuery>,
    ReporterAddr(reporter_addr): ReporterAddr,
    State((db, _config, _templates)): State<AppState>,
) -> Result<String> {
    // ---
    debug!("GET upload - params: {:?}, from: {:?}", params, reporter_addr);

    let measurement = params.into_measurement(reporter_addr)?;
    info!(
        "Received upload for node: {}, plantheight: {}",
        measurement.node, measurement.height
    );

    let mut conn = db.acquire().await?;
    let outcome = store::ingest(&mut conn, measurement).await?;
    debug!(
        "Upload stored: inserted={}, new node={}",
        outcome.inserted, outcome.location_created
    );
    let m = &outcome.measurement;

    Ok(format!(
        "db updated for {}: {}: {}",
        m.node, m.height, m.timestamp
    ))
}
