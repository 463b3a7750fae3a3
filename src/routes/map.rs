use axum::{extract::State, response::Html, routing::get, Router};
use tracing::info;

use super::AppState;
use crate::{error::Result, map::MapView, store, Db};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/mapplant", get(map_fragment))
        .route("/mapit", get(map_page))
        .route("/getmap", get(persisted_map))
}

async fn load_view(db: &Db) -> Result<MapView> {
    // ---
    let mut conn = db.acquire().await?;
    let locations = store::get_locations(&mut conn).await?;
    let view = MapView::from_locations(&locations);
    info!(
        "Map built with {} of {} locations",
        view.markers.len(),
        locations.len()
    );
    Ok(view)
}

/// Inline fragment for embedding into other pages.
async fn map_fragment(State((db, _config, templates)): State<AppState>) -> Result<Html<String>> {
    Ok(Html(load_view(&db).await?.render_fragment(&templates)?))
}

async fn map_page(State((db, _config, templates)): State<AppState>) -> Result<Html<String>> {
    Ok(Html(load_view(&db).await?.render_page(&templates)?))
}

/// Write the map page to the configured path, then serve what was written.
async fn persisted_map(State((db, config, templates)): State<AppState>) -> Result<Html<String>> {
    // ---
    let view = load_view(&db).await?;
    let page = view.write_page(&templates, &config.map_output_path).await?;
    info!("GET /getmap - saved to {}", config.map_output_path.display());
    Ok(Html(page))
}

#[cfg(test)]
mod tests {
    // ---
    use axum::http::StatusCode;

    use crate::routes::test_support::{app, app_with_map_path, get, post_form};

    #[tokio::test]
    async fn map_includes_only_located_nodes() {
        // ---
        let (router, _db) = app().await;
        get(&router, "/uploadvalue?node=A1&plantheight=12.5").await;
        get(&router, "/uploadvalue?node=B2&plantheight=3").await;
        post_form(&router, "/latlogedit", "node=A1&lat=19.07&long=72.87").await;

        let (status, body) = get(&router, "/mapplant").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"[{"lat":19.07,"lon":72.87,"label":"A1"}]"#));
        assert!(!body.contains(r#""label":"B2""#));
        assert!(!body.contains("<!DOCTYPE html>"));

        let (status, body) = get(&router, "/mapit").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains(r#""label":"A1""#));
    }

    #[tokio::test]
    async fn empty_store_renders_empty_map() {
        // ---
        let (router, _db) = app().await;
        let (status, body) = get(&router, "/mapplant").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("var markers = [];"));
    }

    #[tokio::test]
    async fn getmap_persists_page() {
        // ---
        let dir = std::env::temp_dir().join(format!("plantation-getmap-{}", std::process::id()));
        let path = dir.join("getmap.html");
        let (router, _db) = app_with_map_path(path.clone()).await;

        let (status, body) = get(&router, "/getmap").await;
        assert_eq!(status, StatusCode::OK);

        let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(on_disk, body);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
