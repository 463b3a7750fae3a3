//! SQL access for measurements and locations.
//!
//! Every function takes the request's connection; none of them acquire one.

use std::collections::BTreeMap;

use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info};

use crate::models::{Location, Measurement, UNSET_COORDINATE};

// ---

/// What [`ingest`] actually wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub measurement: Measurement,
    /// `false` when an identical (node, height, timestamp) row already existed.
    pub inserted: bool,
    /// `true` when this call created the node's placeholder location.
    pub location_created: bool,
}

/// Everything known about one node. Absent parts stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDetail {
    pub values: Vec<Measurement>,
    pub location: Option<Location>,
    pub latest: Option<Measurement>,
}

/// Record a measurement and lazily create the node's placeholder location.
///
/// Both writes share one transaction. An exact (node, height, timestamp)
/// duplicate is skipped, which also swallows genuinely distinct reports that
/// land on the same timestamp.
pub async fn ingest(
    conn: &mut SqliteConnection,
    measurement: Measurement,
) -> Result<IngestOutcome, sqlx::Error> {
    // ---
    let mut tx = conn.begin().await?;

    let existing: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM measurements
        WHERE node = ? AND height = ? AND timestamp = ?
        "#,
    )
    .bind(&measurement.node)
    .bind(measurement.height)
    .bind(&measurement.timestamp)
    .fetch_one(&mut *tx)
    .await?;

    let inserted = existing == 0;
    if inserted {
        sqlx::query(
            r#"
            INSERT INTO measurements (node, height, timestamp, reporter_addr)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&measurement.node)
        .bind(measurement.height)
        .bind(&measurement.timestamp)
        .bind(&measurement.reporter_addr)
        .execute(&mut *tx)
        .await?;
    } else {
        info!(
            "Duplicate measurement for node {} at {}, not inserting",
            measurement.node, measurement.timestamp
        );
    }

    let location_created = sqlx::query(
        r#"
        INSERT OR IGNORE INTO locations (node, latitude, longitude)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&measurement.node)
    .bind(UNSET_COORDINATE)
    .bind(UNSET_COORDINATE)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    if location_created {
        info!(
            "New node {} added to locations with unset coordinates",
            measurement.node
        );
    }

    tx.commit().await?;

    Ok(IngestOutcome {
        measurement,
        inserted,
        location_created,
    })
}

/// All measurements in insertion order.
pub async fn list_measurements(
    conn: &mut SqliteConnection,
) -> Result<Vec<Measurement>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Measurement>(
        "SELECT node, height, timestamp, reporter_addr FROM measurements ORDER BY id ASC",
    )
    .fetch_all(&mut *conn)
    .await
}

/// Total number of stored measurements.
pub async fn count_measurements(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    // ---
    sqlx::query_scalar("SELECT COUNT(*) FROM measurements")
        .fetch_one(&mut *conn)
        .await
}

/// Most recent height per node.
///
/// Scans newest first and keeps the first row seen for each node; insertion
/// order breaks timestamp ties.
pub async fn latest_per_node(
    conn: &mut SqliteConnection,
) -> Result<BTreeMap<String, f64>, sqlx::Error> {
    // ---
    let rows: Vec<(String, f64)> =
        sqlx::query_as("SELECT node, height FROM measurements ORDER BY timestamp DESC, id DESC")
            .fetch_all(&mut *conn)
            .await?;

    let mut latest = BTreeMap::new();
    for (node, height) in rows {
        latest.entry(node).or_insert(height);
    }
    debug!("latest_per_node - {} distinct nodes", latest.len());
    Ok(latest)
}

/// Distinct node identifiers that have reported at least once.
pub async fn list_reporting_nodes(
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, sqlx::Error> {
    // ---
    sqlx::query_scalar("SELECT DISTINCT node FROM measurements ORDER BY node")
        .fetch_all(&mut *conn)
        .await
}

/// The single newest measurement across all nodes.
pub async fn latest_measurement(
    conn: &mut SqliteConnection,
) -> Result<Option<Measurement>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Measurement>(
        r#"
        SELECT node, height, timestamp, reporter_addr FROM measurements
        ORDER BY timestamp DESC, id DESC LIMIT 1
        "#,
    )
    .fetch_optional(&mut *conn)
    .await
}

/// Measurements, location and latest value for one node.
pub async fn get_node(
    conn: &mut SqliteConnection,
    node: &str,
) -> Result<NodeDetail, sqlx::Error> {
    // ---
    let values = sqlx::query_as::<_, Measurement>(
        r#"
        SELECT node, height, timestamp, reporter_addr FROM measurements
        WHERE node = ? ORDER BY id ASC
        "#,
    )
    .bind(node)
    .fetch_all(&mut *conn)
    .await?;

    let location = get_location(conn, node).await?;
    let latest = latest_for_node(conn, node).await?;

    Ok(NodeDetail {
        values,
        location,
        latest,
    })
}

/// Newest measurement for `node`, if it ever reported.
pub async fn latest_for_node(
    conn: &mut SqliteConnection,
    node: &str,
) -> Result<Option<Measurement>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Measurement>(
        r#"
        SELECT node, height, timestamp, reporter_addr FROM measurements
        WHERE node = ? ORDER BY timestamp DESC, id DESC LIMIT 1
        "#,
    )
    .bind(node)
    .fetch_optional(&mut *conn)
    .await
}

/// All locations in creation order.
pub async fn get_locations(conn: &mut SqliteConnection) -> Result<Vec<Location>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Location>(
        "SELECT node, latitude, longitude FROM locations ORDER BY id ASC",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn get_location(
    conn: &mut SqliteConnection,
    node: &str,
) -> Result<Option<Location>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Location>(
        "SELECT node, latitude, longitude FROM locations WHERE node = ?",
    )
    .bind(node)
    .fetch_optional(&mut *conn)
    .await
}

/// Overwrite a node's coordinates; returns the number of rows changed.
///
/// Unknown nodes change nothing and are not an error.
pub async fn update_location(
    conn: &mut SqliteConnection,
    node: &str,
    latitude: &str,
    longitude: &str,
) -> Result<u64, sqlx::Error> {
    // ---
    let result = sqlx::query("UPDATE locations SET latitude = ?, longitude = ? WHERE node = ?")
        .bind(latitude)
        .bind(longitude)
        .bind(node)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Overwrite coordinates by location row id, as the bulk editor's `id`
/// field addresses them. Returns the number of rows changed.
pub async fn update_location_by_id(
    conn: &mut SqliteConnection,
    id: i64,
    latitude: &str,
    longitude: &str,
) -> Result<u64, sqlx::Error> {
    // ---
    let result = sqlx::query("UPDATE locations SET latitude = ?, longitude = ? WHERE id = ?")
        .bind(latitude)
        .bind(longitude)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::db::Db;

    fn measurement(node: &str, height: f64, timestamp: &str) -> Measurement {
        // ---
        Measurement {
            node: node.to_string(),
            height,
            timestamp: timestamp.to_string(),
            reporter_addr: None,
        }
    }

    async fn location_count(conn: &mut SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ingest_adds_measurement_and_placeholder_location() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let outcome = ingest(&mut conn, measurement("A1", 12.5, "2025-03-26T18:45:00.000000Z"))
            .await
            .unwrap();
        assert!(outcome.inserted);
        assert!(outcome.location_created);

        let all = list_measurements(&mut conn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].node, "A1");
        assert_eq!(all[0].height, 12.5);

        let location = get_location(&mut conn, "A1").await.unwrap().unwrap();
        assert_eq!(location.latitude, UNSET_COORDINATE);
        assert_eq!(location.longitude, UNSET_COORDINATE);
    }

    #[tokio::test]
    async fn ingest_with_identical_timestamp_stores_one_row() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let m = measurement("A1", 12.5, "2025-03-26T18:45:00.000000Z");

        ingest(&mut conn, m.clone()).await.unwrap();
        let second = ingest(&mut conn, m).await.unwrap();

        assert!(!second.inserted);
        assert!(!second.location_created);
        assert_eq!(count_measurements(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn one_location_per_node_across_many_ingests() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        for (i, ts) in ["2025-01-01T00:00:00.000000Z", "2025-01-02T00:00:00.000000Z"]
            .iter()
            .enumerate()
        {
            ingest(&mut conn, measurement("A1", i as f64, ts)).await.unwrap();
            ingest(&mut conn, measurement("B2", i as f64, ts)).await.unwrap();
        }

        assert_eq!(count_measurements(&mut conn).await.unwrap(), 4);
        assert_eq!(location_count(&mut conn).await, 2);
    }

    #[tokio::test]
    async fn latest_per_node_prefers_newest_timestamp() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        // Inserted out of order so insertion order cannot stand in for time.
        ingest(&mut conn, measurement("A1", 20.0, "2025-01-02T00:00:00.000000Z")).await.unwrap();
        ingest(&mut conn, measurement("A1", 10.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();
        ingest(&mut conn, measurement("B2", 5.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();

        let latest = latest_per_node(&mut conn).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["A1"], 20.0);
        assert_eq!(latest["B2"], 5.0);

        let newest = latest_measurement(&mut conn).await.unwrap().unwrap();
        assert_eq!(newest.height, 20.0);
    }

    #[tokio::test]
    async fn empty_store_reads_are_empty() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        assert!(list_measurements(&mut conn).await.unwrap().is_empty());
        assert!(latest_per_node(&mut conn).await.unwrap().is_empty());
        assert!(get_locations(&mut conn).await.unwrap().is_empty());
        assert!(latest_measurement(&mut conn).await.unwrap().is_none());
        assert_eq!(get_node(&mut conn, "ghost").await.unwrap(), NodeDetail::default());
    }

    #[tokio::test]
    async fn get_node_collects_values_location_and_latest() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        ingest(&mut conn, measurement("A1", 1.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();
        ingest(&mut conn, measurement("A1", 2.0, "2025-01-03T00:00:00.000000Z")).await.unwrap();
        ingest(&mut conn, measurement("B2", 9.0, "2025-01-04T00:00:00.000000Z")).await.unwrap();

        let detail = get_node(&mut conn, "A1").await.unwrap();
        assert_eq!(detail.values.len(), 2);
        assert_eq!(detail.location.unwrap().node, "A1");
        assert_eq!(detail.latest.unwrap().height, 2.0);
    }

    #[tokio::test]
    async fn update_location_on_unknown_node_changes_nothing() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        ingest(&mut conn, measurement("A1", 1.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();

        let changed = update_location(&mut conn, "ghost", "1.0", "2.0").await.unwrap();
        assert_eq!(changed, 0);
        assert_eq!(location_count(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn update_location_overwrites_coordinates() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        ingest(&mut conn, measurement("A1", 12.5, "2025-01-01T00:00:00.000000Z")).await.unwrap();

        let changed = update_location(&mut conn, "A1", "19.07", "72.87").await.unwrap();
        assert_eq!(changed, 1);

        let locations = get_locations(&mut conn).await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].coordinates(), Some((19.07, 72.87)));
    }

    #[tokio::test]
    async fn update_location_by_id_targets_one_row() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        ingest(&mut conn, measurement("A1", 1.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();
        ingest(&mut conn, measurement("B2", 2.0, "2025-01-01T00:00:00.000000Z")).await.unwrap();

        let id: i64 = sqlx::query_scalar("SELECT id FROM locations WHERE node = 'B2'")
            .fetch_one(&mut *conn)
            .await
            .unwrap();

        assert_eq!(update_location_by_id(&mut conn, id, "1.5", "2.5").await.unwrap(), 1);
        assert_eq!(update_location_by_id(&mut conn, id + 100, "1", "1").await.unwrap(), 0);

        let b2 = get_location(&mut conn, "B2").await.unwrap().unwrap();
        assert_eq!(b2.coordinates(), Some((1.5, 2.5)));
        let a1 = get_location(&mut conn, "A1").await.unwrap().unwrap();
        assert!(a1.coordinates().is_none());
    }

    #[tokio::test]
    async fn failed_location_insert_rolls_back_measurement() {
        // ---
        let db = Db::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER boom BEFORE INSERT ON locations BEGIN SELECT RAISE(ABORT, 'boom'); END",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let m = measurement("A1", 12.5, "2025-01-01T00:00:00.000000Z");
        let result = ingest(&mut conn, m).await;

        assert!(result.is_err());
        assert_eq!(count_measurements(&mut conn).await.unwrap(), 0);
        assert_eq!(location_count(&mut conn).await, 0);
    }
}
