use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

use crate::models::{LatLng, Trip};

/// SQLite-backed trip archive.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trips (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                duration TEXT NOT NULL,
                total_distance_km REAL NOT NULL,
                max_speed_kmh REAL NOT NULL,
                avg_speed_kmh REAL NOT NULL,
                min_elevation_m REAL,
                max_elevation_m REAL,
                elevation_gain_m REAL NOT NULL,
                start_location TEXT NOT NULL,
                end_location TEXT NOT NULL,
                route TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trips_created ON trips(created_at DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_trip(&self, trip: &Trip) -> Result<()> {
        let route_json = trip
            .route
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, started_at, ended_at, duration, total_distance_km, max_speed_kmh, avg_speed_kmh, min_elevation_m, max_elevation_m, elevation_gain_m, start_location, end_location, route, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trip.id)
        .bind(trip.started_at.to_rfc3339())
        .bind(trip.ended_at.map(|dt| dt.to_rfc3339()))
        .bind(&trip.duration)
        .bind(trip.total_distance_km)
        .bind(trip.max_speed_kmh)
        .bind(trip.avg_speed_kmh)
        .bind(trip.min_elevation_m)
        .bind(trip.max_elevation_m)
        .bind(trip.elevation_gain_m)
        .bind(&trip.start_location)
        .bind(&trip.end_location)
        .bind(route_json)
        .bind(trip.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recently created trips first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Trip>> {
        let rows = sqlx::query(
            "SELECT id, started_at, ended_at, duration, total_distance_km, max_speed_kmh, avg_speed_kmh, min_elevation_m, max_elevation_m, elevation_gain_m, start_location, end_location, route, created_at FROM trips ORDER BY created_at DESC LIMIT ?"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_trip).collect()
    }

    pub async fn get_trip(&self, id: &str) -> Result<Option<Trip>> {
        let row = sqlx::query(
            "SELECT id, started_at, ended_at, duration, total_distance_km, max_speed_kmh, avg_speed_kmh, min_elevation_m, max_elevation_m, elevation_gain_m, start_location, end_location, route, created_at FROM trips WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_trip).transpose()
    }

    pub async fn delete_trip(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM trips WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_trip(row: sqlx::sqlite::SqliteRow) -> Result<Trip> {
        let started_at_str: String = row.get("started_at");
        let ended_at_str: Option<String> = row.get("ended_at");
        let created_at_str: String = row.get("created_at");
        let route_json: Option<String> = row.get("route");

        let route: Option<Vec<LatLng>> = route_json
            .map(|json| serde_json::from_str(&json))
            .transpose()?;

        Ok(Trip {
            id: row.get("id"),
            started_at: chrono::DateTime::parse_from_rfc3339(&started_at_str)?
                .with_timezone(&chrono::Utc),
            ended_at: ended_at_str
                .map(|s| {
                    chrono::DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                })
                .transpose()?,
            duration: row.get("duration"),
            total_distance_km: row.get("total_distance_km"),
            max_speed_kmh: row.get("max_speed_kmh"),
            avg_speed_kmh: row.get("avg_speed_kmh"),
            min_elevation_m: row.get("min_elevation_m"),
            max_elevation_m: row.get("max_elevation_m"),
            elevation_gain_m: row.get("elevation_gain_m"),
            start_location: row.get("start_location"),
            end_location: row.get("end_location"),
            route,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)?
                .with_timezone(&chrono::Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripStats;
    use chrono::{Duration, Utc};

    async fn temp_db() -> Database {
        let path = std::env::temp_dir().join(format!("tripmeter-test-{}.db", uuid::Uuid::new_v4()));
        Database::new(&path).await.unwrap()
    }

    fn sample_trip() -> Trip {
        let mut stats = TripStats::begin(1_700_000_000_000);
        stats.end_time_ms = Some(1_700_000_900_000);
        stats.total_distance_km = 7.3;
        stats.max_speed_kmh = 42.0;
        stats.avg_speed_kmh = 29.2;
        stats.min_elevation_m = Some(34.0);
        stats.max_elevation_m = Some(61.0);
        stats.elevation_gain_m = 27.0;
        stats.start_location = "Alexanderplatz".to_string();
        stats.end_location = "Tiergarten".to_string();
        stats.route = Some(vec![
            LatLng::new(52.5200, 13.4050),
            LatLng::new(52.5145, 13.3501),
        ]);
        Trip::from_stats(&stats, 900_000)
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = temp_db().await;
        let trip = sample_trip();
        db.insert_trip(&trip).await.unwrap();

        let loaded = db.get_trip(&trip.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, trip.id);
        assert_eq!(loaded.duration, "00:15:00");
        assert_eq!(loaded.total_distance_km, 7.3);
        assert_eq!(loaded.min_elevation_m, Some(34.0));
        assert_eq!(loaded.start_location, "Alexanderplatz");
        assert_eq!(loaded.route.as_ref().unwrap().len(), 2);
        assert_eq!(loaded.route.unwrap()[0], LatLng::new(52.5200, 13.4050));
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let db = temp_db().await;
        for i in 0..3 {
            let mut trip = sample_trip();
            trip.created_at = Utc::now() - Duration::minutes(30 - i * 10);
            trip.start_location = format!("Trip {i}");
            db.insert_trip(&trip).await.unwrap();
        }

        let trips = db.list_recent(10).await.unwrap();
        assert_eq!(trips.len(), 3);
        assert_eq!(trips[0].start_location, "Trip 2");
        assert_eq!(trips[2].start_location, "Trip 0");

        let limited = db.list_recent(2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_trip() {
        let db = temp_db().await;
        let trip = sample_trip();
        db.insert_trip(&trip).await.unwrap();
        db.delete_trip(&trip.id).await.unwrap();
        assert!(db.get_trip(&trip.id).await.unwrap().is_none());
        assert!(db.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trip_without_route_or_end_time() {
        let db = temp_db().await;
        let mut trip = sample_trip();
        trip.route = None;
        trip.ended_at = None;
        db.insert_trip(&trip).await.unwrap();

        let loaded = db.get_trip(&trip.id).await.unwrap().unwrap();
        assert!(loaded.route.is_none());
        assert!(loaded.ended_at.is_none());
    }
}
