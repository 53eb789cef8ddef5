use anyhow::{anyhow, Result};

use crate::commands::trip::AppState;
use crate::models::Trip;

/// List archived trips, most recent first.
pub async fn list_trips(state: &AppState, limit: u32) -> Result<Vec<Trip>> {
    let db_guard = state.db.lock().await;
    let db = db_guard
        .as_ref()
        .ok_or_else(|| anyhow!("database not initialized"))?;
    db.list_recent(limit).await
}

pub async fn get_trip(state: &AppState, id: &str) -> Result<Option<Trip>> {
    let db_guard = state.db.lock().await;
    let db = db_guard
        .as_ref()
        .ok_or_else(|| anyhow!("database not initialized"))?;
    db.get_trip(id).await
}

pub async fn delete_trip(state: &AppState, id: &str) -> Result<()> {
    let db_guard = state.db.lock().await;
    let db = db_guard
        .as_ref()
        .ok_or_else(|| anyhow!("database not initialized"))?;
    db.delete_trip(id).await?;
    log::info!("deleted trip {id}");
    Ok(())
}
