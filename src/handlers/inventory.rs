use std::sync::PoisonError;

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    inventory, AppState,
};

// ── GET /api/inventory ────────────────────────────────────────────────────────

pub async fn list_inventory(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let store = state.store.clone();
    let sheet = state.sheet_name.clone();

    let herbs = tokio::task::spawn_blocking(move || {
        let store = store.lock().unwrap_or_else(PoisonError::into_inner);
        let table = store
            .load(&sheet)?
            .ok_or_else(|| AppError::SheetNotFound(sheet.clone()))?;
        inventory::list_inventory(&table)
    })
    .await
    .map_err(anyhow::Error::from)??;

    info!(count = herbs.len(), "Listed inventory");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": herbs,
            "count": herbs.len(),
        })),
    ))
}
