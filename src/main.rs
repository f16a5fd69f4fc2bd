use std::sync::{Arc, Mutex};

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod db;
mod error;
mod handlers;
mod inventory;
mod models;

use crate::config::Config;
use crate::db::{CsvSheetStore, SheetStore};

/// Shared application state. Cheap to clone; the store sits behind an Arc.
#[derive(Clone)]
pub struct AppState {
    /// Serializes sheet access within this process.
    pub store: Arc<Mutex<dyn SheetStore>>,
    pub sheet_name: String,
    pub steep_days: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,herb_inventory=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!(
        dir = %config.inventory_dir.display(),
        sheet = %config.sheet_name,
        steep_days = config.steep_days,
        "Opening inventory sheet"
    );
    let mut store = CsvSheetStore::new(&config.inventory_dir);
    store.ensure_sheet(&config.sheet_name, inventory::DEFAULT_HEADER)?;

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        sheet_name: config.sheet_name.clone(),
        steep_days: config.steep_days,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);
    info!("Usage: GET http://{}/  ·  requests: POST http://{}/", addr, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Dispatcher ──────────────────────────────────────────────────────
        .route(
            "/",
            get(handlers::usage).post(handlers::dispatch::handle_request),
        )

        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Read-only listing ───────────────────────────────────────────────
        .route("/api/inventory", get(handlers::inventory::list_inventory))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
