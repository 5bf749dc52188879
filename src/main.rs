use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use jokebattle_backend::config::Config;
use jokebattle_backend::generator::ProviderGenerator;
use jokebattle_backend::{api, db, metrics};

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "jokebattle-backend" }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let db = db::Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    if let Err(e) = db.ensure_strategy_rows().await {
        tracing::error!("Failed to create strategy rows: {e}");
    }
    let db = Arc::new(db);

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, Gemini answers will use placeholder text");
    }
    let generator = ProviderGenerator::from_config(&config).expect("Failed to build HTTP client");

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(api::router(db, Arc::new(generator), config.epsilon));
    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(
        "Joke battle backend listening on port {} (epsilon {})",
        config.port,
        config.epsilon
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
