use std::sync::Arc;

use pullmon_core::job::registry::JobRegistry;
use pullmon_server::server::AppState;

#[tokio::main]
async fn main() {
    env_logger::init();

    let host = std::env::var("PULLMON_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PULLMON_PORT").unwrap_or_else(|_| "8614".to_string());
    let addr = format!("{}:{}", host, port);

    let registry = Arc::new(JobRegistry::default());
    let state = AppState::new(registry);
    let app = pullmon_server::server::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    log::info!(
        "pullmond listening on http://{}  (set PULLMON_PORT to override)",
        addr
    );
    axum::serve(listener, app).await.expect("server error");
}
