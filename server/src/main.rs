//! HTTP API exposing the QuickBooks sync to the FloCon web app
use flocon::error::FloconError;
use flocon::ApplicationRuntime;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod api;

#[tokio::main]
async fn main() -> Result<(), FloconError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = Arc::new(ApplicationRuntime::new()?);
    let bind = runtime.configuration().server.bind.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = api::router(runtime).layer(cors);

    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| FloconError::Io(format!("Unable to bind {bind}: {e}")))?;
    info!("Listening on http://{bind}");
    axum::serve(listener, app)
        .await
        .map_err(|e| FloconError::Io(e.to_string()))
}
