use axum::{
    Extension, Router,
    routing::{get, post},
};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    api,
    error::{Error, Result},
    info,
    management::RequestManager,
    types::PkceToken,
};

pub fn api_router(manager: Arc<RequestManager>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/providers", get(api::providers))
        .route("/search", get(api::search))
        .route("/download", get(api::download))
        .route("/preferences", post(api::preferences))
        .layer(Extension(manager))
}

pub fn callback_router(state: Arc<Mutex<Option<PkceToken>>>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)))
}

/// Serves search, download and preferences until the process stops.
pub async fn start_api_server(manager: Arc<RequestManager>, addr: &str) -> Result<()> {
    serve(api_router(manager), addr).await
}

/// Serves the OAuth callback for the PKCE flow.
pub async fn start_callback_server(state: Arc<Mutex<Option<PkceToken>>>, addr: &str) -> Result<()> {
    serve(callback_router(state), addr).await
}

async fn serve(app: Router, addr: &str) -> Result<()> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| Error::Configuration(format!("Failed to parse server address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
