use std::path::Path;

use crate::{cli::load_manager, config, error, server, warning};

pub async fn serve(config_path: &Path) {
    let manager = load_manager(config_path).await;
    if manager.registry().loaded_providers().is_empty() {
        warning!("Serving without any loaded provider");
    }

    if let Err(e) = server::start_api_server(manager, &config::server_addr()).await {
        error!("Server stopped. Err: {}", e);
    }
}
