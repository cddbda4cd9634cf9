use std::path::Path;

use crate::{
    cli::load_config,
    config, error,
    management::TokenManager,
    provider::{
        ProviderConfiguration,
        spotify::{
            SpotifyConfiguration,
            auth::{self, AuthSettings},
        },
    },
    success,
};

/// Runs the Spotify PKCE login and writes the session file the provider
/// loads on start.
pub async fn auth(config_path: &Path) {
    let config = load_config(config_path).await;

    let conf: SpotifyConfiguration = match config::section(&config, SpotifyConfiguration::KEY) {
        Some(section) => match serde_json::from_value(section.clone()) {
            Ok(conf) => conf,
            Err(e) => error!("Invalid spotify configuration. Err: {}", e),
        },
        None => error!(
            "'{}' is not defined in configuration",
            SpotifyConfiguration::KEY
        ),
    };

    let Some(client_id) = conf.client_id.clone().filter(|id| !id.trim().is_empty()) else {
        error!("Cannot authenticate, no client_id configured")
    };

    let settings = AuthSettings {
        client_id: client_id.clone(),
        redirect_uri: conf.redirect_uri(),
        server_addr: config::server_addr(),
    };

    let token = match auth::auth(settings).await {
        Ok(token) => token,
        Err(e) => error!("Authentication failed. Err: {}", e),
    };

    let path = conf.session_path();
    let manager = TokenManager::new(token, client_id, Some(path.clone()));
    match manager.persist().await {
        Ok(()) => success!("Spotify session saved to {}", path.display()),
        Err(e) => error!("Cannot save spotify session. Err: {}", e),
    }
}
