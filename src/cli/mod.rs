//! # CLI Module
//!
//! Command implementations of the `untzine` binary. Each command loads the
//! configuration, builds the provider registry and delegates to the request
//! manager; output goes through the console macros and `tabled` tables.
//!
//! ```bash
//! untzine providers                               # load status of every provider
//! untzine search "daft punk" --quality high       # results with their tokens
//! untzine download <token> --output ~/Music       # write the track to disk
//! untzine serve                                   # HTTP surface
//! untzine auth                                    # Spotify PKCE login
//! ```
//!
//! Fatal problems are reported with [`crate::error!`], which exits the
//! process.

mod auth;
mod download;
mod providers;
mod search;
mod serve;

pub use auth::auth;
pub use download::download;
pub use providers::providers;
pub use search::search;
pub use serve::serve;

use std::{path::Path, sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::{
    config, error,
    management::RequestManager,
    registry::{ProviderRegistry, builtin_registrations},
    tagger::LoftyTagger,
};

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

async fn load_config(path: &Path) -> Value {
    match config::load_configuration(path).await {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    }
}

async fn load_manager(path: &Path) -> Arc<RequestManager> {
    let config = load_config(path).await;

    let pb = spinner("Loading providers...");
    let registry = ProviderRegistry::load(&config, builtin_registrations()).await;
    pb.finish_and_clear();

    Arc::new(RequestManager::new(
        Arc::new(registry),
        Arc::new(LoftyTagger::default()),
    ))
}
