//! Untzine
//!
//! Searches music across independent streaming providers and downloads a
//! chosen track at the best quality the account allows. Providers are loaded
//! once into a registry, each in isolation; search results travel as
//! stateless tokens so a download can be requested later without a server
//! side session.
//!
//! # Modules
//!
//! - `audio` - Format catalog, quality tiers and negotiation
//! - `provider` - Provider trait, back-ends and the resumable download stream
//! - `registry` - Loads and fault-isolates the configured providers
//! - `management` - Request manager, search context and preferences tokens
//! - `tagger` - Metadata tagging boundary
//! - `api` - HTTP endpoints
//! - `cli` - Command-line interface implementations
//! - `config` - `.env` loading and provider configuration
//! - `server` - HTTP server and OAuth callback listener
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//! - `error` - Error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use untzine::{config, management::*, registry::*, tagger::LoftyTagger};
//!
//! #[tokio::main]
//! async fn main() -> untzine::error::Result<()> {
//!     config::load_env().await?;
//!     let conf = config::load_configuration(&config::config_path()).await?;
//!     let registry = ProviderRegistry::load(&conf, builtin_registrations()).await;
//!     let manager = RequestManager::new(Arc::new(registry), Arc::new(LoftyTagger::default()));
//!     let results = manager.search("daft punk", &RequestPreferences::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod provider;
pub mod registry;
pub mod server;
pub mod tagger;
pub mod types;
pub mod utils;

/// Prints a progress or status line prefixed with a blue `o`.
///
/// Takes the same arguments as `println!`.
///
/// ```ignore
/// info!("Loading providers...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a green check mark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line and exits with status 1.
///
/// Only the binary and the `cli` commands use it; library code returns
/// [`error::Error`] instead.
///
/// ```ignore
/// error!("Cannot load configuration. Err: {}", e);
/// // not reached
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a yellow `!` line for problems the program recovers from, such
/// as a provider that failed to load or a retried download.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
