use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use untzine::{audio::AudioQuality, cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Provider configuration file (JSON)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show every provider and whether it loaded
    Providers,

    /// Search a provider's catalog
    Search(SearchOptions),

    /// Download a track from a search result token
    Download(DownloadOptions),

    /// Run the HTTP server
    Serve,

    /// Authorize with Spotify and store the session
    Auth,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Search terms
    terms: Vec<String>,

    /// Preferred provider; the first loaded one is used when it is not available
    #[clap(long)]
    provider: Option<String>,

    /// Requested quality tier (very-low, low, medium, high, very-high or 0-4)
    #[clap(long)]
    quality: Option<AudioQuality>,
}

#[derive(Parser, Debug, Clone)]
pub struct DownloadOptions {
    /// Token printed by `search`
    token: String,

    /// Highest quality tier to accept
    #[clap(long)]
    quality: Option<AudioQuality>,

    /// Directory to write the file to
    #[clap(long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::config_path);

    match cli.command {
        Command::Providers => cli::providers(&config_path).await,
        Command::Search(opt) => {
            let terms = opt.terms.join(" ");
            if terms.trim().is_empty() {
                error!("Nothing to search for");
            }
            cli::search(&terms, opt.provider, opt.quality, &config_path).await
        }
        Command::Download(opt) => {
            cli::download(&opt.token, opt.quality, opt.output, &config_path).await
        }
        Command::Serve => cli::serve(&config_path).await,
        Command::Auth => cli::auth(&config_path).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
