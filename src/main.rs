use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use tastecluster::{
    cli,
    config::{self, Config, parse_limit},
    error,
    pipeline::StrategyRegistry,
};

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
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Cluster your top tracks and show the most prevalent group
    Analyze(AnalyzeOptions),

    /// Save the last analyzed group as a playlist
    Save(SaveOptions),

    /// List available clustering algorithms
    Strategies,

    /// Remove cached token and selection
    Logout,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeOptions {
    /// Clustering algorithm, overrides CLUSTERING_ALGORITHM
    #[clap(long)]
    pub strategy: Option<String>,

    /// Number of top tracks to analyze (1-50), overrides TOP_TRACKS_LIMIT
    #[clap(long, value_parser = parse_limit)]
    pub limit: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct SaveOptions {
    /// Playlist name, overrides PLAYLIST_NAME
    #[clap(long)]
    pub name: Option<String>,

    /// Create a private playlist
    #[clap(long)]
    pub private: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn load_config() -> Config {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };
    if let Err(e) = config.validate(&StrategyRegistry::with_defaults()) {
        error!("Invalid configuration. Err: {}", e);
    }
    config
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth(&load_config()).await,
        Command::Analyze(opt) => cli::analyze(&load_config(), opt.strategy, opt.limit).await,
        Command::Save(opt) => cli::save(&load_config(), opt.name, opt.private).await,
        Command::Strategies => cli::strategies(Config::from_env().ok().as_ref()),
        Command::Logout => cli::logout().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
