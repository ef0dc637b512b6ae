//! voxgate - voice check-in server and voiceprint admin tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod admin;
mod config;
mod server;

use admin::{FeatureCommand, GroupCommand};

/// Voice check-in server and voiceprint admin tool.
///
/// Without a subcommand, starts the check-in server with default settings.
#[derive(Parser, Debug)]
#[command(name = "voxgate")]
#[command(about = "Voice check-in server and voiceprint admin tool")]
#[command(version)]
pub struct Cli {
    /// YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Voiceprint group id
    #[arg(short = 'g', long, global = true, env = "VOXGATE_GROUP")]
    pub group: Option<String>,

    /// iFlytek app id
    #[arg(long, global = true, env = "XFYUN_APP_ID")]
    pub app_id: Option<String>,

    /// iFlytek API key
    #[arg(long, global = true, env = "XFYUN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// iFlytek API secret
    #[arg(long, global = true, env = "XFYUN_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the check-in HTTP server
    Serve(ServeArgs),
    /// Manage the voiceprint group
    Group(GroupCommand),
    /// Manage enrolled voiceprints
    Feature(FeatureCommand),
}

/// Flags of the check-in server.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen port [default: 8888]
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Similarity threshold [default: 0.36]
    #[arg(short = 's', long)]
    pub score: Option<f64>,

    /// Keep a copy of every upload in this directory
    #[arg(short = 'f', long)]
    pub audio_dir: Option<PathBuf>,

    /// MP3 encoder program [default: ffmpeg]
    #[arg(long)]
    pub encoder: Option<String>,

    /// Skip the spoken-phrase check
    #[arg(long)]
    pub no_speech_gate: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Both reqwest and tungstenite use rustls; pick one provider for the process.
    let _ = rustls::crypto::ring::default_provider().install_default();

    match &cli.command {
        None => server::run(&cli, &ServeArgs::default()).await,
        Some(Commands::Serve(args)) => server::run(&cli, args).await,
        Some(Commands::Group(cmd)) => cmd.run(&cli).await,
        Some(Commands::Feature(cmd)) => cmd.run(&cli).await,
    }
}
