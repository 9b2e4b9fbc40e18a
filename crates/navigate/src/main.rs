//! navigate - music-theory analysis server and CLI
//!
//! Subcommands:
//! - `navigate serve` - Run the HTTP API and live-note relay
//! - `navigate chord <pitches>...` - Name a chord from MIDI pitches
//! - `navigate analyze <file>` - Key analysis of a MIDI file
//! - `navigate config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use navconf::NavConfig;
use navigate::{commands, serve};
use theory_engine::ScoreRequest;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "navigate")]
#[command(about = "Music-theory analysis for live MIDI and MIDI files")]
#[command(version)]
struct Cli {
    /// Config file, replaces ./navigate.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// HTTP port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Name the chord formed by MIDI pitches
    Chord {
        /// MIDI note numbers, e.g. 60 64 67
        #[arg(required = true)]
        pitches: Vec<u8>,
    },

    /// Analyze the key of a MIDI file
    Analyze {
        /// Path to a .mid file
        file: PathBuf,

        /// Track indices to include, comma separated
        #[arg(short, long, value_delimiter = ',')]
        tracks: Option<Vec<usize>>,

        /// Detail level, echoed in the report
        #[arg(long, default_value = "standard")]
        complexity: String,

        /// Analysis window in seconds, echoed in the report
        #[arg(long, default_value = "5.0")]
        window_size: f64,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = NavConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // logs go to stderr so command output stays clean JSON
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.bind.http_port = port;
            }
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(serve::run(&config))?;
        }
        Commands::Chord { pitches } => {
            commands::chord(&config, &pitches)?;
        }
        Commands::Analyze {
            file,
            tracks,
            complexity,
            window_size,
        } => {
            let request = ScoreRequest {
                track_selection: tracks,
                complexity,
                window_size,
            };
            commands::analyze(&config, &file, &request)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
