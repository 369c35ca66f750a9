// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hachi - tiered companion request router.
//!
//! This is the binary entry point: `hachi serve` runs the HTTP gateway and
//! `hachi ask` pushes a single utterance through the pipeline.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ask;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hachi_config::HachiConfig;
use hachi_core::{ProcessingTier, RequestType};

/// Hachi - tiered companion request router.
#[derive(Parser, Debug)]
#[command(name = "hachi", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Switch a tier off for this run (repeatable).
    #[arg(long = "disable-tier", global = true, value_name = "TIER")]
    disable_tier: Vec<ProcessingTier>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Route one utterance and print the JSON response.
    Ask {
        /// What the player said.
        text: String,
        /// Request type hint sent by the game client.
        #[arg(long = "type", default_value = "assistance")]
        request_type: RequestType,
        /// Player location inside the game.
        #[arg(long)]
        location: Option<String>,
        /// Conversation to continue.
        #[arg(long, default_value = "cli")]
        session: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => hachi_config::load_and_validate_path(path),
        None => hachi_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => apply_overrides(config, &cli.disable_tier),
        Err(errors) => {
            hachi_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ask {
            text,
            request_type,
            location,
            session,
        }) => {
            let options = ask::AskOptions {
                text,
                request_type,
                location,
                session,
            };
            ask::run_ask(config, options).await
        }
        None => {
            println!("hachi: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("hachi: {e}");
        std::process::exit(1);
    }
}

/// Apply command-line tier switches on top of the loaded configuration.
fn apply_overrides(mut config: HachiConfig, disabled: &[ProcessingTier]) -> HachiConfig {
    for &tier in disabled {
        config.set_tier_enabled(tier, false);
    }
    config
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hachi={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
