//! ElderCare terminal client - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Build the model backend (Gemini, or a local echo when offline)
//! 3. Wire devices, the parent controller and the dashboard into a shell
//! 4. Read commands from stdin until /quit or end of input

mod cli;
mod devices;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use eldercare_chat::device::{Geolocator, Microphone, NoDevices};
use eldercare_chat::generator::LlmBackend;
use eldercare_chat::mock::MockBackend;
use eldercare_chat::{GeminiBackend, Shell};
use eldercare_core::config::ElderCareConfig;
use eldercare_core::types::{GeoLocation, UserRole};

use cli::CliArgs;
use devices::{FileMicrophone, FixedGeolocator};
use repl::{execute, render_message, Command, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = ElderCareConfig::load_or_default(&config_file);

    // Tracing goes to stderr so it never interleaves with the conversation.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting ElderCare v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Model backend.
    let backend: Arc<dyn LlmBackend> = if args.offline {
        tracing::warn!("Offline mode, replies are echoed locally");
        Arc::new(MockBackend::echo())
    } else {
        match GeminiBackend::from_env(&config.model) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                tracing::error!(error = %e, "No model credential, set API_KEY or use --offline");
                return Err(e.into());
            }
        }
    };

    // Devices.
    let microphone: Arc<dyn Microphone> = match args.recording {
        Some(ref path) => Arc::new(FileMicrophone::new(path)),
        None => Arc::new(NoDevices),
    };
    let geolocator: Arc<dyn Geolocator> = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Arc::new(FixedGeolocator::new(GeoLocation::new(lat, lng))),
        _ => Arc::new(NoDevices),
    };

    let shell = Shell::from_config(&config, backend, microphone, geolocator);
    shell.switch_role(args.role);

    println!("ElderCare ({} view). Type /help for commands.", args.role);
    if args.role == UserRole::Parent {
        for message in shell.parent().messages() {
            println!("{}", render_message(&message));
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}\n{}", e, HELP);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match execute(&shell, command).await {
            Ok(out) => println!("{}", out),
            Err(e) => {
                tracing::debug!(error = %e, "Command failed");
                println!("Error: {}", e);
            }
        }
    }

    tracing::info!("ElderCare shutting down");
    Ok(())
}
