//! shadectl - command line client for the ESP shade controller.
//!
//! Usage:
//!   shadectl dump                      # visible properties with values
//!   shadectl get stepperConfig.openSpeed
//!   shadectl set nightMode.startTime 22:30
//!   shadectl trigger do_homing
//!   shadectl action stop
//!   shadectl move 50                   # percent of the open position
//!   shadectl watch                     # print telemetry as it arrives
//!   shadectl schema                    # no connection needed

mod config;
mod error;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use shade_protocol::PacketType;
use shade_schema::{PropertyKey, Schema};
use shade_sync::{Synchronizer, TcpChannel};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "shadectl")]
#[command(about = "Read and change the configuration of an ESP shade controller")]
struct Cli {
    /// YAML file with connection settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Device host name or address
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Device port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print all properties with their current values
    Dump {
        /// Print the decoded state as JSON
        #[arg(long)]
        json: bool,

        /// Include properties hidden for the current state
        #[arg(long)]
        all: bool,
    },

    /// Print one property
    Get {
        key: String,

        /// Print the raw value instead of the display form
        #[arg(long)]
        raw: bool,
    },

    /// Change one property
    Set { key: String, value: String },

    /// Press a button or flip a toggle
    Trigger { key: String },

    /// Send a device action
    Action { action: Action },

    /// Move the shade to a percentage of its open position
    Move {
        #[arg(allow_negative_numbers = true)]
        percent: f32,
    },

    /// Print telemetry until the connection closes
    Watch,

    /// Print the property schema
    Schema {
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    Stop,
    Restart,
    ApplyOffset,
}

impl Action {
    fn command(self) -> PacketType {
        match self {
            Action::Stop => PacketType::Stop,
            Action::Restart => PacketType::Restart,
            Action::ApplyOffset => PacketType::ApplyOffset,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    shade_sync::metrics::describe_metrics();

    let schema = Schema::new()?;

    if let Command::Schema { json } = cli.command {
        if json {
            println!("{}", serde_json::to_string_pretty(schema.sections())?);
        } else {
            print!("{}", render::render_schema(&schema));
        }
        return Ok(());
    }

    let config = client_config(&cli)?;
    info!("Connecting to {}:{}", config.host, config.port);
    let channel = TcpChannel::connect(&config.host, config.port, config.channel_options())
        .await
        .map_err(|source| CliError::Connect {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;
    let telemetry = channel.subscribe();
    let sync = Synchronizer::new(channel, schema);

    match cli.command {
        Command::Action { action } => {
            sync.action(action.command()).await?;
            info!("{} sent", action.command());
            return Ok(());
        }
        Command::Move { percent } => {
            sync.move_to(percent).await?;
            info!("Moving to {}%", percent.clamp(0.0, 100.0));
            return Ok(());
        }
        _ => {}
    }

    sync.load().await?;
    debug!("Loaded device state");

    match cli.command {
        Command::Dump { json, all } => {
            let snapshot = sync.snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.redacted())?);
            } else {
                print!("{}", render::render_state(sync.schema(), &snapshot, all)?);
            }
        }
        Command::Get { key, raw } => {
            let snapshot = sync.snapshot()?;
            let text = if raw {
                sync.schema()
                    .current_value(&key, &snapshot)?
                    .map(|value| value.to_string())
            } else {
                sync.schema().display(&key, &snapshot)?
            };
            println!("{}", text.unwrap_or_default());
        }
        Command::Set { key, value } => {
            sync.apply_input(&key, &value).await?;
            let shown = sync.schema().display(&key, &sync.snapshot()?)?;
            println!("{} = {}", key, shown.unwrap_or_default());
        }
        Command::Trigger { key } => {
            sync.trigger(&key).await?;
            info!("{} triggered", key);
        }
        Command::Watch => {
            watch(&sync, telemetry).await?;
        }
        Command::Action { .. } | Command::Move { .. } | Command::Schema { .. } => {}
    }

    Ok(())
}

/// Merge and print telemetry until the device closes the connection.
async fn watch(
    sync: &Synchronizer<TcpChannel>,
    mut telemetry: tokio::sync::broadcast::Receiver<shade_protocol::Telemetry>,
) -> Result<(), CliError> {
    loop {
        match telemetry.recv().await {
            Ok(update) => {
                sync.apply_telemetry(&update);
                let key = PropertyKey::Status(update.field()).to_string();
                let shown = sync.schema().display(&key, &sync.snapshot()?);
                match shown {
                    Ok(Some(text)) => println!("{} = {}", key, text),
                    // Fields without a schema entry still print raw.
                    _ => println!("{}", update),
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("Skipped {} telemetry updates", skipped),
            Err(RecvError::Closed) => break,
        }
    }
    sync.disconnect();
    info!("Connection closed");
    Ok(())
}

/// Config file values overridden by command line flags.
fn client_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout) = cli.timeout_ms {
        config.request_timeout_ms = timeout;
    }
    Ok(config)
}
