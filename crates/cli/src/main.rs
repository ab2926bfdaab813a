//! Helpdesk CLI
//!
//! Local tooling around the support client: meter the microphone, replay
//! recorded sessions through the call controller, check the client
//! configuration, print the squad definition and serve the booking API.

mod replay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use helpdesk_bookings::{BookingsConfig, MockBookingBackend};
use helpdesk_client_core::{
    ClientConfig, MediaCaptureEngine, MediaConfig, SquadConfig,
    config::{ENV_PUBLIC_KEY, ENV_RAM_ASSISTANT_ID, ENV_SQUAD_ID},
    media::default_devices,
};

#[derive(Parser, Debug)]
#[command(name = "helpdesk")]
#[command(author, version, about = "Helpdesk voice support tools", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture the default microphone and print its live level
    Meter {
        /// Stop after this many seconds (0 runs until Ctrl-C)
        #[arg(short, long, default_value = "0")]
        seconds: u64,

        /// Sampling interval in milliseconds
        #[arg(long, default_value = "16")]
        interval_ms: u64,

        /// Gain applied to the RMS level
        #[arg(long, default_value = "3.0")]
        gain: f32,
    },

    /// Replay a JSON-lines session recording and print the conversation
    Replay {
        /// Recording to play
        file: PathBuf,

        /// Assistant or squad id the replayed call starts against
        /// (defaults to the configured call target)
        #[arg(short, long)]
        target: Option<String>,

        /// Delay between events in milliseconds
        #[arg(long, default_value = "5")]
        pace_ms: u64,

        /// Print the conversation as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check the voice client settings in the environment
    CheckConfig,

    /// Print the support squad definition (Ram, Sam, Sita) as JSON
    Squad {
        /// Ram's assistant id, the squad entry point
        #[arg(long, env = "RAM_ASSISTANT_ID")]
        ram: Option<String>,

        /// Sam's assistant id
        #[arg(long, env = "SAM_ASSISTANT_ID")]
        sam: Option<String>,

        /// Sita's assistant id
        #[arg(long, env = "SITA_ASSISTANT_ID")]
        sita: Option<String>,
    },

    /// Run the booking HTTP API
    ServeBookings {
        /// Address to listen on
        #[arg(short, long, env = "BOOKINGS_BIND_ADDR")]
        bind: Option<std::net::SocketAddr>,

        /// Booking business id
        #[arg(long, env = "MICROSOFT_BOOKINGS_BUSINESS_ID")]
        business_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Meter { seconds, interval_ms, gain } => {
            let config = MediaConfig::default()
                .with_sample_interval(Duration::from_millis(interval_ms))
                .with_level_gain(gain)
                .with_request_video(false);
            run_meter(config, seconds).await
        }
        Commands::Replay { file, target, pace_ms, json } => {
            let entries =
                replay::replay(&file, target.as_deref(), Duration::from_millis(pace_ms)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    println!("{}", replay::render_entry(entry));
                }
            }
            Ok(())
        }
        Commands::CheckConfig => {
            let summary = check_config(&ClientConfig::from_env())?;
            println!("{}", summary);
            Ok(())
        }
        Commands::Squad { ram, sam, sita } => {
            let squad = SquadConfig::support_squad(
                ram.as_deref().unwrap_or_default(),
                sam.as_deref().unwrap_or_default(),
                sita.as_deref().unwrap_or_default(),
            )?;
            println!("{}", serde_json::to_string_pretty(&squad)?);
            Ok(())
        }
        Commands::ServeBookings { bind, business_id } => {
            let mut config = BookingsConfig::from_env();
            if let Some(bind) = bind {
                config = config.with_bind_addr(bind);
            }
            if let Some(id) = business_id.filter(|id| !id.trim().is_empty()) {
                config = config.with_business_id(id);
            }

            let backend = Arc::new(MockBookingBackend::from_config(&config));
            helpdesk_bookings::serve(&config, backend, async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down booking API");
            })
            .await
            .context("booking API failed")
        }
    }
}

async fn run_meter(config: MediaConfig, seconds: u64) -> Result<()> {
    config.validate()?;
    let engine = MediaCaptureEngine::new(default_devices(), config);
    let mut level = engine.subscribe_level();

    if let Err(e) = engine.start_stream().await {
        if let Some(notice) = engine.notice() {
            warn!("{}", notice.advisory());
        }
        return Err(e.into());
    }
    if let Some(notice) = engine.notice() {
        info!("{}", notice.advisory());
    }
    info!("Metering microphone; press Ctrl-C to stop");

    let stop = async move {
        let deadline = async {
            if seconds == 0 {
                std::future::pending::<()>().await
            } else {
                tokio::time::sleep(Duration::from_secs(seconds)).await
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = deadline => {}
        }
    };

    let frames = meter_until(level, stop, &mut std::io::stdout()).await;
    println!();
    info!("Metered {} frames", frames);

    engine.stop_stream();
    Ok(())
}

/// Print level updates until `stop` resolves or the level source closes
///
/// Returns the number of frames printed.
async fn meter_until<F, W>(mut level: watch::Receiver<f32>, stop: F, out: &mut W) -> usize
where
    F: Future<Output = ()>,
    W: Write,
{
    tokio::pin!(stop);
    let mut frames = 0;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = level.changed() => {
                if changed.is_err() {
                    break;
                }
                let value = *level.borrow_and_update();
                let _ = write!(out, "\r{} {:>5.3}", level_bar(value, 40), value);
                let _ = out.flush();
                frames += 1;
            }
        }
    }
    frames
}

/// Summarize a configuration that can start calls, or explain what is missing
fn check_config(config: &ClientConfig) -> Result<String> {
    if let Err(e) = config.validate() {
        anyhow::bail!(
            "{}\n  {} (required)\n  {} (recommended) or {}",
            e,
            ENV_PUBLIC_KEY,
            ENV_SQUAD_ID,
            ENV_RAM_ASSISTANT_ID
        );
    }
    let target = config.call_target().unwrap_or_default();
    let source = if config.assistant_id.as_deref() == Some(target) {
        ENV_RAM_ASSISTANT_ID
    } else {
        ENV_SQUAD_ID
    };
    Ok(format!("Configuration OK; calls start against {} ({})", target, source))
}

/// Fixed-width bar for a level in [0, 1]
fn level_bar(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}
