//! SyncStart - command-line host harness
//!
//! Drives a sync-start session the way a game's frame loop would.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use syncstart::config::{self, Config};
use syncstart::protocol;
use syncstart::transport::MemoryHub;
use syncstart::{ParticipantCount, SyncStartManager};

/// SyncStart - LAN sync-start for rhythm game cabinets
#[derive(Parser)]
#[command(name = "syncstart")]
#[command(author = "SyncStart Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Agree on a song and a common start frame across game instances", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a session over UDP and wait for the start decision
    Run {
        /// Identifier of the song to play ("<group>/<song>")
        #[arg(short, long)]
        song: String,

        /// Earliest local frame we can start at
        #[arg(short, long, default_value_t = 0)]
        frame: i64,

        /// Also vote for the preview before starting
        #[arg(long)]
        preview: bool,
    },

    /// Run several participants in-process and show the decisions
    Simulate {
        /// Number of participants
        #[arg(short, long, default_value_t = 2)]
        participants: u32,

        /// Identifier of the song to agree on
        #[arg(short, long, default_value = "Simulated/Song")]
        song: String,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Run { song, frame, preview } => {
            run_session(config, song, frame, preview).await?;
        }
        Commands::Simulate { participants, song } => {
            run_simulation(participants, &song)?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info(&config);
        }
    }

    Ok(())
}

fn init_logging(config: &Config, verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = match &config.general.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

/// Join a real session and tick until gameplay may begin
async fn run_session(config: Config, song: String, ready_frame: i64, preview: bool) -> anyhow::Result<()> {
    let mut session = SyncStartManager::from_config(&config)?;
    if !session.is_enabled() {
        anyhow::bail!("Sync transport unavailable; nothing to coordinate");
    }

    let tick_hz = config.session.tick_rate_hz.max(1);
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(tick_hz)));
    let mut frame: i64 = 0;
    let mut start_at: Option<i64> = None;

    tracing::info!(
        "Joining '{}' as '{}' ({} participants, {} Hz)",
        song,
        config.general.name,
        session.participants(),
        tick_hz
    );

    session.announce_selected(&song);
    if preview {
        session.announce_ready_to_preview(&song, ready_frame);
    }
    session.announce_ready_to_start(&song, ready_frame);

    println!("Broadcasting to {}", session.transport().broadcast_target());
    println!("Waiting for {} participant(s) to be ready for '{}'...", session.participants(), song);
    println!("Press Ctrl+C to give up.\n");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                frame += 1;
                session.tick();

                if let Some(selected) = session.take_pending_selection() {
                    println!("Selection changed to '{}'", selected);
                }
                if let Some(preview_frame) = session.try_consume_preview() {
                    println!("Preview agreed at frame {}", preview_frame);
                }
                if let Some(agreed) = session.try_consume_start() {
                    println!("Start agreed at frame {}", agreed);
                    start_at = Some(agreed);
                }

                if let Some(agreed) = start_at {
                    if !session.should_stall() && frame >= agreed {
                        println!("Starting gameplay at local frame {}", frame);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nGiving up; proceeding unsynchronized.");
                break;
            }
        }
    }

    session.end_current_song();
    Ok(())
}

/// Walk N in-process participants through selection, preview and start
fn run_simulation(participants: u32, song: &str) -> anyhow::Result<()> {
    let count = ParticipantCount::new(participants)
        .ok_or_else(|| anyhow::anyhow!("A session needs at least one participant"))?;

    let hub = MemoryHub::new();
    let mut peers: Vec<_> = (0..participants)
        .map(|_| SyncStartManager::new(hub.endpoint(), count))
        .collect();

    println!("Simulating {} participants agreeing on '{}'\n", participants, song);

    peers[0].announce_selected(song);
    for (i, peer) in peers.iter_mut().enumerate() {
        peer.tick();
        if let Some(selected) = peer.take_pending_selection() {
            println!("  participant {} switches to '{}'", i, selected);
        }
    }

    for (i, peer) in peers.iter_mut().enumerate() {
        peer.announce_ready_to_preview(song, 10 * i as i64);
    }
    for (i, peer) in peers.iter_mut().enumerate() {
        peer.tick();
        if let Some(frame) = peer.try_consume_preview() {
            println!("  participant {} previews at frame {}", i, frame);
        }
    }

    // Slower machines report later frames
    for (i, peer) in peers.iter_mut().enumerate() {
        peer.announce_ready_to_start(song, 100 + 25 * i as i64);
    }
    for (i, peer) in peers.iter_mut().enumerate() {
        peer.tick();
        match peer.try_consume_start() {
            Some(frame) => println!("  participant {} starts at frame {}", i, frame),
            None => println!("  participant {} is still stalled", i),
        }
        peer.end_current_song();
    }

    println!("\n{} datagrams exchanged.", hub.sent_count());
    Ok(())
}

/// Print protocol information
fn print_protocol_info(config: &Config) {
    println!("SyncStart Protocol Information");
    println!("==============================\n");

    println!("Opcodes:");
    println!("  0  SongSelected    opcode | identifier");
    println!("  1  ReadyToPreview  opcode | i64 frame (BE) | identifier");
    println!("  2  ReadyToStart    opcode | i64 frame (BE) | identifier");

    println!("\nDefault Port: {}", protocol::DEFAULT_PORT);
    println!("Default Broadcast: {}", protocol::DEFAULT_BROADCAST_ADDR);
    println!("Max Payload: {} bytes", protocol::MAX_PAYLOAD);

    println!("\nConfigured:");
    println!("  Broadcast: {}:{}", config.network.broadcast_address, config.network.port);
    println!("  Participants: {}", config.session.participants);
}
