use clap::Parser;
use log::{error, info, log};
use sound_instance::audio::{InstancePool, MonotonicClock, PlaybackInstance, Ticker, TimerSourceFactory};
use sound_instance::config::{ConfigManager, PlaybackConfig, MAX_TICK_RATE_HZ};
use sound_instance::logging::EventLogger;
use sound_instance::{InstanceEvent, PlaybackError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Play a simulated clip through a pooled playback instance
#[derive(Debug, Parser)]
#[command(name = "clipplay")]
#[command(about = "Drive a silent, timed clip through the playback instance lifecycle")]
#[command(version = "0.1.0")]
struct Cli {
    /// Clip length in seconds
    #[arg(short, long, default_value_t = 3.0)]
    duration: f64,

    /// Start offset in seconds
    #[arg(short, long, default_value_t = 0.0)]
    offset: f64,

    /// Pause after this many seconds of playback
    #[arg(long)]
    pause_at: Option<f64>,

    /// Stay paused for this many seconds before resuming
    #[arg(long, default_value_t = 1.0)]
    resume_after: f64,

    /// Stop explicitly after this many seconds
    #[arg(long)]
    stop_at: Option<f64>,

    /// Configuration file (defaults to ~/.config/sound-instance/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured tick rate
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Persist --tick-rate to the configuration file
    #[arg(long, requires = "tick_rate")]
    save: bool,
}

fn load_config(cli: &Cli) -> PlaybackConfig {
    let mut manager = match &cli.config {
        Some(path) => Some(ConfigManager::open(path.clone())),
        None => ConfigManager::new().ok(),
    };

    // Logging is not up yet, so report straight to stderr
    if let (true, Some(rate), Some(manager)) = (cli.save, cli.tick_rate, manager.as_mut()) {
        match manager.set_tick_rate(rate) {
            Ok(()) => eprintln!("Saved tick rate to {}", manager.config_path().display()),
            Err(e) => eprintln!("Warning: Failed to save tick rate: {}", e),
        }
    }

    let mut config = manager
        .map(|manager| manager.get_config().clone())
        .unwrap_or_default();
    if let Some(rate) = cli.tick_rate {
        config.tick_rate_hz = rate.clamp(1, MAX_TICK_RATE_HZ);
    }
    config
}

/// Non-negative seconds, saturating instead of overflowing
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Pause/resume and stop on the requested schedule
fn spawn_controls(cli: &Cli, instance: PlaybackInstance) {
    if let Some(pause_at) = cli.pause_at {
        let instance = instance.clone();
        let resume_after = cli.resume_after;
        tokio::spawn(async move {
            tokio::time::sleep(seconds(pause_at)).await;
            if let Err(e) = instance.set_paused(true) {
                error!("Pause failed: {}", e);
                return;
            }
            tokio::time::sleep(seconds(resume_after)).await;
            if let Err(e) = instance.set_paused(false) {
                error!("Resume failed: {}", e);
            }
        });
    }

    if let Some(stop_at) = cli.stop_at {
        tokio::spawn(async move {
            tokio::time::sleep(seconds(stop_at)).await;
            instance.stop();
        });
    }
}

fn render_progress(value: f64) {
    const WIDTH: usize = 40;
    let filled = (value * WIDTH as f64).round() as usize;
    print!(
        "\r[{}{}] {:5.1}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled.min(WIDTH)),
        value * 100.0
    );
    let _ = io::stdout().flush();
}

async fn run(cli: Cli, config: PlaybackConfig) -> Result<(), PlaybackError> {
    let ticker = Arc::new(Ticker::new());
    let ticking = ticker.spawn(config.tick_interval(), &Handle::current());
    let pool = InstancePool::from_config(&config, Some(ticker.clone()), Arc::new(MonotonicClock::new()));
    let factory = Arc::new(TimerSourceFactory::from_secs_f64(cli.duration, Handle::current())?);
    let logger = EventLogger::new();

    let instance = pool.acquire(factory);
    let mut events = instance.subscribe();
    instance.play(seconds(cli.offset))?;
    spawn_controls(&cli, instance.clone());

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                logger.record(instance.id(), &event);

                match event {
                    InstanceEvent::Progress(value) => render_progress(value),
                    InstanceEvent::Paused => println!("\npaused at {:.2}s", instance.position().as_secs_f64()),
                    InstanceEvent::Resumed => println!("resuming"),
                    InstanceEvent::Stop => {
                        println!("\nstopped");
                        pool.release(&instance);
                        break;
                    }
                    InstanceEvent::End(ended) => {
                        println!("\nfinished");
                        pool.release(&ended);
                        break;
                    }
                    InstanceEvent::Start | InstanceEvent::Pause(_) => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\ninterrupted");
                instance.stop();
                pool.release(&instance);
                break;
            }
        }
    }

    ticking.abort();
    info!("Pool after playback: {:?}", pool.stats());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli);

    if let Err(e) = EventLogger::init(&config.log_level) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli, config).await {
        log!(e.severity().log_level(), "{}", e);
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
