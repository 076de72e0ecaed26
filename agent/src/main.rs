mod camera;
mod classifier;
mod driver;
mod interaction;
mod playback;
mod sampler;

use moodloop_common::config::Config;
use moodloop_common::SAMPLE_INTERVAL;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use classifier::HttpClassifier;
use driver::LoopDriver;
use playback::{ConsoleDisplay, PlaybackCoordinator, ProcessAudioSink, Status, StatusDisplay};
use sampler::FrameSampler;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    // stdout belongs to the status display
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        camera = config.camera.url,
        mode = config.camera.mode,
        classifier = config.detect_url(),
        player = config.playback.player,
        "starting moodloop agent"
    );

    playback::check_player_available(&config.playback.player).await;

    let mut display = ConsoleDisplay::new();
    let source = match camera::acquire(&config.camera).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "camera unavailable, not starting the sampling loop");
            display.show_status(&Status::DeviceUnavailable);
            std::process::exit(1);
        }
    };

    let timeout = config.classifier.request_timeout_secs.map(Duration::from_secs);
    let classifier = match HttpClassifier::new(config.detect_url(), timeout) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to create classifier client");
            std::process::exit(1);
        }
    };

    let audio = ProcessAudioSink::new(
        config.playback.player.clone(),
        config.playback.player_args.clone(),
        config.media_base_url(),
    );
    let coordinator = PlaybackCoordinator::new(Box::new(audio), Box::new(display));

    let (interaction_tx, interaction_rx) = mpsc::channel(1);
    interaction::spawn_stdin_listener(interaction_tx);

    let driver = LoopDriver::new(
        Arc::new(FrameSampler::new(source)),
        Arc::new(classifier),
        coordinator,
        SAMPLE_INTERVAL,
    );

    let driver = driver
        .run(interaction_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        stats = ?driver.stats(),
        state = ?driver.coordinator().state(),
        "moodloop agent stopped"
    );
}
