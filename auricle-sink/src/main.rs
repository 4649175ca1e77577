//! Auricle audio sink daemon - main entry point
//!
//! Hosts the audio pipeline and drives it the way the Bluetooth profile
//! layer would: arm a session, configure the negotiated stream format,
//! feed paced PCM batches, and wind down on a signal with an orderly
//! suspend and teardown. The audio source is a locally generated tone,
//! delivered to a WAV capture file or the paced null device.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auricle_common::config::SinkConfig;
use auricle_common::events::{EventBus, PlaybackPhase, TransportState};
use auricle_common::volume_curves::percent_to_raw;
use auricle_common::StreamFormat;
use auricle_sink::audio::{NullSink, OutputSink, WavSink};
use auricle_sink::AudioPipeline;

/// Frequency of the generated test tone.
const TONE_HZ: f32 = 440.0;

/// Peak amplitude of the generated tone, out of i16 full scale.
const TONE_AMPLITUDE: f32 = 8192.0;

/// Command-line arguments for auricle-sink
#[derive(Parser, Debug)]
#[command(name = "auricle-sink")]
#[command(about = "Audio sink pipeline daemon")]
#[command(version)]
struct Args {
    /// Path to a TOML config file (otherwise resolved from
    /// AURICLE_CONFIG or the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture output to a WAV file instead of the null device
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many seconds (otherwise runs until a signal)
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Initial volume percentage, applied through the remote-volume path
    #[arg(short, long)]
    volume_percent: Option<u8>,

    /// Stream sample rate in Hz
    #[arg(long, default_value = "44100")]
    rate: u32,

    /// Stream channel count
    #[arg(long, default_value = "2")]
    channels: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auricle_sink=debug,auricle_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting Auricle audio sink v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config =
        SinkConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let format =
        StreamFormat::new(args.rate, 16, args.channels).context("Unsupported stream format")?;

    let sink: Box<dyn OutputSink> = match &args.output {
        Some(path) => {
            info!("Capturing output to {}", path.display());
            Box::new(WavSink::new(path, config.output.max_transfer_bytes))
        }
        None => Box::new(NullSink::new(
            config.output.max_transfer_bytes,
            config.output.paced,
        )),
    };

    let events = Arc::new(EventBus::new(256));
    spawn_event_logger(&events);

    let pipeline = Arc::new(
        AudioPipeline::new(config.clone(), sink, Arc::clone(&events))
            .context("Failed to initialize audio pipeline")?,
    );

    let session_id = pipeline.arm().context("Failed to arm pipeline")?;
    info!("Session {} armed", session_id);

    pipeline
        .on_stream_configured(format.sample_rate, format.bits_per_sample, format.channel_count)
        .context("Failed to configure output")?;

    if let Some(percent) = args.volume_percent {
        pipeline.on_remote_volume_set(percent_to_raw(percent));
    }

    // The tone source stands in for the profile layer's data callbacks
    let stop_feeding = Arc::new(AtomicBool::new(false));
    let feeder = {
        let pipeline = Arc::clone(&pipeline);
        let stop = Arc::clone(&stop_feeding);
        let burst_bytes = config.buffer.burst_bytes;
        tokio::task::spawn_blocking(move || feed_tone(&pipeline, &stop, format, burst_bytes))
    };

    pipeline
        .on_playback_state(TransportState::Active)
        .context("Failed to start playback")?;

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!("Run duration elapsed");
                }
            }
        }
        None => shutdown_signal().await,
    }

    // Orderly wind-down: stop the source, suspend (drains the buffer),
    // then tear down and disable the sink
    stop_feeding.store(true, Ordering::Relaxed);
    if let Err(e) = feeder.await {
        warn!("Tone source task failed: {}", e);
    }

    if pipeline.on_playback_state(TransportState::Suspended).is_ok() {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(500);
        while pipeline.phase() != PlaybackPhase::Paused
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    match serde_json::to_string(&pipeline.stats()) {
        Ok(json) => info!("Final stats: {}", json),
        Err(e) => warn!("Failed to serialize final stats: {}", e),
    }

    pipeline.shutdown().context("Failed to shut down output")?;

    info!("Shutdown complete");
    Ok(())
}

/// Mirror every pipeline event to the log as one JSON line.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!("Event: {}", json),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event logger lagged: {} events missed", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Generate a sine tone and push it through the producer path in
/// burst-sized batches at the stream's real-time byte rate.
fn feed_tone(
    pipeline: &AudioPipeline,
    stop: &AtomicBool,
    format: StreamFormat,
    burst_bytes: usize,
) {
    let frame_bytes = format.frame_bytes();
    let frames_per_burst = burst_bytes / frame_bytes;
    let burst_interval =
        Duration::from_secs_f64(burst_bytes as f64 / format.byte_rate() as f64);
    let step = TONE_HZ * std::f32::consts::TAU / format.sample_rate as f32;

    let mut batch = vec![0u8; frames_per_burst * frame_bytes];
    let mut angle: f32 = 0.0;

    info!(
        "Tone source started: {} Hz tone, {} byte bursts every {:?}",
        TONE_HZ as u32, burst_bytes, burst_interval
    );

    while !stop.load(Ordering::Relaxed) {
        for frame in batch.chunks_exact_mut(frame_bytes) {
            let sample = (angle.sin() * TONE_AMPLITUDE) as i16;
            angle = (angle + step) % std::f32::consts::TAU;
            for slot in frame.chunks_exact_mut(2) {
                slot.copy_from_slice(&sample.to_le_bytes());
            }
        }

        let accepted = pipeline.on_audio_data(&batch);
        if accepted != batch.len() {
            warn!(
                "Source batch not fully accepted: {} of {} bytes",
                accepted,
                batch.len()
            );
        }

        thread::sleep(burst_interval);
    }

    debug!("Tone source stopped");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
