// src/main.rs

mod classifier;
mod config;
mod error;
mod features;
mod model;
mod pipeline;
mod recorder;
mod sample_source;
mod segmenter;
mod storage;
mod types;
mod window_buffer;

use anyhow::Result;
use model::ThresholdModel;
use pipeline::{PipelineEvent, TrackingSession};
use sample_source::{LocationSource, SampleSource, SimulatedGps, SimulatedImu};
use std::time::Duration;
use storage::PathStore;
use tracing::{info, warn};
use types::{BehaviorLabel, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load("config.yaml").unwrap_or_else(|e| {
        eprintln!("config.yaml not loaded ({e}), using defaults");
        Config::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(format!("drive_behavior={}", config.logging.level))
        .init();

    info!("🚗 Driving Behavior Tracker Starting");
    info!(
        "Sampling {} Hz per channel, classification every {:.0}s, min window {}",
        config.sampling.rate_hz,
        config.classification.tick_seconds,
        config.classification.min_window_size
    );

    let store = PathStore::new(&config.storage.data_dir);
    let mut session =
        TrackingSession::new(config.clone(), ThresholdModel::default(), store.clone());

    let mut imu = SimulatedImu::new(config.sampling.rate_hz);
    let mut gps = SimulatedGps::new(
        config.location.min_distance_meters,
        config.location.report_interval_seconds,
    );

    session.start()?;
    imu.start(session.sample_sink())?;
    gps.start(session.latest_fix())?;
    info!(
        "✓ Tracking session running for {:.0}s",
        config.demo.duration_seconds
    );

    let events = session.events();
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs_f64(config.demo.duration_seconds);
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    while tokio::time::Instant::now() < deadline {
        poll.tick().await;
        for event in events.lock().drain() {
            match event {
                PipelineEvent::BehaviorObserved { observation } => info!(
                    "🏷️  behavior: {} (confidence {:.2})",
                    observation.label, observation.confidence
                ),
                PipelineEvent::TickSkipped { reason } => info!("tick skipped: {reason}"),
                PipelineEvent::PathCompleted(_) => {}
            }
        }
    }

    imu.stop();
    gps.stop();
    let path = session.stop().await?;

    match path {
        Some(path) => {
            info!("\n========================================");
            info!("Session summary");
            info!("========================================");
            info!("  Path id: {}", path.id);
            info!(
                "  Duration: {}s",
                (path.end_time - path.start_time).num_seconds()
            );
            info!(
                "  Segments: {} ({} coordinates)",
                path.segments.len(),
                path.coordinate_count()
            );
            for (i, segment) in path.segments.iter().enumerate() {
                info!(
                    "   {}. {:<8} {} point(s) [{}]",
                    i + 1,
                    segment.behavior.as_str(),
                    segment.coordinates.len(),
                    segment.behavior.color_name()
                );
            }
            info!("  Time per behavior:");
            for label in BehaviorLabel::CLOSED_SET
                .into_iter()
                .chain([BehaviorLabel::Unknown])
            {
                let seconds = path.behavior_times.seconds(label);
                if seconds > 0.0 {
                    info!("    {:>8}: {:>6.1}s", label.as_str(), seconds);
                }
            }
        }
        None => warn!("no path produced"),
    }

    let metrics = session.metrics().summary();
    info!(
        "  Samples ingested: {} ({:.0}/s)",
        metrics.samples_ingested, metrics.samples_per_sec
    );
    info!(
        "  Ticks: {} total, {} skipped, {} classification failure(s)",
        metrics.ticks_total, metrics.ticks_skipped, metrics.classifications_failed
    );

    let stored = store.load_all()?;
    info!(
        "💾 {} path(s) on disk in {}",
        stored.len(),
        config.storage.data_dir
    );

    Ok(())
}
