use clap::Parser;
use lanesync::config;
use lanesync::game::chart::ChartData;
use lanesync::game::gameplay::{GameplayContext, NoteManager};
use lanesync::game::note::NoteEvent;
use std::path::PathBuf;
use std::sync::Arc;

const FRAME_TIME_SEC: f32 = 1.0 / 60.0;
// Simulated playback keeps running this long past the chart so tails can fade out.
const TAIL_MS: f64 = 5000.0;

#[derive(Parser, Debug)]
#[command(name = "lanesync")]
#[command(about = "Replays a key-mode chart headlessly and logs note lifecycle events")]
struct Cli {
    /// Chart file in JSON form.
    chart: PathBuf,

    /// Gameplay config; created with defaults when missing.
    #[arg(default_value = config::CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let cli = Cli::parse();

    let cfg = config::load(&cli.config)?;
    log::set_max_level(cfg.log_level.as_level_filter());

    let chart = Arc::new(ChartData::load(&cli.chart)?);
    let end_ms = f64::from(chart.song_length_ms()) + TAIL_MS;

    let mut manager = NoteManager::new(GameplayContext::new(chart, cfg));
    manager.subscribe(|event| match event {
        NoteEvent::PressMissed(id) => log::info!("Press missed: note {}", id.0),
        NoteEvent::ReleaseSkipped(id) => log::info!("Release skipped: note {}", id.0),
        NoteEvent::ReleaseMissed(id) => log::info!("Release missed: note {}", id.0),
    });

    let frame_ms = f64::from(FRAME_TIME_SEC) * 1000.0 * f64::from(cfg.playback_rate);
    let mut song_time_ms = 0.0;
    let mut frames = 0u64;
    let mut misses = 0usize;
    while song_time_ms <= end_ms && !manager.is_finished() {
        manager.update(song_time_ms, FRAME_TIME_SEC);
        misses += manager
            .drain_events()
            .iter()
            .filter(|e| matches!(e, NoteEvent::PressMissed(_)))
            .count();
        song_time_ms += frame_ms;
        frames += 1;
    }

    log::info!(
        "Simulation finished after {frames} frames at {song_time_ms:.2}ms: {misses}/{} notes missed.",
        manager.pool().loaded()
    );
    manager.unload();
    Ok(())
}
