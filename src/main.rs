//! # r2grap
//!
//! Headless player: loads a scene description, builds its render list and
//! plays it through a recording backend on a fixed-timestep clock, then
//! reports what each frame drew.

use anyhow::{bail, Context, Result};
use clap::Parser;
use r2grap_core::{FrameStats, Player, RecordingBackend, TessellationConfig};
use r2grap_data::model::SceneDescription;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "r2grap")]
#[command(about = "Play a vector animation headlessly and report per-frame draws")]
#[command(version)]
struct Cli {
    /// Path to the scene description (.json)
    scene: PathBuf,

    /// Number of frames to render (defaults to one full loop)
    #[arg(short, long)]
    frames: Option<usize>,

    /// Simulated seconds between clock ticks (defaults to one frame)
    #[arg(short, long)]
    interval: Option<f32>,

    /// Curve flattening tolerance in pixels
    #[arg(short, long, default_value_t = TessellationConfig::default().tolerance)]
    tolerance: f64,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    report_json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    scene: String,
    objects: usize,
    animated_objects: usize,
    frame_count: usize,
    frames: &'a [FrameStats],
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("r2grap=info,r2grap_core=info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let text = std::fs::read_to_string(&cli.scene)
        .with_context(|| format!("Failed to read scene {}", cli.scene.display()))?;
    let desc: SceneDescription = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse scene {}", cli.scene.display()))?;

    let config = TessellationConfig {
        tolerance: cli.tolerance,
    };
    let list = r2grap_core::load(&desc, config)
        .with_context(|| format!("Failed to build scene {}", cli.scene.display()))?;

    let info = *list.info();
    let target = cli.frames.unwrap_or_else(|| info.frame_count());
    let interval = cli.interval.unwrap_or(1.0 / info.frame_rate);
    if interval <= 0.0 || !interval.is_finite() {
        bail!("Frame interval must be a positive number of seconds, got {interval}");
    }

    let objects = list.len();
    let animated_objects = list.objects().iter().filter(|o| !o.keep_transform).count();
    let mut player = Player::new(list, RecordingBackend::new());
    let mut ticks = 0usize;
    while player.frames_rendered() < target {
        player.tick(interval);
        ticks += 1;
    }
    tracing::info!(
        frames = player.frames_rendered(),
        ticks,
        last_frame = player.current_frame(),
        "playback finished"
    );

    let backend = player.into_backend();
    let report = Report {
        scene: desc.name.clone().unwrap_or_else(|| cli.scene.display().to_string()),
        objects,
        animated_objects,
        frame_count: info.frame_count(),
        frames: backend.frames(),
    };

    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn print_table(report: &Report<'_>) {
    println!(
        "{}: {} objects ({} animated), {} frames per loop",
        report.scene, report.objects, report.animated_objects, report.frame_count
    );
    println!("{:>6} {:>6} {:>10} {:>10} {:>8}", "frame", "draws", "triangles", "lines", "uploads");
    for stats in report.frames {
        println!(
            "{:>6} {:>6} {:>10} {:>10} {:>8}",
            stats.frame, stats.draws, stats.triangles, stats.line_vertices, stats.uploads
        );
    }
}
