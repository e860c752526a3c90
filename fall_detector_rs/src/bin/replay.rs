use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use fall_detector_rs::replay::load_samples;
use fall_detector_rs::{DetectorConfig, FallDetector, FallDetectorError, FallEvent, RepeatPolicy};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(about = "Replay recorded accelerometer logs through the fall detector")]
struct Args {
    /// Path to comparison_*.json[.gz] log
    #[arg(long, conflicts_with = "log_dir")]
    log: Option<PathBuf>,

    /// Directory of logs to batch replay (processes *.json and *.json.gz)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// JSON detector config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Free-fall threshold in m/s²
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum time below threshold, ms
    #[arg(long)]
    min_duration_ms: Option<u64>,

    /// Cooldown between events, ms (0 = one event per episode)
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Write a JSON report here
    #[arg(long)]
    report: Option<PathBuf>,
}

fn build_config(args: &Args) -> anyhow::Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.fall_threshold = threshold;
    }
    if let Some(ms) = args.min_duration_ms {
        config.min_fall_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = args.cooldown_ms {
        config.repeat_policy = match ms {
            0 => RepeatPolicy::Episode,
            ms => RepeatPolicy::Cooldown {
                interval: Duration::from_millis(ms),
            },
        };
    }
    config.validate()?;
    Ok(config)
}

fn run_once(path: &Path, config: &DetectorConfig) -> anyhow::Result<serde_json::Value> {
    let samples = load_samples(path)?;
    let total = samples.len();
    let mut detector = FallDetector::new(config.clone())?;

    let mut events: Vec<FallEvent> = Vec::new();
    let mut out_of_order = 0usize;
    let mut malformed = 0usize;

    for result in detector.events(samples) {
        match result {
            Ok(event) => events.push(event),
            Err(FallDetectorError::InvalidSampleOrdering { .. }) => out_of_order += 1,
            Err(FallDetectorError::InvalidSample(_)) => malformed += 1,
            Err(e) => return Err(e.into()),
        }
    }

    println!("=== {} ===", path.display());
    println!(
        "  samples: {} | falls: {} | out of order: {} | malformed: {}",
        total,
        events.len(),
        out_of_order,
        malformed
    );
    for event in &events {
        println!(
            "  fall at {} after {}ms, magnitude {:.2} m/s²",
            event.detected_at,
            event.duration_below_threshold.as_millis(),
            event.acceleration_at_detection
        );
    }

    Ok(json!({
        "log": path.display().to_string(),
        "samples": total,
        "out_of_order": out_of_order,
        "malformed": malformed,
        "events": events,
    }))
}

fn is_log_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.ends_with(".json") || name.ends_with(".json.gz")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let paths: Vec<PathBuf> = match (&args.log, &args.log_dir) {
        (Some(log), _) => vec![log.clone()],
        (None, Some(dir)) => {
            let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_log_file(p))
                .collect();
            paths.sort();
            paths
        }
        (None, None) => anyhow::bail!("pass --log or --log-dir"),
    };

    let mut results = Vec::with_capacity(paths.len());
    for path in &paths {
        match run_once(path, &config) {
            Ok(result) => results.push(result),
            Err(e) => eprintln!("Skipping {}: {}", path.display(), e),
        }
    }

    if let Some(report) = &args.report {
        let body = json!({ "config": config, "results": results });
        fs::write(report, serde_json::to_string_pretty(&body)?)?;
        println!("Report written to {}", report.display());
    }

    Ok(())
}
