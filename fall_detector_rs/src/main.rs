use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

use fall_detector_rs::health_monitor::{watchdog_task, SensorWatchdog};
use fall_detector_rs::sensors::{self, SensorDelay};
use fall_detector_rs::{
    AccelSample, DetectorConfig, DeviceContext, FallRecord, JsonDirStore, LogAlertSink,
    MonitorService, MonitorStats, RepeatPolicy,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// 2.0 m/s² for 50 ms, one alert per episode
    Background,
    /// 7.5 m/s², immediate, 5 s cooldown
    Foreground,
}

#[derive(Parser, Debug)]
#[command(name = "fall_monitor")]
#[command(about = "Monitor the accelerometer and raise alerts on free fall", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Detector tuning preset
    #[arg(long, value_enum, default_value = "background")]
    preset: Preset,

    /// JSON detector config, applied over the preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Free-fall threshold in m/s²
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum time below threshold, ms
    #[arg(long)]
    min_duration_ms: Option<u64>,

    /// Cooldown between alerts, ms (0 = one alert per episode)
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Sampling delay class
    #[arg(long, value_enum, default_value = "game")]
    sensor_delay: SensorDelay,

    /// Use the scripted mock accelerometer instead of termux-sensor
    #[arg(long)]
    mock: bool,

    #[arg(long, default_value = "anonymous")]
    user_id: String,

    #[arg(long, default_value = "unknown")]
    device_model: String,

    /// Number offered by the call-emergency alert action
    #[arg(long)]
    emergency_number: Option<String>,

    /// Output directory
    #[arg(long, default_value = "fall_detector_sessions")]
    output_dir: PathBuf,
}

#[derive(Serialize)]
struct SessionSummary {
    started_at: String,
    ended_at: String,
    config: DetectorConfig,
    stats: MonitorStats,
    records: Vec<FallRecord>,
}

fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => match args.preset {
            Preset::Background => DetectorConfig::background_service(),
            Preset::Foreground => DetectorConfig::foreground_service(),
        },
    };

    if let Some(threshold) = args.threshold {
        config.fall_threshold = threshold;
    }
    if let Some(ms) = args.min_duration_ms {
        config.min_fall_duration = Duration::from_millis(ms);
    }
    match args.cooldown_ms {
        Some(0) => config.repeat_policy = RepeatPolicy::Episode,
        Some(ms) => {
            config.repeat_policy = RepeatPolicy::Cooldown {
                interval: Duration::from_millis(ms),
            }
        }
        None => {}
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;

    log::info!("Fall monitor starting");
    log::info!("  Duration: {} seconds (0=continuous)", args.duration);
    log::info!("  Config: {:?}", config);
    log::info!("  Sensor delay: {:?} ({:?})", args.sensor_delay, args.sensor_delay.interval());
    log::info!("  Output dir: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)?;

    let sensor_available = args.mock || sensors::probe_accelerometer().await;

    let context = DeviceContext {
        user_id: args.user_id.clone(),
        device_model: args.device_model.clone(),
    };
    let mut service = MonitorService::new(config.clone(), context, Box::new(LogAlertSink))?
        .with_store(Box::new(JsonDirStore::new(&args.output_dir)));
    if let Some(number) = &args.emergency_number {
        service = service.with_emergency_number(number.clone());
    }
    service.start(sensor_available)?;

    let (accel_tx, mut accel_rx) = mpsc::channel::<AccelSample>(500);
    let _accel_handle = tokio::spawn(sensors::accel_loop(accel_tx, args.sensor_delay, args.mock));

    let watchdog = Arc::new(SensorWatchdog::new("Accel", Duration::from_secs(5)));
    let _watchdog_handle = tokio::spawn(watchdog_task(watchdog.clone(), Duration::from_secs(2)));

    let started_at = Utc::now();
    let deadline = (args.duration > 0).then(|| Instant::now() + Duration::from_secs(args.duration));
    let mut records = Vec::new();

    loop {
        let sample = tokio::select! {
            sample = accel_rx.recv() => sample,
            _ = wait_for(deadline) => {
                log::info!("Duration reached, stopping...");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping...");
                break;
            }
        };

        let Some(sample) = sample else {
            log::warn!("Sensor loop ended");
            break;
        };
        watchdog.feed();

        match service.on_sample(sample) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("Sample skipped: {}", e),
        }
    }

    service.stop()?;

    let summary = SessionSummary {
        started_at: started_at.to_rfc3339(),
        ended_at: Utc::now().to_rfc3339(),
        config,
        stats: service.stats().clone(),
        records,
    };
    let filename = args
        .output_dir
        .join(format!("session_{}.json", Utc::now().format("%Y%m%d_%H%M%S")));
    std::fs::write(&filename, serde_json::to_string_pretty(&summary)?)?;

    println!("\n=== Session Stats ===");
    println!("Samples observed: {}", summary.stats.samples_observed);
    println!("Samples rejected: {}", summary.stats.samples_rejected);
    println!("Falls detected:   {}", summary.stats.events_detected);
    println!("Summary written to {}", filename.display());

    Ok(())
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
