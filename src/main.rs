use std::process::ExitCode;
use tracing::{error, info};
use vl53l7cx_platform::probe::probe_entry;
use vl53l7cx_platform::{init_tracing, load_platform_config};

fn main() -> ExitCode {
    // RUST_LOG=debug for per-transfer logs, RUST_LOG=trace for per-chunk logs
    init_tracing();
    info!("[tof-probe] starting up...");

    // Load configuration from CONFIG_PATH or default
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    let platform_config_path = format!("{}/platform.toml", config_path);
    let config = match load_platform_config(&platform_config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("[config] {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("[config] loaded {} sensor(s)", config.sensors.len());

    // PROBE_WAIT_READY=1 also waits for one frame per live sensor
    let wait_ready = std::env::var("PROBE_WAIT_READY").map(|v| v == "1").unwrap_or(false);

    let reports: Vec<_> = config
        .sensors
        .iter()
        .map(|entry| probe_entry(entry, wait_ready))
        .collect();

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("[tof-probe] could not encode report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if reports.iter().all(|r| r.code == 0 && r.alive) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
