use crate::bus::Backend;
use crate::config::SensorEntry;
use crate::device::{Identity, StreamCountReady};
use crate::errors::PlatformError;
use crate::platform::Platform;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of probing one configured sensor
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub id: String,
    pub backend: Backend,
    pub path: String,
    pub identity: Option<Identity>,
    pub alive: bool,
    pub data_ready: Option<bool>,
    pub error: Option<String>,
    /// 0 on success, otherwise the platform status code.
    pub code: i32,
}

impl ProbeReport {
    fn new(entry: &SensorEntry) -> Self {
        Self {
            id: entry.id.clone(),
            backend: entry.backend,
            path: entry.device_path().to_string(),
            identity: None,
            alive: false,
            data_ready: None,
            error: None,
            code: 0,
        }
    }

    fn fail(mut self, err: PlatformError) -> Self {
        warn!("[probe] {}: {}", self.id, err);
        self.code = err.code();
        self.error = Some(err.to_string());
        self
    }
}

/// Opens the sensor described by `entry` and probes it.
pub fn probe_entry(entry: &SensorEntry, wait_ready: bool) -> ProbeReport {
    match Platform::from_entry(entry) {
        Ok(mut platform) => probe_platform(entry, &mut platform, wait_ready),
        Err(e) => ProbeReport::new(entry).fail(e),
    }
}

/// Checks identity and optionally waits for one data-ready event.
pub fn probe_platform(
    entry: &SensorEntry,
    platform: &mut Platform,
    wait_ready: bool,
) -> ProbeReport {
    let mut report = ProbeReport::new(entry);

    let identity = match platform.read_identity() {
        Ok(identity) => identity,
        Err(e) => return report.fail(e),
    };
    report.identity = Some(identity);
    report.alive = identity.is_vl53l7cx();
    info!(
        "[probe] {}: device id {:#04x} rev {:#04x} alive={}",
        report.id, identity.device_id, identity.revision_id, report.alive
    );

    if wait_ready && report.alive {
        let mut ready = StreamCountReady::new();
        match platform.wait_for_data_ready(&mut ready) {
            Ok(()) => report.data_ready = Some(true),
            Err(e) => {
                report.data_ready = Some(false);
                return report.fail(e);
            }
        }
    }
    report
}
