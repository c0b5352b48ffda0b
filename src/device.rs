//! Sensor-side register conventions the platform layer needs: identity
//! probing and the stock data-ready check.

use crate::bus::RegisterBus;
use crate::errors::{PlatformError, PlatformResult};
use crate::ready::DataReadyCheck;
use tracing::debug;

/// Page select register.
pub const PAGE_SELECT: u16 = 0x7FFF;
pub const DEVICE_ID: u16 = 0x0000;
pub const REVISION_ID: u16 = 0x0001;
/// Start of the 4-byte UI status block read by the data-ready check.
pub const UI_STATUS: u16 = 0x0000;

pub const EXPECTED_DEVICE_ID: u8 = 0xF0;
pub const EXPECTED_REVISION_ID: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Identity {
    pub device_id: u8,
    pub revision_id: u8,
}

impl Identity {
    pub fn is_vl53l7cx(&self) -> bool {
        self.device_id == EXPECTED_DEVICE_ID && self.revision_id == EXPECTED_REVISION_ID
    }
}

/// Reads device and revision id from page 0, then restores page 2.
pub fn read_identity(bus: &mut dyn RegisterBus) -> PlatformResult<Identity> {
    bus.write(PAGE_SELECT, &[0x00])?;
    let mut device_id = [0u8; 1];
    let mut revision_id = [0u8; 1];
    bus.read(DEVICE_ID, &mut device_id)?;
    bus.read(REVISION_ID, &mut revision_id)?;
    bus.write(PAGE_SELECT, &[0x02])?;

    let identity = Identity {
        device_id: device_id[0],
        revision_id: revision_id[0],
    };
    debug!(
        "[device] id={:#04x} rev={:#04x}",
        identity.device_id, identity.revision_id
    );
    Ok(identity)
}

pub fn is_alive(bus: &mut dyn RegisterBus) -> PlatformResult<bool> {
    Ok(read_identity(bus)?.is_vl53l7cx())
}

/// Data-ready check keyed on the sensor's stream counter.
///
/// A frame is new when the stream count moved since the last frame seen and
/// the status bytes show a completed measurement. The count starts at 0xFF,
/// which the sensor never reports, so the first frame is always new.
#[derive(Debug, Clone)]
pub struct StreamCountReady {
    stream_count: u8,
}

impl Default for StreamCountReady {
    fn default() -> Self {
        Self { stream_count: 0xFF }
    }
}

impl StreamCountReady {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_count(&self) -> u8 {
        self.stream_count
    }

    /// Applies one status block, returning whether it holds a new frame.
    pub fn update(&mut self, status: [u8; 4]) -> PlatformResult<bool> {
        if status[0] != self.stream_count
            && status[0] != 0xFF
            && status[1] == 0x05
            && (status[2] & 0x05) == 0x05
            && (status[3] & 0x10) == 0x10
        {
            self.stream_count = status[0];
            return Ok(true);
        }
        if status[3] & 0x80 != 0 && status[2] != 0 {
            return Err(PlatformError::DeviceStatus { status: status[2] });
        }
        Ok(false)
    }
}

impl DataReadyCheck for StreamCountReady {
    fn data_ready(&mut self, bus: &mut dyn RegisterBus) -> PlatformResult<bool> {
        let mut status = [0u8; 4];
        bus.read(UI_STATUS, &mut status)?;
        self.update(status)
    }
}
