pub mod chunk;
pub mod i2c;
pub mod kernel;

use crate::config::SensorEntry;
use crate::errors::PlatformResult;
use crate::ready::DataReadyCheck;
use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};

/// Backend kind for the platform transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// I2C character device driven through I2C_RDWR.
    I2c,
    /// stmvl53l7cx kernel module doing the bus work itself.
    Kernel,
}

impl Backend {
    pub fn default_path(&self) -> &'static str {
        match self {
            Backend::I2c => "/dev/i2c-1",
            Backend::Kernel => "/dev/stmvl53l7cx",
        }
    }
}

/// Register-level access to the sensor.
///
/// Registers are 16 bits wide and the device auto-increments the register
/// index across a transfer.
pub trait RegisterBus {
    fn read(&mut self, register: u16, buf: &mut [u8]) -> PlatformResult<()>;
    fn write(&mut self, register: u16, data: &[u8]) -> PlatformResult<()>;
}

/// A backend the platform handle drives
pub trait Transport: RegisterBus + Send {
    fn open(&mut self) -> PlatformResult<()>;

    /// Releases the device node. Closing a closed transport does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Blocks until the sensor signals a new frame.
    ///
    /// Backends without an interrupt line poll `check`, sleeping on `delay`
    /// between polls.
    fn wait_ready(
        &mut self,
        check: &mut dyn DataReadyCheck,
        delay: &mut dyn DelayNs,
    ) -> PlatformResult<()>;

    fn backend(&self) -> Backend;
}

/// Builds the configured backend, not yet opened
#[cfg(target_os = "linux")]
pub fn build_transport(entry: &SensorEntry) -> PlatformResult<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match entry.backend {
        Backend::I2c => Box::new(i2c::DirectI2cTransport::linux(entry)),
        Backend::Kernel => Box::new(kernel::KernelDriverTransport::linux(entry)),
    };
    Ok(transport)
}

#[cfg(not(target_os = "linux"))]
pub fn build_transport(entry: &SensorEntry) -> PlatformResult<Box<dyn Transport>> {
    Err(crate::errors::PlatformError::comms(
        "open",
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("{:?} backend is only supported on Linux", entry.backend),
        ),
    ))
}
