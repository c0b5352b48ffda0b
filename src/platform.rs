use crate::bus::{build_transport, Backend, RegisterBus, Transport};
use crate::config::SensorEntry;
use crate::delay::StdDelay;
use crate::device;
use crate::errors::PlatformResult;
use crate::ready::DataReadyCheck;
use embedded_hal::delay::DelayNs;
use tracing::info;

/// Per-sensor platform handle handed to the sensor driver.
///
/// Owns the transport and with it the device descriptor. The descriptor is
/// released on [`Platform::close`] or when the handle is dropped.
pub struct Platform {
    id: String,
    address: u16,
    transport: Box<dyn Transport>,
    delay: Box<dyn DelayNs + Send>,
}

impl Platform {
    /// Wraps a transport without opening it.
    pub fn new(
        id: impl Into<String>,
        address: u16,
        transport: Box<dyn Transport>,
        delay: Box<dyn DelayNs + Send>,
    ) -> Self {
        Self {
            id: id.into(),
            address,
            transport,
            delay,
        }
    }

    /// Builds the configured backend and opens it.
    pub fn from_entry(entry: &SensorEntry) -> PlatformResult<Self> {
        entry.validate()?;
        let transport = build_transport(entry)?;
        let mut platform = Self::new(
            entry.id.clone(),
            entry.address,
            transport,
            Box::new(StdDelay),
        );
        platform.init()?;
        Ok(platform)
    }

    pub fn init(&mut self) -> PlatformResult<()> {
        self.transport.open()?;
        info!(
            "[platform] {} ready on {:?} backend (address {:#04x})",
            self.id,
            self.transport.backend(),
            self.address
        );
        Ok(())
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 8-bit bus address.
    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn backend(&self) -> Backend {
        self.transport.backend()
    }

    pub fn read_multi(&mut self, register: u16, buf: &mut [u8]) -> PlatformResult<()> {
        self.transport.read(register, buf)
    }

    pub fn write_multi(&mut self, register: u16, data: &[u8]) -> PlatformResult<()> {
        self.transport.write(register, data)
    }

    pub fn rd_byte(&mut self, register: u16) -> PlatformResult<u8> {
        let mut value = [0u8; 1];
        self.transport.read(register, &mut value)?;
        Ok(value[0])
    }

    pub fn wr_byte(&mut self, register: u16, value: u8) -> PlatformResult<()> {
        self.transport.write(register, &[value])
    }

    pub fn wait_ms(&mut self, duration_ms: u32) {
        self.delay.delay_ms(duration_ms);
    }

    /// Blocks until the sensor has a new frame; see [`Transport::wait_ready`].
    pub fn wait_for_data_ready(&mut self, check: &mut dyn DataReadyCheck) -> PlatformResult<()> {
        self.transport.wait_ready(check, &mut *self.delay)
    }

    pub fn is_alive(&mut self) -> PlatformResult<bool> {
        device::is_alive(self)
    }

    pub fn read_identity(&mut self) -> PlatformResult<device::Identity> {
        device::read_identity(self)
    }
}

impl RegisterBus for Platform {
    fn read(&mut self, register: u16, buf: &mut [u8]) -> PlatformResult<()> {
        self.read_multi(register, buf)
    }

    fn write(&mut self, register: u16, data: &[u8]) -> PlatformResult<()> {
        self.write_multi(register, data)
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.transport.close();
    }
}
