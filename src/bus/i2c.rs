use crate::bus::chunk::{check_register_span, ChunkPlan, ZeroLengthPolicy, HEADER_LEN};
use crate::bus::{Backend, RegisterBus, Transport};
use crate::config::platform_config::MAX_CHUNK_SIZE;
use crate::config::SensorEntry;
use crate::errors::{PlatformError, PlatformResult};
use crate::ready::{poll_until_ready, DataReadyCheck, PollSettings};
use embedded_hal::delay::DelayNs;
use std::io;
use tracing::{debug, error, info, trace};

#[cfg(target_os = "linux")]
use i2cdev::core::{I2CMessage, I2CTransfer};
#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CMessage};

/// I2C_RDWR message transactions against one bound slave
pub trait I2cMessages: Send {
    /// A single write message.
    fn write_message(&mut self, address: u16, data: &[u8]) -> io::Result<()>;

    /// A write message followed by a read message in one combined transaction.
    fn write_read_messages(
        &mut self,
        address: u16,
        header: &[u8],
        data: &mut [u8],
    ) -> io::Result<()>;
}

#[cfg(target_os = "linux")]
impl I2cMessages for LinuxI2CDevice {
    fn write_message(&mut self, address: u16, data: &[u8]) -> io::Result<()> {
        let mut msgs = [LinuxI2CMessage::write(data).with_address(address)];
        self.transfer(&mut msgs).map_err(io::Error::from)?;
        Ok(())
    }

    fn write_read_messages(
        &mut self,
        address: u16,
        header: &[u8],
        data: &mut [u8],
    ) -> io::Result<()> {
        let mut msgs = [
            LinuxI2CMessage::write(header).with_address(address),
            LinuxI2CMessage::read(data).with_address(address),
        ];
        self.transfer(&mut msgs).map_err(io::Error::from)?;
        Ok(())
    }
}

/// Opens the device node and binds the 7-bit slave address
pub type I2cOpener<D> = Box<dyn FnMut(&str, u16) -> io::Result<D> + Send>;

/// Direct I2C transport: chunked register transfers over an I2C character device
pub struct DirectI2cTransport<D> {
    path: String,
    slave_address: u16,
    opener: I2cOpener<D>,
    device: Option<D>,
    /// Header + payload scratch space for write chunks
    buffer: Vec<u8>,
    zero_length: ZeroLengthPolicy,
    poll: PollSettings,
}

impl<D: I2cMessages> DirectI2cTransport<D> {
    pub fn new(entry: &SensorEntry, opener: I2cOpener<D>) -> Self {
        Self {
            path: entry.device_path().to_string(),
            slave_address: entry.slave_address(),
            opener,
            device: None,
            buffer: vec![0u8; entry.chunk_size.clamp(HEADER_LEN + 1, MAX_CHUNK_SIZE)],
            zero_length: entry.zero_length,
            poll: PollSettings::from_entry(entry),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn slave_address(&self) -> u16 {
        self.slave_address
    }

    /// Largest payload a single write chunk carries.
    pub fn max_write_chunk(&self) -> usize {
        self.buffer.len() - HEADER_LEN
    }

    /// Largest payload a single read chunk carries.
    pub fn max_read_chunk(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(target_os = "linux")]
impl DirectI2cTransport<LinuxI2CDevice> {
    pub fn linux(entry: &SensorEntry) -> Self {
        Self::new(
            entry,
            Box::new(|path: &str, address: u16| {
                LinuxI2CDevice::new(path, address).map_err(io::Error::from)
            }),
        )
    }
}

impl<D: I2cMessages> RegisterBus for DirectI2cTransport<D> {
    fn read(&mut self, register: u16, buf: &mut [u8]) -> PlatformResult<()> {
        check_register_span(register, buf.len())?;
        let max_len = self.max_read_chunk();
        let device = self.device.as_mut().ok_or(PlatformError::NotOpen)?;
        debug!("[i2c] read {} byte(s) at {:#06x}", buf.len(), register);

        for chunk in ChunkPlan::new(register, buf.len(), max_len, self.zero_length) {
            trace!("[i2c] read chunk {:#06x} +{}", chunk.register, chunk.len);
            let header = chunk.register.to_be_bytes();
            device
                .write_read_messages(self.slave_address, &header, &mut buf[chunk.range()])
                .map_err(|e| PlatformError::comms("read", e))?;
        }
        Ok(())
    }

    fn write(&mut self, register: u16, data: &[u8]) -> PlatformResult<()> {
        check_register_span(register, data.len())?;
        let max_len = self.max_write_chunk();
        let device = self.device.as_mut().ok_or(PlatformError::NotOpen)?;
        debug!("[i2c] write {} byte(s) at {:#06x}", data.len(), register);

        for chunk in ChunkPlan::new(register, data.len(), max_len, self.zero_length) {
            trace!("[i2c] write chunk {:#06x} +{}", chunk.register, chunk.len);
            let end = HEADER_LEN + chunk.len;
            self.buffer[..HEADER_LEN].copy_from_slice(&chunk.register.to_be_bytes());
            self.buffer[HEADER_LEN..end].copy_from_slice(&data[chunk.range()]);
            device
                .write_message(self.slave_address, &self.buffer[..end])
                .map_err(|e| PlatformError::comms("write", e))?;
        }
        Ok(())
    }
}

impl<D: I2cMessages> Transport for DirectI2cTransport<D> {
    fn open(&mut self) -> PlatformResult<()> {
        if self.device.is_some() {
            return Ok(());
        }
        match (self.opener)(&self.path, self.slave_address) {
            Ok(device) => {
                info!("[i2c] opened {} (slave {:#04x})", self.path, self.slave_address);
                self.device = Some(device);
                Ok(())
            }
            Err(e) => {
                error!(
                    "[i2c] could not speak to slave {:#04x} on {}: {}",
                    self.slave_address, self.path, e
                );
                Err(PlatformError::comms("open", e))
            }
        }
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("[i2c] closed {}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn wait_ready(
        &mut self,
        check: &mut dyn DataReadyCheck,
        delay: &mut dyn DelayNs,
    ) -> PlatformResult<()> {
        if self.device.is_none() {
            return Err(PlatformError::NotOpen);
        }
        let poll = self.poll;
        let polls = poll_until_ready(self, check, delay, poll)?;
        debug!("[i2c] data ready after {} poll(s)", polls);
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::I2c
    }
}
