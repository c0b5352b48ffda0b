use crate::bus::chunk::{check_register_span, ZeroLengthPolicy};
use crate::bus::{Backend, RegisterBus, Transport};
use crate::config::SensorEntry;
use crate::errors::{PlatformError, PlatformResult};
use crate::ready::DataReadyCheck;
use embedded_hal::delay::DelayNs;
use std::io;
use tracing::{debug, error, info};

#[cfg(target_os = "linux")]
use std::fs::{File, OpenOptions};
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Transfer descriptor handed to the stmvl53l7cx module.
///
/// Layout is shared with the kernel module: 16 bytes, `bufptr` 64-bit aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommsStruct {
    pub len: u16,
    pub reg_address: u16,
    pub write_not_read: u8,
    pub padding: [u8; 3],
    pub bufptr: u64,
}

impl CommsStruct {
    pub fn new(reg_address: u16, data: &mut Transfer<'_>) -> Self {
        let (bufptr, write_not_read) = match data {
            Transfer::Write(buf) => (buf.as_ptr() as usize as u64, 1),
            Transfer::Read(buf) => (buf.as_mut_ptr() as usize as u64, 0),
        };
        Self {
            // lengths are checked against u16::MAX before a descriptor is built
            len: data.len() as u16,
            reg_address,
            write_not_read,
            padding: [0; 3],
            bufptr,
        }
    }
}

#[cfg(target_os = "linux")]
mod ioctl {
    use super::CommsStruct;

    nix::ioctl_readwrite!(st_tof_transfer, b'a', 0x1, CommsStruct);
    nix::ioctl_none!(st_tof_wait_for_interrupt, b'a', 0x2);
}

/// Direction and buffer of one kernel-side transfer
#[derive(Debug)]
pub enum Transfer<'a> {
    Write(&'a [u8]),
    Read(&'a mut [u8]),
}

impl Transfer<'_> {
    pub fn len(&self) -> usize {
        match self {
            Transfer::Write(buf) => buf.len(),
            Transfer::Read(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Character device exposed by the stmvl53l7cx kernel module
pub trait KernelDevice: Send {
    fn transfer(&mut self, register: u16, data: Transfer<'_>) -> io::Result<()>;

    /// Blocks until the module sees the sensor's interrupt line fire.
    fn wait_for_interrupt(&mut self) -> io::Result<()>;
}

/// `/dev/stmvl53l7cx` opened read-only
#[cfg(target_os = "linux")]
pub struct StmvlDevice {
    file: File,
}

#[cfg(target_os = "linux")]
impl StmvlDevice {
    pub fn open(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self { file })
    }
}

#[cfg(target_os = "linux")]
impl KernelDevice for StmvlDevice {
    fn transfer(&mut self, register: u16, mut data: Transfer<'_>) -> io::Result<()> {
        let mut comms = CommsStruct::new(register, &mut data);
        // SAFETY: `comms.bufptr` points into `data`, which outlives the call,
        // and `comms.len` matches its length.
        unsafe { ioctl::st_tof_transfer(self.file.as_raw_fd(), &mut comms) }?;
        Ok(())
    }

    fn wait_for_interrupt(&mut self) -> io::Result<()> {
        // SAFETY: parameterless ioctl on a descriptor we own.
        unsafe { ioctl::st_tof_wait_for_interrupt(self.file.as_raw_fd()) }?;
        Ok(())
    }
}

pub type KernelOpener<D> = Box<dyn FnMut(&str) -> io::Result<D> + Send>;

/// Kernel-driver transport: the module chunks transfers itself
pub struct KernelDriverTransport<D> {
    path: String,
    opener: KernelOpener<D>,
    device: Option<D>,
    zero_length: ZeroLengthPolicy,
}

impl<D: KernelDevice> KernelDriverTransport<D> {
    pub fn new(entry: &SensorEntry, opener: KernelOpener<D>) -> Self {
        Self {
            path: entry.device_path().to_string(),
            opener,
            device: None,
            zero_length: entry.zero_length,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn submit(
        &mut self,
        register: u16,
        data: Transfer<'_>,
        op: &'static str,
    ) -> PlatformResult<()> {
        let len = data.len();
        check_register_span(register, len)?;
        if len > u16::MAX as usize {
            return Err(PlatformError::TransferRange { register, len });
        }
        let device = self.device.as_mut().ok_or(PlatformError::NotOpen)?;
        if data.is_empty() && self.zero_length == ZeroLengthPolicy::Skip {
            return Ok(());
        }
        debug!("[kernel] {} {} byte(s) at {:#06x}", op, len, register);
        device
            .transfer(register, data)
            .map_err(|e| PlatformError::comms(op, e))
    }
}

#[cfg(target_os = "linux")]
impl KernelDriverTransport<StmvlDevice> {
    pub fn linux(entry: &SensorEntry) -> Self {
        Self::new(entry, Box::new(StmvlDevice::open))
    }
}

impl<D: KernelDevice> RegisterBus for KernelDriverTransport<D> {
    fn read(&mut self, register: u16, buf: &mut [u8]) -> PlatformResult<()> {
        self.submit(register, Transfer::Read(buf), "read")
    }

    fn write(&mut self, register: u16, data: &[u8]) -> PlatformResult<()> {
        self.submit(register, Transfer::Write(data), "write")
    }
}

impl<D: KernelDevice> Transport for KernelDriverTransport<D> {
    fn open(&mut self) -> PlatformResult<()> {
        if self.device.is_some() {
            return Ok(());
        }
        match (self.opener)(&self.path) {
            Ok(device) => {
                info!("[kernel] opened {}", self.path);
                self.device = Some(device);
                Ok(())
            }
            Err(e) => {
                error!("[kernel] failed to open {}: {}", self.path, e);
                Err(PlatformError::comms("open", e))
            }
        }
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("[kernel] closed {}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn wait_ready(
        &mut self,
        _check: &mut dyn DataReadyCheck,
        _delay: &mut dyn DelayNs,
    ) -> PlatformResult<()> {
        let device = self.device.as_mut().ok_or(PlatformError::NotOpen)?;
        device
            .wait_for_interrupt()
            .map_err(|e| PlatformError::comms("wait for interrupt", e))
    }

    fn backend(&self) -> Backend {
        Backend::Kernel
    }
}
