//! Testing infrastructure (mock devices, delays).

use crate::bus::chunk::REGISTER_SPACE;
use crate::bus::i2c::I2cMessages;
use crate::bus::kernel::{KernelDevice, Transfer};
use embedded_hal::delay::DelayNs;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockTransaction {
    /// Single write message: register header then payload.
    Write { address: u16, bytes: Vec<u8> },
    /// Header write followed by a `len`-byte read.
    WriteRead { address: u16, header: Vec<u8>, len: usize },
}

#[derive(Debug)]
struct MockI2cState {
    regs: Vec<u8>,
    transactions: Vec<MockTransaction>,
    fail_on: Option<usize>,
}

/// Auto-incrementing 16-bit register file behind an I2C slave
#[derive(Debug, Clone)]
pub(crate) struct MockI2c {
    state: Arc<Mutex<MockI2cState>>,
}

impl MockI2c {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockI2cState {
                regs: vec![0u8; REGISTER_SPACE],
                transactions: Vec::new(),
                fail_on: None,
            })),
        }
    }

    pub(crate) fn with_regs(self, register: u16, values: &[u8]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let start = register as usize;
            state.regs[start..start + values.len()].copy_from_slice(values);
        }
        self
    }

    pub(crate) fn regs(&self, register: u16, len: usize) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        let start = register as usize;
        state.regs[start..start + len].to_vec()
    }

    pub(crate) fn transactions(&self) -> Vec<MockTransaction> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// Makes the transaction with this 0-based index fail. It is still recorded.
    pub(crate) fn fail_on_transaction(&self, index: usize) {
        self.state.lock().unwrap().fail_on = Some(index);
    }
}

impl MockI2cState {
    fn record(&mut self, tx: MockTransaction) -> io::Result<()> {
        let index = self.transactions.len();
        self.transactions.push(tx);
        if self.fail_on == Some(index) {
            return Err(io::Error::other("injected bus failure"));
        }
        Ok(())
    }
}

fn header_register(header: &[u8]) -> io::Result<usize> {
    match header {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo]) as usize),
        _ => Err(io::Error::from(io::ErrorKind::InvalidInput)),
    }
}

impl I2cMessages for MockI2c {
    fn write_message(&mut self, address: u16, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.record(MockTransaction::Write {
            address,
            bytes: data.to_vec(),
        })?;
        let start = header_register(data)?;
        let payload = &data[2..];
        state.regs[start..start + payload.len()].copy_from_slice(payload);
        Ok(())
    }

    fn write_read_messages(
        &mut self,
        address: u16,
        header: &[u8],
        data: &mut [u8],
    ) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.record(MockTransaction::WriteRead {
            address,
            header: header.to_vec(),
            len: data.len(),
        })?;
        let start = header_register(header)?;
        data.copy_from_slice(&state.regs[start..start + data.len()]);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockKernelCall {
    Transfer { register: u16, len: usize, write: bool },
    WaitForInterrupt,
}

#[derive(Debug)]
struct MockKernelState {
    regs: Vec<u8>,
    calls: Vec<MockKernelCall>,
    fail_transfers: bool,
    fail_interrupts: bool,
}

/// stmvl53l7cx module stand-in
#[derive(Debug, Clone)]
pub(crate) struct MockKernel {
    state: Arc<Mutex<MockKernelState>>,
}

impl MockKernel {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockKernelState {
                regs: vec![0u8; REGISTER_SPACE],
                calls: Vec::new(),
                fail_transfers: false,
                fail_interrupts: false,
            })),
        }
    }

    pub(crate) fn calls(&self) -> Vec<MockKernelCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn fail_transfers(&self) {
        self.state.lock().unwrap().fail_transfers = true;
    }

    pub(crate) fn fail_interrupts(&self) {
        self.state.lock().unwrap().fail_interrupts = true;
    }
}

impl KernelDevice for MockKernel {
    fn transfer(&mut self, register: u16, data: Transfer<'_>) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockKernelCall::Transfer {
            register,
            len: data.len(),
            write: matches!(data, Transfer::Write(_)),
        });
        if state.fail_transfers {
            return Err(io::Error::from_raw_os_error(5));
        }
        let start = register as usize;
        match data {
            Transfer::Write(buf) => state.regs[start..start + buf.len()].copy_from_slice(buf),
            Transfer::Read(buf) => {
                let len = buf.len();
                buf.copy_from_slice(&state.regs[start..start + len]);
            }
        }
        Ok(())
    }

    fn wait_for_interrupt(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockKernelCall::WaitForInterrupt);
        if state.fail_interrupts {
            return Err(io::Error::from_raw_os_error(4));
        }
        Ok(())
    }
}

/// Records requested sleeps instead of sleeping
#[derive(Debug, Default, Clone)]
pub(crate) struct MockDelay {
    sleeps_ns: Arc<Mutex<Vec<u64>>>,
}

impl MockDelay {
    pub(crate) fn log(&self) -> Arc<Mutex<Vec<u64>>> {
        self.sleeps_ns.clone()
    }

    pub(crate) fn sleeps_ns(&self) -> Vec<u64> {
        self.sleeps_ns.lock().unwrap().clone()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleeps_ns.lock().unwrap().push(ns as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleeps_ns.lock().unwrap().push(ms as u64 * 1_000_000);
    }
}
