use crate::bus::RegisterBus;
use crate::config::SensorEntry;
use crate::errors::{PlatformError, PlatformResult};
use embedded_hal::delay::DelayNs;
use tracing::{trace, warn};

/// Status check supplied by the sensor driver.
///
/// Gets the register bus as an explicit context so it can read the status
/// registers through the same transport that is waiting.
pub trait DataReadyCheck {
    fn data_ready(&mut self, bus: &mut dyn RegisterBus) -> PlatformResult<bool>;
}

impl<F> DataReadyCheck for F
where
    F: FnMut(&mut dyn RegisterBus) -> PlatformResult<bool>,
{
    fn data_ready(&mut self, bus: &mut dyn RegisterBus) -> PlatformResult<bool> {
        self(bus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval_ms: u32,
    /// None keeps polling until the device reports ready.
    pub timeout_ms: Option<u64>,
}

impl PollSettings {
    pub fn from_entry(entry: &SensorEntry) -> Self {
        Self {
            interval_ms: entry.poll_interval_ms.max(1),
            timeout_ms: entry.data_ready_timeout_ms,
        }
    }

    /// Number of polls that fit in the timeout, rounded up.
    pub fn max_polls(&self) -> Option<u32> {
        self.timeout_ms.map(|timeout| {
            let interval = self.interval_ms.max(1) as u64;
            timeout.div_ceil(interval).clamp(1, u32::MAX as u64) as u32
        })
    }
}

/// Sleeps one interval, then asks `check`, until it reports ready.
///
/// Returns the number of polls taken.
pub fn poll_until_ready(
    bus: &mut dyn RegisterBus,
    check: &mut dyn DataReadyCheck,
    delay: &mut dyn DelayNs,
    settings: PollSettings,
) -> PlatformResult<u32> {
    let limit = settings.max_polls();
    let mut polls = 0u32;
    loop {
        delay.delay_ms(settings.interval_ms);
        polls = polls.saturating_add(1);
        if check.data_ready(bus)? {
            return Ok(polls);
        }
        trace!("[ready] poll {} not ready", polls);
        if let Some(limit) = limit {
            if polls >= limit {
                let waited_ms = polls as u64 * settings.interval_ms as u64;
                warn!("[ready] gave up after {} poll(s) ({}ms)", polls, waited_ms);
                return Err(PlatformError::Timeout { polls, waited_ms });
            }
        }
    }
}
