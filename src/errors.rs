use std::io;
use thiserror::Error;

/// Status code reported to the sensor driver when a GPIO could not be driven.
pub const GPIO_SET_FAIL: i32 = -1;
/// Status code reported to the sensor driver for any bus or device failure.
pub const COMMS_ERROR: i32 = -2;
/// Status code reported to the sensor driver when a wait gave up.
pub const TIME_OUT: i32 = -3;

/// Errors raised by the platform layer
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Reserved: this platform layer drives no GPIOs itself.
    #[error("GPIO set failed")]
    GpioSetFailure,

    #[error("bus {op} failed: {source}")]
    Comms {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("data ready not signalled after {polls} poll(s) ({waited_ms}ms)")]
    Timeout { polls: u32, waited_ms: u64 },

    #[error("transfer of {len} byte(s) at register {register:#06x} leaves the 16-bit register space")]
    TransferRange { register: u16, len: usize },

    #[error("sensor reported error status {status:#04x}")]
    DeviceStatus { status: u8 },

    #[error("transport is not open")]
    NotOpen,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PlatformError {
    pub fn comms(op: &'static str, source: impl Into<io::Error>) -> Self {
        PlatformError::Comms {
            op,
            source: source.into(),
        }
    }

    /// The small negative integer the sensor driver branches on.
    pub fn code(&self) -> i32 {
        match self {
            PlatformError::GpioSetFailure => GPIO_SET_FAIL,
            PlatformError::Timeout { .. } => TIME_OUT,
            PlatformError::Comms { .. }
            | PlatformError::TransferRange { .. }
            | PlatformError::DeviceStatus { .. }
            | PlatformError::NotOpen
            | PlatformError::Config(_) => COMMS_ERROR,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate sensor id '{id}'")]
    DuplicateSensor { id: String },
}

/// Flattens a platform result into the status code convention of the sensor
/// driver: 0 on success, otherwise the error's code.
pub fn status_code<T>(result: &PlatformResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

/// Result type aliases for convenience
pub type PlatformResult<T> = Result<T, PlatformError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
