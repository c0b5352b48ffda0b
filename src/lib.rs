// Public modules
pub mod buffer;
pub mod bus;
pub mod config;
pub mod delay;
pub mod device;
pub mod errors;
pub mod platform;
pub mod probe;
pub mod ready;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use buffer::swap_buffer_endianness;
pub use bus::{Backend, RegisterBus, Transport};
pub use config::{load_platform_config, PlatformConfig, SensorEntry};
pub use device::StreamCountReady;
pub use errors::{PlatformError, PlatformResult};
pub use platform::Platform;
pub use ready::DataReadyCheck;

use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}
