pub mod platform_config;

pub use platform_config::{load_platform_config, parse_platform_config, PlatformConfig, SensorEntry};
