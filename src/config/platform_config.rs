use crate::bus::chunk::ZeroLengthPolicy;
use crate::bus::Backend;
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

/// Default 8-bit bus address of the VL53L7CX (7-bit 0x29).
pub const DEFAULT_ADDRESS: u16 = 0x52;
/// Default size of the direct-I2C scratch buffer, header included.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Largest message i2c-dev accepts in one I2C_RDWR transaction.
pub const MAX_CHUNK_SIZE: usize = 8192;
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 5;

/// Root configuration struct expecting `[[sensor]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct PlatformConfig {
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorEntry>,
}

/// One sensor entry, matching each `[[sensor]]` section
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub backend: Backend,
    /// Device node; falls back to the backend's default node when absent.
    pub path: Option<String>,
    /// 8-bit bus address, as the ST driver stores it.
    #[serde(default = "default_address")]
    pub address: u16,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,
    /// Upper bound on the data-ready polling loop; unbounded when absent.
    pub data_ready_timeout_ms: Option<u64>,
    #[serde(default)]
    pub zero_length: ZeroLengthPolicy,
}

fn default_address() -> u16 {
    DEFAULT_ADDRESS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_poll_interval_ms() -> u32 {
    DEFAULT_POLL_INTERVAL_MS
}

impl SensorEntry {
    pub fn new(id: impl Into<String>, backend: Backend) -> Self {
        Self {
            id: id.into(),
            backend,
            path: None,
            address: DEFAULT_ADDRESS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            data_ready_timeout_ms: None,
            zero_length: ZeroLengthPolicy::default(),
        }
    }

    pub fn device_path(&self) -> &str {
        self.path
            .as_deref()
            .unwrap_or_else(|| self.backend.default_path())
    }

    /// 7-bit address placed on the wire.
    pub fn slave_address(&self) -> u16 {
        self.address >> 1
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: format!("{}.{}", self.id, field),
            reason,
        };

        if self.id.is_empty() {
            return Err(invalid("id", "must not be empty".to_string()));
        }
        if self.address & 1 != 0 || self.address > 0xFE {
            return Err(invalid(
                "address",
                format!("{:#04x} is not an even 8-bit bus address", self.address),
            ));
        }
        if self.chunk_size < 3 {
            return Err(invalid(
                "chunk_size",
                format!("{} leaves no room for the 2-byte register header", self.chunk_size),
            ));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(invalid(
                "chunk_size",
                format!(
                    "{} exceeds the {}-byte i2c-dev message limit",
                    self.chunk_size, MAX_CHUNK_SIZE
                ),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be at least 1".to_string()));
        }
        if self.data_ready_timeout_ms == Some(0) {
            return Err(invalid("data_ready_timeout_ms", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl PlatformConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for s in &self.sensors {
            s.validate()?;
            if !seen.insert(s.id.as_str()) {
                return Err(ConfigError::DuplicateSensor { id: s.id.clone() });
            }
        }
        Ok(())
    }
}

/// Parses and validates a TOML document
pub fn parse_platform_config(content: &str) -> ConfigResult<PlatformConfig> {
    let parsed: PlatformConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_platform_config(path: &str) -> ConfigResult<PlatformConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
        path: path.to_string(),
        source: e,
    })?;
    parse_platform_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let cfg = parse_platform_config(
            r#"
            [[sensor]]
            id = "tof0"
            backend = "i2c"
            "#,
        )
        .unwrap();

        let s = &cfg.sensors[0];
        assert_eq!(s.backend, Backend::I2c);
        assert_eq!(s.device_path(), "/dev/i2c-1");
        assert_eq!(s.address, 0x52);
        assert_eq!(s.slave_address(), 0x29);
        assert_eq!(s.chunk_size, 1024);
        assert_eq!(s.poll_interval_ms, 5);
        assert_eq!(s.data_ready_timeout_ms, None);
        assert_eq!(s.zero_length, ZeroLengthPolicy::Probe);
    }

    #[test]
    fn test_kernel_backend_with_overrides() {
        let cfg = parse_platform_config(
            r#"
            [[sensor]]
            id = "tof0"
            backend = "kernel"

            [[sensor]]
            id = "tof1"
            backend = "i2c"
            path = "/dev/i2c-3"
            address = 0x54
            chunk_size = 256
            data_ready_timeout_ms = 500
            zero_length = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.sensors[0].device_path(), "/dev/stmvl53l7cx");
        let s = &cfg.sensors[1];
        assert_eq!(s.device_path(), "/dev/i2c-3");
        assert_eq!(s.slave_address(), 0x2A);
        assert_eq!(s.chunk_size, 256);
        assert_eq!(s.data_ready_timeout_ms, Some(500));
        assert_eq!(s.zero_length, ZeroLengthPolicy::Skip);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = parse_platform_config(
            r#"
            [[sensor]]
            id = "tof0"
            backend = "spi"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FormatError(_)));
    }

    #[test]
    fn test_validation_errors() {
        let mut s = SensorEntry::new("tof0", Backend::I2c);
        s.chunk_size = 2;
        assert!(matches!(s.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut s = SensorEntry::new("tof0", Backend::I2c);
        s.address = 0x53;
        assert!(matches!(s.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut s = SensorEntry::new("tof0", Backend::I2c);
        s.poll_interval_ms = 0;
        assert!(matches!(s.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_chunk_size_upper_bound() {
        let mut s = SensorEntry::new("tof0", Backend::I2c);
        s.chunk_size = MAX_CHUNK_SIZE;
        assert!(s.validate().is_ok());

        s.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "tof0.chunk_size"
        ));

        let err = parse_platform_config(
            r#"
            [[sensor]]
            id = "tof0"
            backend = "i2c"
            chunk_size = 70000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = parse_platform_config(
            r#"
            [[sensor]]
            id = "tof0"
            backend = "i2c"

            [[sensor]]
            id = "tof0"
            backend = "kernel"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSensor { id } if id == "tof0"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_platform_config("/nonexistent/platform.toml").unwrap_err();
        assert!(matches!(err, ConfigError::LoadError { .. }));
    }
}
