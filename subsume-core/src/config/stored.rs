//! Stored configuration blob
//!
//! A [`RobotConfig`] wrapped in a small header and encoded with postcard,
//! so a board can ship its tuning as bytes in flash.

use serde::{Deserialize, Serialize};

use super::types::{ConfigError, RobotConfig};

/// Magic number to identify a config blob
pub const CONFIG_MAGIC: u32 = 0x5342_4F54; // "SBOT"

/// Current config blob version
pub const CONFIG_VERSION: u8 = 1;

/// Header plus configuration, as encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Payload
    pub config: RobotConfig,
}

impl StoredConfig {
    /// Wrap a config with the current header
    pub const fn new(config: RobotConfig) -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            config,
        }
    }

    /// Check the header
    pub fn is_valid(&self) -> bool {
        self.magic == CONFIG_MAGIC && self.version == CONFIG_VERSION
    }
}

impl RobotConfig {
    /// Decode and validate a config blob
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let stored: StoredConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if stored.magic != CONFIG_MAGIC {
            return Err(ConfigError::BadMagic);
        }
        if stored.version != CONFIG_VERSION {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Config version mismatch: found {}, expected {}",
                stored.version,
                CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch);
        }

        stored.config.validate()?;
        Ok(stored.config)
    }

    /// Encode this config into `buf`, returning the used prefix
    pub fn to_postcard<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(&StoredConfig::new(*self), buf).map_err(|_| ConfigError::Serialize)
    }
}
