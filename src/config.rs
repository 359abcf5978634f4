//! Listener configuration.
//!
//! The data half of a listener's construction options: which device to bind to
//! and the initial per-offset state (whose length fixes the report width).
//! Handlers and the shift-state provider are code and are passed to
//! [`ByteDiffDispatcher`](crate::dispatcher::ByteDiffDispatcher) directly.
//!
//! Files are TOML by default; a `.json` extension selects JSON.
//!
//! ```
//! use bytewatch::ListenerConfig;
//!
//! let cfg = ListenerConfig::from_toml_str(r#"
//!     usage_page = 0x01
//!     usage = 0x04
//!     vendor_id = 0x231d
//!     product_id = 0x0200
//!     version = 0x0100
//!     initial_state = [0, 0, 0, 0]
//! "#).unwrap();
//! assert_eq!(cfg.identity.vendor_id, 0x231d);
//! assert_eq!(cfg.initial_state.len(), 4);
//! ```

use crate::error::ConfigError;
use crate::identity::DeviceIdentity;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(flatten)]
    pub identity: DeviceIdentity,
    /// Initial value per offset; its length is the report width.
    pub initial_state: Vec<u8>,
}

impl ListenerConfig {
    pub fn new(identity: DeviceIdentity, initial_state: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let cfg = Self {
            identity,
            initial_state: initial_state.into(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_state.is_empty() {
            return Err(ConfigError::EmptyInitialState);
        }
        Ok(())
    }

    /// Report width in bytes.
    pub fn width(&self) -> usize {
        self.initial_state.len()
    }
}
