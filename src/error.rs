//! Error types.
//!
//! Only [`RegistrationError`] and [`ConfigError`] ever reach the caller as hard
//! failures. Everything raised while a session is running (extraction failures,
//! rejected reports, handler failures) is logged and reported back as data so a
//! single bad notification cannot take the listener down.

use thiserror::Error;

/// Boxed error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by the platform raw-input subsystem.
///
/// `code` is the platform's own error indicator (`GetLastError` on Windows,
/// a synthetic value for backends without numeric codes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} failed (code {code})")]
pub struct SubsystemError {
    pub call: &'static str,
    pub code: u32,
}

impl SubsystemError {
    pub fn new(call: &'static str, code: u32) -> Self {
        Self { call, code }
    }
}

/// The subsystem refused to register or unregister the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("raw input registration rejected: {0}")]
    Register(#[source] SubsystemError),
    #[error("raw input deregistration rejected: {0}")]
    Unregister(#[source] SubsystemError),
}

/// A notification could not be unpacked. The notification is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("device handle query: {0}")]
    DeviceHandle(#[source] SubsystemError),
    #[error("device info query: {0}")]
    DeviceInfo(#[source] SubsystemError),
    #[error("report payload query: {0}")]
    Payload(#[source] SubsystemError),
    #[error("declared {declared} report bytes but payload holds {available}")]
    Truncated { declared: usize, available: usize },
}

/// The dispatcher refused a whole report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The report is wider than the state established by `initial_state`.
    #[error("report offset {offset} is outside the configured report width {width}")]
    OutOfBoundsOffset { offset: usize, width: usize },
}

/// A handler failed while processing one offset.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler returned an error: {0}")]
    Failed(#[source] BoxError),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wrap any error type as a handler failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        HandlerError::Failed(err.into())
    }
}

/// Invalid listener configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial_state must contain at least one byte")]
    EmptyInitialState,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
