//! Typed error taxonomy for the translation engine.
//!
//! None of these enums reach for `thiserror` — the teacher crate (and every
//! other example in the retrieval pack) hand-rolls `Display` for its error
//! types and relies on `anyhow` at I/O boundaries, so these do the same.
//! The `file_error!` family below is kept from the teacher for exactly that
//! boundary use inside the profile loader.

use std::fmt;

/// Creates an anyhow error with the current file and line number.
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!()).file_name().unwrap().to_string_lossy(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Creates an anyhow error with the current file and line number, and includes a source error.
#[macro_export]
macro_rules! file_error_with_source {
    ($source:expr, $($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}: {}",
            std::path::Path::new(file!()).file_name().unwrap().to_string_lossy(),
            line!(),
            format!($($arg)*),
            $source
        )
    };
}

/// Errors raised while decoding a single sensor item's raw registers.
///
/// These are absorbed (not propagated) during status-builder value
/// extraction: one malformed register drops that sensor from the result,
/// it never aborts the whole read.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    InsufficientRegisters { expected: usize, got: usize },
    RawValueOutOfRange { value: f64, min: Option<f64>, max: Option<f64> },
    ValueOutOfRange { value: f64, min: Option<f64>, max: Option<f64> },
    InvalidUtf8,
    ControlCharacter { scalar: u32 },
    UnsupportedRule { rule: u8 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::InsufficientRegisters { expected, got } => write!(
                f,
                "insufficient registers: expected at least {expected}, got {got}"
            ),
            SensorError::RawValueOutOfRange { value, min, max } => {
                write!(f, "raw value {value} out of range [{min:?}, {max:?}]")
            }
            SensorError::ValueOutOfRange { value, min, max } => {
                write!(f, "value {value} out of validation range [{min:?}, {max:?}]")
            }
            SensorError::InvalidUtf8 => write!(f, "decoded register string is not valid UTF-8"),
            SensorError::ControlCharacter { scalar } => {
                write!(f, "decoded string contains control character U+{scalar:04X}")
            }
            SensorError::UnsupportedRule { rule } => {
                write!(f, "rule {rule} does not produce a numeric value")
            }
        }
    }
}

impl std::error::Error for SensorError {}

/// Errors raised while loading or matching a device profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    LoadFailed { id: String, reason: String },
    ParseError { id: String, line: Option<usize>, reason: String },
    UnsupportedDevice { device: String, suggestion: Option<String> },
    UnknownDevice { device: String },
    IdentificationFailed { reason: String },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::LoadFailed { id, reason } => {
                write!(f, "failed to load profile {id}: {reason}")
            }
            ProfileError::ParseError { id, line: Some(line), reason } => {
                write!(f, "failed to parse profile {id} at line {line}: {reason}")
            }
            ProfileError::ParseError { id, line: None, reason } => {
                write!(f, "failed to parse profile {id}: {reason}")
            }
            ProfileError::UnsupportedDevice { device, suggestion: Some(s) } => {
                write!(f, "unsupported device {device} (did you mean {s}?)")
            }
            ProfileError::UnsupportedDevice { device, suggestion: None } => {
                write!(f, "unsupported device {device}")
            }
            ProfileError::UnknownDevice { device } => write!(f, "unknown device {device}"),
            ProfileError::IdentificationFailed { reason } => {
                write!(f, "device identification failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ProfileError {}

/// Errors surfaced at the orchestrator/transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    ConnectionFailed(String),
    Timeout,
    CommunicationError(String),
    InvalidResponse(String),
    Sensor(SensorError),
    Profile(ProfileError),
    NoSensorsForGroups(Vec<String>),
}

impl DriverError {
    /// `timeout` and `communication_error` are the only retryable kinds;
    /// everything else indicates a configuration or protocol mismatch that
    /// retrying will not fix.
    pub fn retryable(&self) -> bool {
        matches!(self, DriverError::Timeout | DriverError::CommunicationError(_))
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::ConnectionFailed(reason) => write!(f, "connection failed: {reason}"),
            DriverError::Timeout => write!(f, "timeout"),
            DriverError::CommunicationError(reason) => write!(f, "communication error: {reason}"),
            DriverError::InvalidResponse(reason) => write!(f, "invalid response: {reason}"),
            DriverError::Sensor(e) => write!(f, "sensor error: {e}"),
            DriverError::Profile(e) => write!(f, "profile error: {e}"),
            DriverError::NoSensorsForGroups(groups) => {
                write!(f, "no sensors found for groups: {}", groups.join(", "))
            }
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Sensor(e) => Some(e),
            DriverError::Profile(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SensorError> for DriverError {
    fn from(e: SensorError) -> Self {
        DriverError::Sensor(e)
    }
}

impl From<ProfileError> for DriverError {
    fn from(e: ProfileError) -> Self {
        DriverError::Profile(e)
    }
}
