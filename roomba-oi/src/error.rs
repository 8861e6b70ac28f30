//! Error types for the Open Interface engine
//!
//! Every failure is an [`Error`]. The closed set of [`ResultCode`]s reported
//! to callers (and kept as `last_error` in the session) is derived from it
//! with [`Error::code`].

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Open Interface error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller not initialized, or stream not in a state that allows the call
    #[error("Not initialized")]
    NotInitialized,

    /// No complete response before the deadline
    #[error("Communication timeout")]
    Timeout,

    /// Stream frame failed its modulo-256 sum check
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    Checksum {
        /// Checksum byte that would have zeroed the frame sum
        expected: u8,
        /// Checksum byte actually received
        actual: u8,
    },

    /// Argument outside the protocol-legal range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Frame or request larger than the protocol allows
    #[error("Buffer overflow: {0}")]
    BufferOverflow(String),

    /// Packet identifier absent from the sensor table
    #[error("Unknown sensor packet id {0}")]
    UnknownPacket(u8),

    /// Malformed traffic or a failed/short write
    #[error("Communication error: {0}")]
    Communication(String),

    /// Configuration file could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Classify this error into the closed result-code set
    pub fn code(&self) -> ResultCode {
        match self {
            Error::Timeout => ResultCode::Timeout,
            Error::Checksum { .. } => ResultCode::ChecksumError,
            Error::InvalidParameter(_) => ResultCode::InvalidParameter,
            Error::BufferOverflow(_) => ResultCode::BufferOverflow,
            Error::NotInitialized => ResultCode::NotInitialized,
            Error::UnknownPacket(_) | Error::Communication(_) | Error::Io(_) => {
                ResultCode::CommunicationError
            }
            #[cfg(feature = "serial")]
            Error::Serial(_) => ResultCode::CommunicationError,
            Error::Config(_) | Error::Other(_) => ResultCode::UnknownError,
        }
    }

    /// True for failures that are absorbed by the polling loop
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout | Error::Checksum { .. })
    }
}

/// Outcome of a public operation, with the wire-compatible numeric values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ResultCode {
    #[default]
    Success = 0,
    Timeout = 1,
    ChecksumError = 2,
    InvalidParameter = 3,
    BufferOverflow = 4,
    CommunicationError = 5,
    NotInitialized = 6,
    UnknownError = 255,
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::Timeout => "TIMEOUT",
            ResultCode::ChecksumError => "CHECKSUM_ERROR",
            ResultCode::InvalidParameter => "INVALID_PARAMETER",
            ResultCode::BufferOverflow => "BUFFER_OVERFLOW",
            ResultCode::CommunicationError => "COMMUNICATION_ERROR",
            ResultCode::NotInitialized => "NOT_INITIALIZED",
            ResultCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<&Result<T>> for ResultCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Success,
            Err(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values() {
        assert_eq!(ResultCode::Success as u8, 0);
        assert_eq!(ResultCode::Timeout as u8, 1);
        assert_eq!(ResultCode::ChecksumError as u8, 2);
        assert_eq!(ResultCode::InvalidParameter as u8, 3);
        assert_eq!(ResultCode::BufferOverflow as u8, 4);
        assert_eq!(ResultCode::CommunicationError as u8, 5);
        assert_eq!(ResultCode::NotInitialized as u8, 6);
        assert_eq!(ResultCode::UnknownError as u8, 255);
    }

    #[test]
    fn test_classification() {
        assert_eq!(Error::UnknownPacket(99).code(), ResultCode::CommunicationError);
        assert_eq!(
            Error::Io(std::io::Error::other("broken pipe")).code(),
            ResultCode::CommunicationError
        );
        assert_eq!(
            Error::Checksum {
                expected: 1,
                actual: 2
            }
            .code(),
            ResultCode::ChecksumError
        );
        assert_eq!(Error::Other("x".into()).code(), ResultCode::UnknownError);
    }

    #[test]
    fn test_from_result() {
        let ok: Result<()> = Ok(());
        let err: Result<()> = Err(Error::Timeout);
        assert_eq!(ResultCode::from(&ok), ResultCode::Success);
        assert_eq!(ResultCode::from(&err), ResultCode::Timeout);
        assert!(Error::Timeout.is_transient());
        assert!(!Error::NotInitialized.is_transient());
    }
}
