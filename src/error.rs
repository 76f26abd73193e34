use thiserror::Error;

/// Result type for DIGI-5 operations
pub type Result<T> = std::result::Result<T, Digi5Error>;

/// Errors that can occur when talking to a DIGI-5 hub
///
/// Protocol-level conditions (unrecognised frames, out-of-range arguments,
/// unknown zone numbers) are logged and ignored rather than reported here.
#[derive(Error, Debug)]
pub enum Digi5Error {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error on the serial line
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Settings parsed but are not usable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Connection writer has shut down
    #[error("Connection closed")]
    ConnectionClosed,

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
