use thiserror::Error;

/// Per-file decode failure. None of these abort the process; a driver
/// loop is expected to log one of these and move to the next input.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("truncated input: expected {expected} more bytes at offset {offset}")]
    Truncated { offset: usize, expected: usize },

    #[error("malformed codec stream: {0}")]
    MalformedCodec(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
