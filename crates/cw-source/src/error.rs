use std::fmt;

/// Errors raised while fetching or decoding device status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, DNS, TLS or timeout.
    Transport(String),
    /// The device answered with a non-2xx status.
    Http { status: u16, url: String },
    /// The payload did not have the expected shape.
    Malformed(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Http { status, url } => write!(f, "http status={status} url={url}"),
            FetchError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}
