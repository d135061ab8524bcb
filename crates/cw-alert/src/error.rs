use std::fmt;

/// Why an alert was not accepted by the alerting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// Non-2xx response.
    Http { status: u16, body: String },
    /// 2xx response whose payload did not report success.
    Rejected(String),
    /// Response body could not be decoded.
    Decode(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Transport(msg) => write!(f, "transport error: {msg}"),
            DispatchError::Http { status, body } => write!(f, "http status={status}: {body}"),
            DispatchError::Rejected(msg) => write!(f, "rejected: {msg}"),
            DispatchError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}
