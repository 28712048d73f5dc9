use thiserror::Error;

/// Flag surfaced to observers for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Decode,
    Auth,
    Status,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid api url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::InvalidUrl(_) => ErrorKind::Network,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Status { .. } => ErrorKind::Status,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
