type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SimplismartError {
    /// Network or request execution error (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Retry budget spent; carries the failure of the final attempt.
    #[error("request failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: Box<SimplismartError>,
    },
    /// One page of a batch failed.
    #[error("page {index}: {source}")]
    Page {
        index: usize,
        #[source]
        source: Box<SimplismartError>,
    },
    /// Success status, but the body does not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// The response was well-formed but carried no result.
    #[error("no output received: {0}")]
    NoOutput(String),
    /// Request parameters rejected before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Missing or malformed service configuration.
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimplismartError {
    /// Wraps any error as a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(err.into())
    }

    /// Whether the error came from a single attempt at the transport or
    /// protocol level and may succeed when sent again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// HTTP status of the failure, looking through wrapping variants.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RetriesExhausted { source, .. } | Self::Page { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SimplismartError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
