use std::fmt;

/// Boxed cause carried by every error variant.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across the dealmatch crates
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of an [`Error`], used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed trigger or source input, handled at the invocation boundary
    Validation,
    /// A referenced source object does not exist
    NotFound,
    /// A batch write exhausted its retries or the store rejected the request
    StoreUnavailable,
    /// Writing export files failed; triggers compensation
    Export,
    /// Anything else, propagated as-is
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Export => "export",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Not found: {message}")]
    NotFound {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Export failed: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    Unknown {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            source: None,
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
            source: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            Error::Validation { source, .. }
            | Error::NotFound { source, .. }
            | Error::StoreUnavailable { source, .. }
            | Error::Export { source, .. }
            | Error::Unknown { source, .. } => source,
        };
        *slot = Some(cause.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Error::Export { .. } => ErrorKind::Export,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Error::Validation { message, .. }
            | Error::NotFound { message, .. }
            | Error::StoreUnavailable { message, .. }
            | Error::Export { message, .. }
            | Error::Unknown { message, .. } => message,
        }
    }

    /// Errors reported back to the trigger instead of being propagated
    pub fn is_boundary(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { ref path, .. } => {
                Error::not_found(format!("Object does not exist {path}")).with_source(err)
            }
            other => Error::unknown(format!("Object store error: {other}")).with_source(other),
        }
    }
}
