use quickql_core::CompositionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fatal startup failures; the process exits non-zero on any of them.
#[derive(Debug)]
pub enum BootstrapError {
    Composition(CompositionError),
    Schema(String),
    Bind {
        address: String,
        source: std::io::Error,
    },
    Io(std::io::Error),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composition(err) => write!(f, "schema composition failed: {err}"),
            Self::Schema(message) => write!(f, "cannot build executable schema: {message}"),
            Self::Bind { address, source } => write!(f, "cannot listen on {address}: {source}"),
            Self::Io(err) => write!(f, "server i/o failure: {err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Composition(err) => Some(err),
            Self::Schema(_) => None,
            Self::Bind { source, .. } => Some(source),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<CompositionError> for BootstrapError {
    fn from(value: CompositionError) -> Self {
        Self::Composition(value)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
