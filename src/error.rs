//! Error types for configuration, shell parsing and fragment fetching.

use std::fmt;

/// Failure to obtain a fragment body.
///
/// Every variant is rendered the same way (the fixed error block); the
/// distinction only exists for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status(u16),
    /// The request never produced a response (network, I/O, decode).
    Transport(String),
}

impl FetchError {
    /// Build a transport failure from any displayable cause.
    pub fn transport(cause: impl fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "fragment unavailable (status {})", status),
            Self::Transport(cause) => write!(f, "fragment unavailable ({})", cause),
        }
    }
}

impl std::error::Error for FetchError {}

/// Subsystem a [`ViewerError`] originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Loading or validating [`crate::ViewerConfig`].
    Config,
    /// Parsing the page shell's tab bar.
    Navigation,
    /// Reading fragments from a local source.
    Source,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Navigation => "navigation",
            Self::Source => "source",
        };
        f.write_str(name)
    }
}

/// Structured error for setup-time operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerError {
    /// Subsystem where this error originated.
    pub phase: ErrorPhase,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional file or fragment path context.
    pub path: Option<Box<str>>,
}

impl ViewerError {
    pub(crate) fn new(phase: ErrorPhase, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            phase,
            code,
            message: message.into().into_boxed_str(),
            path: None,
        }
    }

    pub(crate) fn config(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorPhase::Config, code, message)
    }

    pub(crate) fn navigation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorPhase::Navigation, code, message)
    }

    pub(crate) fn io(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorPhase::Source, code, message)
    }

    pub(crate) fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into().into_boxed_str());
        self
    }
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.phase, self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " [path={}]", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ViewerError {}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        Self::config("CONFIG_PARSE", err.to_string())
    }
}
