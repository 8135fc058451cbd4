use std::error::Error;
use std::fmt;

/// Failures of the pluggable platform collaborators
#[derive(Debug)]
pub enum PlatformError {
    /// The timer service can no longer accept requests
    TimerClosed,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::TimerClosed => write!(f, "timer service stopped"),
        }
    }
}

impl Error for PlatformError {}

/// Errors surfaced by the outer layers (configuration, trace replay, host runtime).
/// The tap/tempo/beat core itself never fails.
#[derive(Debug)]
pub enum MetronomeError {
    /// Invalid or unreadable settings
    Config(String),
    /// Malformed replay trace line
    Trace { line: usize, reason: String },
    Io(std::io::Error),
    Platform(PlatformError),
}

impl fmt::Display for MetronomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetronomeError::Config(msg) => write!(f, "configuration error: {}", msg),
            MetronomeError::Trace { line, reason } => {
                write!(f, "trace error on line {}: {}", line, reason)
            }
            MetronomeError::Io(e) => write!(f, "I/O error: {}", e),
            MetronomeError::Platform(e) => write!(f, "platform error: {}", e),
        }
    }
}

impl Error for MetronomeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MetronomeError::Io(e) => Some(e),
            MetronomeError::Platform(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MetronomeError {
    fn from(e: std::io::Error) -> Self {
        MetronomeError::Io(e)
    }
}

impl From<config::ConfigError> for MetronomeError {
    fn from(e: config::ConfigError) -> Self {
        MetronomeError::Config(e.to_string())
    }
}

impl From<PlatformError> for MetronomeError {
    fn from(e: PlatformError) -> Self {
        MetronomeError::Platform(e)
    }
}
