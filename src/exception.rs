// exception.rs -- Generator error types

use std::error::Error;
use std::fmt;

/// Fatal pipeline failure: missing workspace, unresolvable template
/// directory and similar conditions the driver cannot recover from.
#[derive(Debug)]
pub struct GeneratorError {
    pub value: String,
}

impl GeneratorError {
    pub fn new(value: &str) -> Self {
        GeneratorError {
            value: value.to_string(),
        }
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "generator error: {}", self.value)
    }
}

impl Error for GeneratorError {}

/// Failure modes of the repository file fetcher.
#[derive(Debug)]
pub enum FetchError {
    /// No compression candidate resolved for the requested path
    NotFound(String),
    /// A remote transfer was attempted and failed
    Download(String),
    Io(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::NotFound(path) => write!(f, "no file found for {}", path),
            FetchError::Download(msg) => write!(f, "download failed: {}", msg),
            FetchError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}
