//! Error type for browser automation.

use fantoccini::error::{CmdError, NewSessionError};

/// Error type for browser automation.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Could not start WebDriver session: {0}")]
    Session(#[from] NewSessionError),
    #[error("WebDriver command failed: {0}")]
    Command(#[from] CmdError),
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Unsupported selector kind: {0}")]
    UnsupportedSelector(String),
    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),
    #[error("WebDriver executable not found: {0}")]
    DriverNotFound(String),
    #[error("WebDriver did not accept connections on port {0}")]
    DriverNotReady(u16),
    #[error("No browser tab at index {0}")]
    NoSuchTab(usize),
    #[error("Browser session already closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for browser automation.
pub type BrowserResult<T> = Result<T, BrowserError>;
