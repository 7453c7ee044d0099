use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Invalid juristic ID {0:?}: must be exactly 13 digits")]
    InvalidId(String),
    #[error("Browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("Could not find {0} on page")]
    NotFound(String),
    #[error("Request blocked by the site firewall ({0})")]
    Blocked(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl ScrapeError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScrapeError::InvalidId(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
