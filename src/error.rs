use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpoofError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Client profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Malformed client profile: {0}")]
    Profile(String),

    #[error("Invalid torrent: {0}")]
    Torrent(String),

    #[error("Tracker protocol error: {0}")]
    TrackerProtocol(String),

    #[error("Tracker unreachable after {attempts} attempts: {last_error}")]
    TrackerUnreachable { attempts: u32, last_error: String },

    #[error("Announce scheduler stopped unexpectedly: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpoofError>;
