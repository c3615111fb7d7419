use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("failed to parse input: {0}")]
    Parse(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid range: min {min} must be <= max {max} and both finite")]
    InvalidRange { min: f64, max: f64 },

    #[error("failed to publish artifact `{name}`: {reason}")]
    Publish { name: String, reason: String },

    #[error("run history error: {0}")]
    History(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CleaningError {
    pub fn publish(name: &str, reason: impl ToString) -> Self {
        CleaningError::Publish {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CleaningError>;
