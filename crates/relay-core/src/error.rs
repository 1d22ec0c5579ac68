use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid link '{0}': expected a message link ending in a numeric id")]
    InvalidLink(String),

    #[error("invalid count '{0}': expected a whole number of at least 1")]
    InvalidCount(String),

    #[error("invalid tier '{0}': expected 'free' or 'premium'")]
    InvalidTier(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
