use thiserror::Error;

#[derive(Debug, Error)]
pub enum HcclError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing column: '{column}' not found in uploaded table")]
    MissingColumn { column: String },

    #[error("Invalid rule configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for HcclError {
    fn from(e: serde_json::Error) -> Self {
        HcclError::SerializationError(e.to_string())
    }
}
