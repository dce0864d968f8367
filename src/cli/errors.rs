use thiserror::Error;

/// Domain-specific errors for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl CliError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
