use thiserror::Error;

/// Rejected user input. Rendered to the user as-is and blocks the requested
/// operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be a positive number (got '{value}')")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0}")]
    InvalidInput(String),
}
