//! Error types for contour calculation.

use thiserror::Error;

/// Errors that can abort a contour calculation.
///
/// Smoothing problems are never reported here: a cell that cannot be
/// smoothed falls back to its straight segment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContourError {
    /// Bad dimensions, bounds or buffer sizes. Raised before any scratch
    /// space is allocated.
    #[error("invalid grid: {0}")]
    Validation(String),

    /// Scratch or output buffer growth failed.
    #[error("allocation failed: {0}")]
    Resource(String),

    /// The interval and range would produce more levels than allowed.
    #[error("too many contour levels: {requested} requested, at most {max} allowed")]
    TooManyLevels { requested: usize, max: usize },

    /// The data cannot be contoured as given (non-positive value under a
    /// log conversion, range too small for single precision, ...).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
}

/// Coarse outcome categories reported alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    AllocationFailure,
    InvalidGrid,
    TooManyLevels,
    DegenerateData,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::AllocationFailure => "allocation_failure",
            Self::InvalidGrid => "invalid_grid",
            Self::TooManyLevels => "too_many_levels",
            Self::DegenerateData => "degenerate_data",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ContourError {
    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a Resource error.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a DegenerateInput error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }

    /// Status category for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::InvalidGrid,
            Self::Resource(_) => Status::AllocationFailure,
            Self::TooManyLevels { .. } => Status::TooManyLevels,
            Self::DegenerateInput(_) => Status::DegenerateData,
        }
    }
}

impl From<std::collections::TryReserveError> for ContourError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Resource(err.to_string())
    }
}

/// Result type for contour operations.
pub type Result<T> = std::result::Result<T, ContourError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ContourError::validation("x").status(), Status::InvalidGrid);
        assert_eq!(ContourError::resource("x").status(), Status::AllocationFailure);
        assert_eq!(
            ContourError::TooManyLevels { requested: 5000, max: 4000 }.status(),
            Status::TooManyLevels
        );
        assert_eq!(ContourError::degenerate("x").status(), Status::DegenerateData);
    }

    #[test]
    fn test_error_messages() {
        let err = ContourError::TooManyLevels { requested: 4100, max: 4000 };
        assert_eq!(
            err.to_string(),
            "too many contour levels: 4100 requested, at most 4000 allowed"
        );
        assert_eq!(
            ContourError::validation("ncol must be >= 2").to_string(),
            "invalid grid: ncol must be >= 2"
        );
    }

    #[test]
    fn test_try_reserve_converts_to_resource() {
        let mut v: Vec<u64> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        let converted: ContourError = err.into();
        assert_eq!(converted.status(), Status::AllocationFailure);
    }
}
