//! Error types shared by every analysis module

use thiserror::Error;

/// Errors raised by labeled-array, grouping and window operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Key vector, axis or operator output disagree in length or shape
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),

    /// Every key along the grouped axis was a sentinel
    #[error("No non-missing groups to reduce along axis {0}")]
    EmptyGroupResult(String),

    /// A transform combine left a reachable position unwritten (or wrote it twice)
    #[error("Incomplete coverage in transform combine: {0}")]
    IncompleteCoverage(String),

    /// Per-group values are not indexed by the view's group keys
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    #[error("Axis {0} does not carry timestamps")]
    NotTemporal(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Variable not found: {0}")]
    UnknownVariable(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::UnknownAxis("depth".to_string());
        assert_eq!(err.to_string(), "Unknown axis: depth");

        let err = AnalysisError::EmptyGroupResult("time".to_string());
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn test_io_conversion() {
        fn open_missing() -> Result<std::fs::File> {
            Ok(std::fs::File::open("definitely_not_here_98765.csv")?)
        }
        assert!(matches!(open_missing(), Err(AnalysisError::Io(_))));
    }
}
