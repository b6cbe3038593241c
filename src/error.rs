use thiserror::Error;

use crate::domain::Relationship;

/// Library error for DSD construction, parameterization and fitting.
///
/// Per-timestep degeneracies (an empty distribution, a zero third moment) are
/// not errors: they show up as `NaN` in the affected slot so that one bad
/// sample never discards a whole series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DsdError {
    #[error("shape mismatch: {what} has length {found}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing field: {0} has not been supplied or computed")]
    MissingField(&'static str),

    #[error(
        "insufficient data for {}: {rows} valid rows for {params} parameters",
        relationship.display_name()
    )]
    InsufficientData {
        relationship: Relationship,
        rows: usize,
        params: usize,
    },

    #[error(
        "{} fit did not converge after {iterations} iterations",
        relationship.display_name()
    )]
    NonConvergence {
        relationship: Relationship,
        iterations: usize,
    },

    #[error("scattering failed: {0}")]
    Scattering(String),
}

impl DsdError {
    /// Exit code used by the `dsd` binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DsdError::ShapeMismatch { .. } | DsdError::InvalidInput(_) => 2,
            DsdError::MissingField(_) | DsdError::InsufficientData { .. } => 3,
            DsdError::NonConvergence { .. } | DsdError::Scattering(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<DsdError> for AppError {
    fn from(err: DsdError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsd_errors_map_to_exit_codes() {
        let err = DsdError::InsufficientData {
            relationship: Relationship::RKdp,
            rows: 1,
            params: 2,
        };
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("R(Kdp)"));

        let err = DsdError::ShapeMismatch {
            what: "spread",
            expected: 4,
            found: 3,
        };
        assert_eq!(AppError::from(err).exit_code(), 2);
    }
}
