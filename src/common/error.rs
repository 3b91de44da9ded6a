//! Error types for tpspace_rrt

use std::fmt;

/// Main error type for planner operations
#[derive(Debug)]
pub enum PlannerError {
    /// Planner inputs failed sanity checks (degenerate bbox, start/goal
    /// outside the workspace, empty PTG set, ...)
    PrecondViolation(String),
    /// The free-pose sampler exhausted its attempt budget
    SamplingExhausted { attempts: usize },
    /// Invalid configuration parameter
    InvalidParameter(String),
    /// Numerical computation failed (singular Jacobian, non-convergence, ...)
    NumericalError(String),
    /// Debug visualization failed
    VisualizationError(String),
    /// I/O error
    IoError(std::io::Error),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::PrecondViolation(msg) => {
                write!(f, "Precondition violation: {}", msg)
            }
            PlannerError::SamplingExhausted { attempts } => {
                write!(f, "Could not draw a collision-free pose in {} attempts", attempts)
            }
            PlannerError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlannerError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            PlannerError::VisualizationError(msg) => write!(f, "Visualization error: {}", msg),
            PlannerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlannerError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(e: std::io::Error) -> Self {
        PlannerError::IoError(e)
    }
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
