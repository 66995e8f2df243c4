use serde::{Deserialize, Serialize};

pub mod em;

/// Represents the status of the algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Algorithm is starting up
    Starting,
    /// Algorithm is currently running
    Running,
    /// Algorithm has converged to a solution
    Converged,
    /// Algorithm stopped due to reaching maximum cycles
    IterationLimitReached,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Starting => write!(f, "Starting"),
            Status::Running => write!(f, "Running"),
            Status::Converged => write!(f, "Converged"),
            Status::IterationLimitReached => write!(f, "Maximum cycles reached"),
        }
    }
}
