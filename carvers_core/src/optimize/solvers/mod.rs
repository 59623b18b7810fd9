//! Solver interfaces
//!
//! A [`Solver`] reads a finished [`Problem`] and returns a [`ProblemSolution`]. Each call to
//! [`Solver::solve`] builds its own backend instance, so one solver value can be shared freely
//! between threads without any cross-talk between solves.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::problem::Problem;
use crate::optimize::ProblemSolution;

pub mod clarabel;
pub mod microlp;

/// Interface to an optimization backend
pub trait Solver {
    /// Name of the backend, used in logs
    fn name(&self) -> &'static str;

    /// Whether the solver handles Integer and Binary variables
    fn integer_variable_capable(&self) -> bool;

    /// Solve `problem`
    ///
    /// Infeasible and unbounded problems are not errors, they are reported through the
    /// status of the returned solution. Errors mean the problem could not be handed to the
    /// backend, or the backend failed.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Available solver backends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Clarabel interior point solver, continuous problems only
    Clarabel,
    /// microlp simplex with branch and bound, handles integer variables
    Microlp,
}

impl SolverBackend {
    /// Create a solver for this backend
    pub fn build(&self) -> Box<dyn Solver + Send + Sync> {
        match self {
            SolverBackend::Clarabel => Box::new(clarabel::ClarabelSolver::default()),
            SolverBackend::Microlp => Box::new(microlp::MicrolpSolver::default()),
        }
    }
}

/// Errors raised while solving a problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The problem has integer variables the solver can't handle
    #[error("Solver {0} can't handle integer or binary variables")]
    IntegerVariablesUnsupported(&'static str),
    /// The problem can't be expressed for the backend
    #[error("Invalid problem for solver: {0}")]
    InvalidProblem(String),
    /// The backend failed while solving
    #[error("Solver backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_from_json() {
        let backend: SolverBackend = serde_json::from_str("\"microlp\"").unwrap();
        assert_eq!(backend, SolverBackend::Microlp);
        assert!(backend.build().integer_variable_capable());
        assert!(!SolverBackend::Clarabel.build().integer_variable_capable());
        assert_eq!(SolverBackend::Clarabel.build().name(), "clarabel");
    }
}
