//! Implements a solver interface for microlp, which handles Integer and Binary variables
//! through branch and bound
use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection};
use indexmap::IndexMap;
use tracing::debug;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Linear and mixed integer linear problem solver backed by microlp
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {}

impl MicrolpSolver {
    /// Integer bounds for microlp, infinite bounds are clamped to the range of i32
    fn integer_bounds(lower_bound: f64, upper_bound: f64) -> (i32, i32) {
        let clamp = |v: f64| v.clamp(i32::MIN as f64, i32::MAX as f64) as i32;
        (clamp(lower_bound.ceil()), clamp(upper_bound.floor()))
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };

        // microlp takes objective coefficients when the variable is created
        let mut objective_coefficients: IndexMap<&str, f64> = IndexMap::new();
        for term in problem.objective().terms() {
            if !problem.has_variable(&term.variable) {
                return Err(SolverError::InvalidProblem(format!(
                    "objective references unknown variable {}",
                    term.variable
                )));
            }
            *objective_coefficients
                .entry(term.variable.as_str())
                .or_insert(0.) += term.coefficient;
        }

        let mut backend = ::microlp::Problem::new(direction);
        let mut backend_vars = Vec::with_capacity(problem.num_variables());
        for (id, variable) in problem.variables() {
            let coef = objective_coefficients.get(id.as_str()).copied().unwrap_or(0.);
            let var = match variable.variable_type {
                VariableType::Continuous => {
                    backend.add_var(coef, (variable.lower_bound, variable.upper_bound))
                }
                VariableType::Integer | VariableType::Binary => backend.add_integer_var(
                    coef,
                    Self::integer_bounds(variable.lower_bound, variable.upper_bound),
                ),
            };
            backend_vars.push(var);
        }

        for (id, constraint) in problem.constraints() {
            let mut terms: IndexMap<usize, f64> = IndexMap::new();
            for term in constraint.get_terms() {
                let index = problem.variable_index(&term.variable).ok_or_else(|| {
                    SolverError::InvalidProblem(format!(
                        "constraint {} references unknown variable {}",
                        id, term.variable
                    ))
                })?;
                *terms.entry(index).or_insert(0.) += term.coefficient;
            }
            let expression = || {
                let mut expr = LinearExpr::empty();
                for (index, coef) in &terms {
                    expr.add(backend_vars[*index], *coef);
                }
                expr
            };
            match constraint {
                Constraint::Equality { equals, .. } => {
                    backend.add_constraint(expression(), ComparisonOp::Eq, *equals)
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        backend.add_constraint(expression(), ComparisonOp::Eq, *lower_bound);
                        continue;
                    }
                    if upper_bound.is_finite() {
                        backend.add_constraint(expression(), ComparisonOp::Le, *upper_bound);
                    }
                    if lower_bound.is_finite() {
                        backend.add_constraint(expression(), ComparisonOp::Ge, *lower_bound);
                    }
                }
            }
        }

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            integer = problem.has_integer_variables(),
            "Solving problem with microlp"
        );
        let solution = match backend.solve() {
            Ok(solution) => solution,
            Err(::microlp::Error::Infeasible) => {
                return Ok(ProblemSolution::without_values(
                    OptimizationStatus::Infeasible,
                ))
            }
            Err(::microlp::Error::Unbounded) => {
                return Ok(ProblemSolution::without_values(
                    OptimizationStatus::Unbounded,
                ))
            }
            Err(err) => return Err(SolverError::Backend(err.to_string())),
        };

        let variable_values = problem
            .variables()
            .iter()
            .zip(backend_vars.iter())
            .map(|((id, variable), var)| {
                let value = solution[*var];
                let value = match variable.variable_type {
                    VariableType::Continuous => value,
                    VariableType::Integer | VariableType::Binary => value.round(),
                };
                (id.clone(), value)
            })
            .collect();
        Ok(ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(solution.objective()),
            variable_values: Some(variable_values),
        })
    }
}
