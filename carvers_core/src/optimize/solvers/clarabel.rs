//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b` with `s` in a product of
//! cones. Equality constraints and fixed variables go to the zero cone, every finite
//! inequality (including variable bounds) becomes a row of the nonnegative cone.
use ::clarabel::algebra::CscMatrix as ClarabelCscMatrix;
use ::clarabel::solver::*;
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use tracing::debug;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Continuous linear problem solver backed by Clarabel
#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {
    /// Print the Clarabel iteration log
    pub verbose: bool,
}

/// A row of the constraint matrix, `terms <= rhs` (nonnegative cone) or `terms = rhs` (zero cone)
struct Row {
    terms: IndexMap<usize, f64>,
    rhs: f64,
}

impl Row {
    fn scaled(terms: &IndexMap<usize, f64>, scale: f64, rhs: f64) -> Row {
        Row {
            terms: terms.iter().map(|(i, c)| (*i, c * scale)).collect(),
            rhs,
        }
    }
}

impl ClarabelSolver {
    /// Split the problem into zero cone and nonnegative cone rows
    fn build_rows(problem: &Problem) -> Result<(Vec<Row>, Vec<Row>), SolverError> {
        let mut equalities: Vec<Row> = Vec::new();
        let mut inequalities: Vec<Row> = Vec::new();

        for (id, constraint) in problem.constraints() {
            // Merge repeated variables into a single coefficient
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
            match constraint {
                Constraint::Equality { equals, .. } => {
                    equalities.push(Row::scaled(&terms, 1., *equals))
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if upper_bound.is_finite() {
                        inequalities.push(Row::scaled(&terms, 1., *upper_bound));
                    }
                    if lower_bound.is_finite() {
                        inequalities.push(Row::scaled(&terms, -1., -lower_bound));
                    }
                }
            }
        }

        for variable in problem.variables().values() {
            let single = IndexMap::from([(variable.index(), 1.)]);
            if variable.lower_bound == variable.upper_bound {
                equalities.push(Row::scaled(&single, 1., variable.lower_bound));
                continue;
            }
            if variable.upper_bound.is_finite() {
                inequalities.push(Row::scaled(&single, 1., variable.upper_bound));
            }
            if variable.lower_bound.is_finite() {
                inequalities.push(Row::scaled(&single, -1., -variable.lower_bound));
            }
        }
        Ok((equalities, inequalities))
    }

    /// Convert a nalgebra-sparse matrix into Clarabel's representation
    fn to_clarabel_matrix(matrix: CscMatrix<f64>) -> ClarabelCscMatrix<f64> {
        let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
        let (col_offsets, row_indices, values) = matrix.disassemble();
        ClarabelCscMatrix::new(nrows, ncols, col_offsets, row_indices, values)
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        if problem.has_integer_variables() {
            return Err(SolverError::IntegerVariablesUnsupported(self.name()));
        }
        let n = problem.num_variables();
        let (equalities, inequalities) = Self::build_rows(problem)?;
        let num_eq = equalities.len();
        let num_ineq = inequalities.len();

        let mut coo = CooMatrix::new(num_eq + num_ineq, n);
        let mut b = Vec::with_capacity(num_eq + num_ineq);
        for (row_index, row) in equalities.iter().chain(inequalities.iter()).enumerate() {
            for (col, coef) in &row.terms {
                if *coef != 0. {
                    coo.push(row_index, *col, *coef);
                }
            }
            b.push(row.rhs);
        }
        let a = Self::to_clarabel_matrix(CscMatrix::from(&coo));
        let p = ClarabelCscMatrix::new(n, n, vec![0; n + 1], vec![], vec![]);

        // Clarabel minimizes, so a maximization objective is negated
        let sign = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };
        let mut q = vec![0.; n];
        for term in problem.objective().terms() {
            let index = problem.variable_index(&term.variable).ok_or_else(|| {
                SolverError::InvalidProblem(format!(
                    "objective references unknown variable {}",
                    term.variable
                ))
            })?;
            q[index] += sign * term.coefficient;
        }

        let mut cones = Vec::with_capacity(2);
        if num_eq > 0 {
            cones.push(ZeroConeT(num_eq));
        }
        if num_ineq > 0 {
            cones.push(NonnegativeConeT(num_ineq));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.verbose)
            .build()
            .map_err(|err| SolverError::Backend(err.to_string()))?;

        debug!(
            variables = n,
            equality_rows = num_eq,
            inequality_rows = num_ineq,
            "Solving linear problem with clarabel"
        );
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::SolverHalted,
        };
        if !matches!(
            status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) {
            return Ok(ProblemSolution::without_values(status));
        }

        let variable_values = problem
            .variables()
            .keys()
            .zip(solver.solution.x.iter())
            .map(|(id, value)| (id.clone(), *value))
            .collect();
        Ok(ProblemSolution {
            status,
            objective_value: Some(sign * solver.solution.obj_val),
            variable_values: Some(variable_values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    #[test]
    fn simple_lp() {
        // max x + 2y, x + y <= 4, y <= 3, x,y >= 0
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., f64::INFINITY)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("c", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 2.).unwrap();

        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.objective_value.unwrap() - 7.).abs() < 1e-5);
        assert!((solution.value("x").unwrap() - 1.).abs() < 1e-5);
        assert!((solution.value("y").unwrap() - 3.).abs() < 1e-5);
    }

    #[test]
    fn equality_and_fixed() {
        // min x + y, x + y = 2 with x fixed at 0.5
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0.5, 0.5)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, -10., 10.)
            .unwrap();
        problem
            .add_new_equality_constraint_by_id("c", &["x", "y"], &[1., 1.], 2.)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert!((solution.value("y").unwrap() - 1.5).abs() < 1e-5);
    }

    #[test]
    fn infeasible() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("c", &["x"], &[1.], 2., f64::INFINITY)
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        let solution = ClarabelSolver::default().solve(&problem).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }

    #[test]
    fn rejects_integer_variables() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("z", None, VariableType::Binary, 0., 1.)
            .unwrap();
        assert_eq!(
            ClarabelSolver::default().solve(&problem),
            Err(SolverError::IntegerVariablesUnsupported("clarabel"))
        );
    }
}
