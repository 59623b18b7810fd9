//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::variable::{Variable, VariableType};

/// A linear optimization problem, possibly with integer restrictions
///
/// Variables and constraints are keyed by id, and keep their insertion order. A problem is
/// an immutable description once built; solvers read it and never keep hold of it.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Accessors
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Position of a variable in the problem
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.get_index_of(id)
    }

    pub fn has_variable(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }
    // endregion Accessors

    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        variable.index = self.variables.len();
        if variable.variable_type != VariableType::Continuous {
            self.problem_type = ProblemType::LinearMixedInteger;
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_variable(Variable {
            id: id.to_string(),
            name: name.map(str::to_string),
            variable_type,
            lower_bound,
            upper_bound,
            index: 0,
        })
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, id: &str, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(id, &constraint)?;
        self.constraints.insert(id.to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint using variable ids, and add it to the problem
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(id, Constraint::new_equality(variables, coefficients, equals))
    }

    /// Create a new inequality constraint using variable ids, and add it to the problem
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(
            id,
            Constraint::new_inequality(variables, coefficients, lower_bound, upper_bound),
        )
    }
    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        if !self.variables.contains_key(&objective_term.variable) {
            return Err(ProblemError::NonExistentVariablesInObjective(
                objective_term.variable,
            ));
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable_id, coefficient))
    }
    // endregion Adding Objective Terms

    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ProblemError::NonExistentVariable(id.to_string())),
        }
    }

    // region Removal
    /// Remove a variable from the problem, will also remove it as a term from all constraints
    /// and any terms in the objective that include this variable
    pub fn delete_variable(&mut self, variable_id: &str) -> Result<(), ProblemError> {
        if self.variables.shift_remove(variable_id).is_none() {
            return Err(ProblemError::NonExistentVariable(variable_id.to_string()));
        }
        self.objective.remove_terms_with_variable(variable_id);
        self.constraints
            .values_mut()
            .for_each(|cons| cons.remove_variable(variable_id));
        self.fix_variable_indices();
        self.fix_problem_type();
        Ok(())
    }

    /// Remove a constraint (by id) from the problem
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Option<Constraint> {
        self.constraints.shift_remove(constraint_id)
    }
    // endregion Removal

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        if variable.lower_bound.is_nan()
            || variable.upper_bound.is_nan()
            || variable.lower_bound > variable.upper_bound
        {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, id: &str, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        let (lower_bound, upper_bound) = constraint.get_bounds();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
        }
        if let Some(missing) = constraint
            .get_variables()
            .find(|var| !self.variables.contains_key(*var))
        {
            return Err(ProblemError::NonExistentVariablesInConstraint {
                constraint: id.to_string(),
                variable: missing.to_string(),
            });
        }
        Ok(())
    }
    // endregion Validation Functions

    fn fix_variable_indices(&mut self) {
        self.variables
            .values_mut()
            .enumerate()
            .for_each(|(ind, var)| var.index = ind);
    }

    fn fix_problem_type(&mut self) {
        self.problem_type = if self.has_integer_variables() {
            ProblemType::LinearMixedInteger
        } else {
            ProblemType::LinearContinuous
        }
    }

    /// Check whether the problem has Integer or Binary variables
    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|var| var.variable_type != VariableType::Continuous)
    }
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0} which has the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to give variable {0} lower_bound>upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint {0} which has the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Constraint {constraint} references variable {variable} which is not in the problem")]
    NonExistentVariablesInConstraint { constraint: String, variable: String },
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variable {0} which is not in the problem")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to perform an update or drop on a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
}
