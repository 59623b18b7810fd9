//! Provides struct for representing an optimization problem's objective

/// Represents the linear objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a new linear term to the objective
    pub fn add_linear_term(&mut self, variable: &str, coefficient: f64) {
        self.terms.push(ObjectiveTerm::new(variable, coefficient));
    }

    /// Add a series of linear terms to the objective function
    pub fn add_linear_terms(&mut self, variables: &[&str], coefficients: &[f64]) {
        self.terms.extend(
            variables
                .iter()
                .zip(coefficients)
                .map(|(var, coef)| ObjectiveTerm::new(var, *coef)),
        );
    }

    /// Remove every term referencing `variable_id`
    pub fn remove_terms_with_variable(&mut self, variable_id: &str) {
        self.terms.retain(|t| t.variable != variable_id);
    }

    /// Value of the objective for an assignment of the variables, missing variables count as 0
    pub fn evaluate<F>(&self, value_of: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.terms
            .iter()
            .map(|t| t.coefficient * value_of(&t.variable).unwrap_or(0.))
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term in the objective
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveTerm {
    /// Id of the variable in the term
    pub variable: String,
    /// Coefficient of the term
    pub coefficient: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new(variable: &str, coefficient: f64) -> Self {
        ObjectiveTerm {
            variable: variable.to_string(),
            coefficient,
        }
    }
}
