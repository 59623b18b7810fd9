//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`,
    /// either bound may be infinite
    Inequality {
        /// Linear terms which are added together, see [`ConstraintTerm`] for more
        terms: Vec<ConstraintTerm>,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `variables`: A slice of variable ids
    /// - `coefficients`: A slice of coefficients for the variables
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::optimize::constraint::Constraint;
    /// // Create a constraint representing 3*x + 2*y = 6
    /// let new_constraint = Constraint::new_equality(&["x", "y"], &[3.0, 2.0], 6.);
    /// assert_eq!(format!("{}", new_constraint), "3*x + 2*y = 6");
    /// ```
    pub fn new_equality(variables: &[&str], coefficients: &[f64], equals: f64) -> Self {
        Constraint::Equality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Create a new inequality constraint
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::optimize::constraint::Constraint;
    /// // represents the inequality 2 <= 3*x + 2*y <= 6
    /// let new_constraint = Constraint::new_inequality(&["x", "y"], &[3.0, 2.0], 2., 6.);
    /// ```
    pub fn new_inequality(
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    /// Create a constraint from already built terms
    pub fn from_terms(terms: Vec<ConstraintTerm>, lower_bound: f64, upper_bound: f64) -> Self {
        if lower_bound == upper_bound {
            Constraint::Equality {
                terms,
                equals: lower_bound,
            }
        } else {
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            }
        }
    }

    /// Terms of the constraint
    pub fn get_terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Ids of the variables appearing in the constraint
    pub fn get_variables(&self) -> impl Iterator<Item = &str> {
        self.get_terms().iter().map(|t| t.variable.as_str())
    }

    /// Lower and upper bound of the constraint, equal for equality constraints
    pub fn get_bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    /// Remove all terms involving `variable_id`
    pub fn remove_variable(&mut self, variable_id: &str) {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => {
                terms.retain(|t| t.variable != variable_id)
            }
        }
    }

    /// Take a slice of variable ids, and a slice of coefficients and zip
    /// them together into a vec of ConstraintTerms
    fn zip_into_terms(variables: &[&str], coefficients: &[f64]) -> Vec<ConstraintTerm> {
        variables
            .iter()
            .zip(coefficients)
            .map(|(var, coef)| ConstraintTerm::new(var, *coef))
            .collect()
    }

    /// Create a string representation of the terms in the Constraint
    fn constraint_to_string(&self) -> String {
        match self {
            Constraint::Equality { terms, equals } => {
                format!("{} = {}", Self::terms_to_string(terms), equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
            } => {
                format!(
                    "{} <= {} <= {}",
                    lower_bound,
                    Self::terms_to_string(terms),
                    upper_bound
                )
            }
        }
    }

    /// Convert a slice of terms into a String representation
    fn terms_to_string(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.constraint_to_string())
    }
}

/// Represents a single term in a constraint, specifically
/// represents the multiplication of the `variable` by the `coefficient`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTerm {
    /// Id of the variable
    pub variable: String,
    /// The coefficient for the variable
    pub coefficient: f64,
}

impl ConstraintTerm {
    pub fn new(variable: &str, coefficient: f64) -> Self {
        ConstraintTerm {
            variable: variable.to_string(),
            coefficient,
        }
    }
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.coefficient, self.variable)
    }
}
