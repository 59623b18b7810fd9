//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

use crate::configuration::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};

/// A variable of an optimization problem
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    pub id: String,
    /// Human readable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Type of the variable (see [`VariableType`])
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// Lowest value the variable can take
    #[builder(default = "DEFAULT_LOWER_BOUND")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "DEFAULT_UPPER_BOUND")]
    pub upper_bound: f64,
    /// Position of the variable in its problem, set when the variable is added
    #[builder(setter(skip), default = "0")]
    pub(crate) index: usize,
}

impl Variable {
    /// Create a new binary variable, taking values in {0, 1}
    pub fn binary(id: &str) -> Variable {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Binary,
            lower_bound: 0.,
            upper_bound: 1.,
            index: 0,
        }
    }

    /// Position of the variable in the problem it belongs to
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", name, self.variable_type),
            None => write!(f, "{}:{}", self.id, self.variable_type),
        }
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, currently Clarabel only supports
/// Continuous variables, while microlp supports all types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
