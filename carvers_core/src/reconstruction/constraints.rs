//! User supplied directives on reaction inclusion
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Binding directive on a single reaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// The reaction must be part of the carved model
    ForcedOn,
    /// The reaction must not be part of the carved model
    ForcedOff,
}

/// Binding directives, keyed by reaction id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HardConstraints {
    pub directives: IndexMap<String, Directive>,
}

impl HardConstraints {
    pub fn new() -> Self {
        HardConstraints::default()
    }

    /// Add (or replace) the directive for a reaction
    pub fn insert(&mut self, reaction_id: &str, directive: Directive) {
        self.directives.insert(reaction_id.to_string(), directive);
    }

    pub fn get(&self, reaction_id: &str) -> Option<Directive> {
        self.directives.get(reaction_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Directive)> for HardConstraints {
    fn from_iter<T: IntoIterator<Item = (S, Directive)>>(iter: T) -> Self {
        HardConstraints {
            directives: iter.into_iter().map(|(id, d)| (id.into(), d)).collect(),
        }
    }
}

/// Objective weight perturbations, keyed by reaction id
///
/// A positive delta makes a reaction more attractive to keep, a negative one makes it more
/// attractive to drop. Nothing is binding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftConstraints {
    pub weights: IndexMap<String, f64>,
}

impl SoftConstraints {
    pub fn new() -> Self {
        SoftConstraints::default()
    }

    /// Add (or replace) the weight delta for a reaction
    pub fn insert(&mut self, reaction_id: &str, delta: f64) {
        self.weights.insert(reaction_id.to_string(), delta);
    }

    pub fn delta(&self, reaction_id: &str) -> Option<f64> {
        self.weights.get(reaction_id).copied()
    }

    pub fn contains(&self, reaction_id: &str) -> bool {
        self.weights.contains_key(reaction_id)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SoftConstraints {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        SoftConstraints {
            weights: iter.into_iter().map(|(id, w)| (id.into(), w)).collect(),
        }
    }
}
