//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;

use crate::configuration::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};
use crate::metabolic_model::gene::Gpr;
use crate::utils::hashing::hash_as_hex_string;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "DEFAULT_LOWER_BOUND")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "DEFAULT_UPPER_BOUND")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Determine the id of the indicator variable marking forward flux in the optimization problem
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        format!("{}_forward", &self.id)
    }

    /// Determine the id of the indicator variable marking reverse flux in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexidecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        format!("{}_reverse_{}", &self.id, hash_as_hex_string(&self.id))
    }

    /// Whether the reaction only involves a single metabolite (exchange, sink or demand)
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let reaction = ReactionBuilder::default().id("R_PFK").build().unwrap();
        assert_eq!(reaction.lower_bound, DEFAULT_LOWER_BOUND);
        assert_eq!(reaction.upper_bound, DEFAULT_UPPER_BOUND);
        assert_eq!(reaction.gpr, None);
        assert!(!reaction.is_boundary());
    }

    #[test]
    fn indicator_ids() {
        let reaction = ReactionBuilder::default().id("R_PFK").build().unwrap();
        assert_eq!(reaction.get_forward_id(), "R_PFK_forward");
        assert!(reaction.get_reverse_id().starts_with("R_PFK_reverse_"));
        assert_ne!(reaction.get_forward_id(), reaction.get_reverse_id());
    }

    #[test]
    fn boundary() {
        let exchange = ReactionBuilder::default()
            .id("R_EX_glc__D_e")
            .metabolites(IndexMap::from([("M_glc__D_e".to_string(), -1.)]))
            .lower_bound(0.)
            .build()
            .unwrap();
        assert!(exchange.is_boundary());
        assert_eq!(exchange.lower_bound, 0.);
    }
}
