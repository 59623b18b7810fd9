//! Nutrient environments: media and the exchange bounds they translate into
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;

/// A named set of compounds available for uptake
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Name of the medium (e.g. "M9")
    pub name: String,
    /// Compound ids, without compartment, available for uptake
    pub compounds: IndexSet<String>,
}

impl Medium {
    /// Create a new medium
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::metabolic_model::environment::Medium;
    /// let medium = Medium::new("M9", ["glc__D", "nh4", "pi"]);
    /// assert_eq!(medium.compounds.len(), 3);
    /// ```
    pub fn new<I, S>(name: &str, compounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Medium {
            name: name.to_string(),
            compounds: compounds.into_iter().map(Into::into).collect(),
        }
    }
}

/// Exchange reaction uptake limits derived from a medium
///
/// Exchange reactions follow the usual convention of consuming their single metabolite, so
/// uptake is negative flux. Applying an environment opens uptake (down to `-max_uptake`) for
/// the exchanges it lists and closes uptake for every other exchange; secretion is unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    /// Map of exchange reaction ids to their maximum uptake rate
    pub uptake: IndexMap<String, f64>,
}

impl Environment {
    /// Build an environment from compound ids
    ///
    /// `exchange_format` maps a compound id to its exchange reaction id, with `{}` standing for
    /// the compound (e.g. `"R_EX_{}_e"`).
    pub fn from_compounds<'a, I>(compounds: I, exchange_format: &str, max_uptake: f64) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Environment {
            uptake: compounds
                .into_iter()
                .map(|c| (exchange_format.replace("{}", c), max_uptake))
                .collect(),
        }
    }

    /// Build an environment from a medium
    pub fn from_medium(medium: &Medium, exchange_format: &str, max_uptake: f64) -> Self {
        Self::from_compounds(&medium.compounds, exchange_format, max_uptake)
    }

    /// Bounds an exchange reaction takes under this environment
    pub fn exchange_bounds(&self, reaction: &Reaction) -> (f64, f64) {
        match self.uptake.get(&reaction.id) {
            Some(max_uptake) => (-max_uptake, reaction.upper_bound.max(0.)),
            None => {
                let lower = reaction.lower_bound.max(0.);
                (lower, reaction.upper_bound.max(lower))
            }
        }
    }

    /// Bound overrides this environment implies for the exchange reactions of `model`,
    /// without modifying it
    pub fn bounds_for(&self, model: &Model) -> IndexMap<String, (f64, f64)> {
        model
            .exchange_reactions()
            .map(|r| (r.id.clone(), self.exchange_bounds(r)))
            .collect()
    }

    /// Exchange reactions of this environment which `model` doesn't contain
    pub fn missing_exchanges(&self, model: &Model) -> Vec<String> {
        self.uptake
            .keys()
            .filter(|id| !model.reactions.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Apply this environment to the exchange reactions of `model`
    pub fn apply(&self, model: &mut Model) {
        for (id, (lower, upper)) in self.bounds_for(model) {
            if let Some(reaction) = model.reactions.get_mut(&id) {
                reaction.lower_bound = lower;
                reaction.upper_bound = upper;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::toy_universe;

    #[test]
    fn from_medium() {
        let medium = Medium::new("glucose", ["glc", "nh4"]);
        let env = Environment::from_medium(&medium, "R_EX_{}_e", 10.);
        assert_eq!(env.uptake.get("R_EX_glc_e"), Some(&10.));
        assert_eq!(env.uptake.get("R_EX_nh4_e"), Some(&10.));
        assert_eq!(env.uptake.len(), 2);
    }

    #[test]
    fn apply_opens_and_closes() {
        let mut model = toy_universe();
        let medium = Medium::new("glucose", ["glc", "nh4"]);
        Environment::from_medium(&medium, "R_EX_{}_e", 5.).apply(&mut model);
        let glc = &model.reactions["R_EX_glc_e"];
        assert_eq!((glc.lower_bound, glc.upper_bound), (-5., 1000.));
        let ac = &model.reactions["R_EX_ac_e"];
        assert_eq!((ac.lower_bound, ac.upper_bound), (0., 1000.));
        // Non exchange reactions are untouched
        assert_eq!(model.reactions["R_ACt"].lower_bound, -1000.);
        assert_eq!(model.reactions["R_BIOMASS"].lower_bound, 0.);
    }

    #[test]
    fn missing() {
        let model = toy_universe();
        let medium = Medium::new("odd", ["glc", "fe2"]);
        let env = Environment::from_medium(&medium, "R_EX_{}_e", 10.);
        assert_eq!(env.missing_exchanges(&model), vec!["R_EX_fe2_e".to_string()]);
    }
}
