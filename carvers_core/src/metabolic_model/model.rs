//! This module provides the Model struct for representing an entire metabolic model
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::metabolic_model::gene::{Gene, Gpr};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

/// Represents a Genome Scale Metabolic Model
///
/// Used both for the universe a reconstruction starts from and for the models carved out of it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Genes
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// Free text notes, used to record how a model was produced
    pub notes: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model::default()
    }

    /// Add a reaction to the model
    ///
    /// Metabolites in the reaction's stoichiometry which are not yet in the model are added
    /// with only an id, as are the genes of its GPR.
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::metabolic_model::model::Model;
    /// use carvers_core::metabolic_model::reaction::ReactionBuilder;
    /// use indexmap::IndexMap;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default()
    ///     .id("new_reaction")
    ///     .metabolites(IndexMap::from([("a".to_string(), -1.), ("b".to_string(), 1.)]))
    ///     .build()
    ///     .unwrap();
    /// model.add_reaction(new_reaction);
    /// assert_eq!(model.metabolites.len(), 2);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met_id in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met_id) {
                self.metabolites
                    .insert(met_id.clone(), Metabolite::new(met_id));
            }
        }
        if let Some(gpr) = &reaction.gpr {
            for gene_id in gpr.genes() {
                if !self.genes.contains_key(&gene_id) {
                    let gene = Gene::new(&gene_id);
                    self.genes.insert(gene_id, gene);
                }
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Add a gene to the model
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Make `reaction_id` the sole objective of the model, with coefficient 1
    pub fn set_objective(&mut self, reaction_id: &str) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::UnknownReaction(reaction_id.to_string()));
        }
        self.objective.clear();
        self.objective.insert(reaction_id.to_string(), 1.);
        Ok(())
    }

    /// Id of the biomass reaction, i.e. the single reaction in the objective
    pub fn biomass_reaction(&self) -> Result<&str, ModelError> {
        let mut targets = self.objective.iter().filter(|(_, coef)| **coef != 0.);
        let (id, _) = targets.next().ok_or(ModelError::NoObjective)?;
        if targets.next().is_some() {
            return Err(ModelError::AmbiguousObjective);
        }
        if !self.reactions.contains_key(id) {
            return Err(ModelError::UnknownReaction(id.clone()));
        }
        Ok(id.as_str())
    }

    /// Exchange (boundary) reactions of the model, excluding the biomass reaction
    pub fn exchange_reactions(&self) -> impl Iterator<Item = &Reaction> {
        let biomass = self.biomass_reaction().ok().map(str::to_string);
        self.reactions
            .values()
            .filter(move |r| r.is_boundary() && biomass.as_deref() != Some(r.id.as_str()))
    }

    /// Ids of all reactions in the model
    pub fn reaction_ids(&self) -> IndexSet<String> {
        self.reactions.keys().cloned().collect()
    }

    /// Stoichiometry by metabolite: for each metabolite the (reaction id, coefficient) pairs
    /// producing or consuming it
    pub fn metabolite_participation(&self) -> IndexMap<String, Vec<(String, f64)>> {
        let mut participation: IndexMap<String, Vec<(String, f64)>> = self
            .metabolites
            .keys()
            .map(|m| (m.clone(), Vec::new()))
            .collect();
        for reaction in self.reactions.values() {
            for (met, coef) in &reaction.metabolites {
                participation
                    .entry(met.clone())
                    .or_default()
                    .push((reaction.id.clone(), *coef));
            }
        }
        participation
    }

    /// Create a new model holding only the reactions in `reaction_ids`
    ///
    /// Reactions keep their order in this model, only the metabolites and genes used by the
    /// kept reactions are carried over, and the objective is restricted to kept reactions.
    pub fn subset(&self, reaction_ids: &IndexSet<String>) -> Model {
        let mut model = Model {
            id: self.id.clone(),
            compartments: self.compartments.clone(),
            notes: self.notes.clone(),
            ..Model::default()
        };
        for reaction in self
            .reactions
            .values()
            .filter(|r| reaction_ids.contains(&r.id))
        {
            for met_id in reaction.metabolites.keys() {
                if let Some(met) = self.metabolites.get(met_id) {
                    if !model.metabolites.contains_key(met_id) {
                        model.add_metabolite(met.clone());
                    }
                }
            }
            if let Some(gpr) = &reaction.gpr {
                for gene_id in gpr.genes() {
                    if let Some(gene) = self.genes.get(&gene_id) {
                        if !model.genes.contains_key(&gene_id) {
                            model.add_gene(gene.clone());
                        }
                    }
                }
            }
            model.add_reaction(reaction.clone());
        }
        model.objective = self
            .objective
            .iter()
            .filter(|(id, _)| reaction_ids.contains(*id))
            .map(|(id, coef)| (id.clone(), *coef))
            .collect();
        model
    }

    /// Copy reactions from `source` into this model, along with their metabolites
    ///
    /// Each copied reaction gets the rule returned by `rule_for`, and the genes of that rule
    /// are added (using the records of `source` where it has them). Returns the ids of the
    /// metabolites which were new to this model. Reactions already in the model are left
    /// untouched.
    pub fn copy_reactions_from<F>(
        &mut self,
        source: &Model,
        reaction_ids: &[String],
        rule_for: F,
    ) -> Result<Vec<String>, ModelError>
    where
        F: Fn(&Reaction) -> Option<Gpr>,
    {
        let mut new_metabolites = Vec::new();
        for id in reaction_ids {
            if self.reactions.contains_key(id) {
                continue;
            }
            let reaction = source
                .reactions
                .get(id)
                .ok_or_else(|| ModelError::UnknownReaction(id.clone()))?;
            for met_id in reaction.metabolites.keys() {
                if !self.metabolites.contains_key(met_id) {
                    let met = source
                        .metabolites
                        .get(met_id)
                        .cloned()
                        .unwrap_or_else(|| Metabolite::new(met_id));
                    self.add_metabolite(met);
                    new_metabolites.push(met_id.clone());
                }
            }
            let mut reaction = reaction.clone();
            reaction.gpr = rule_for(&reaction);
            if let Some(gpr) = &reaction.gpr {
                for gene_id in gpr.genes() {
                    if !self.genes.contains_key(&gene_id) {
                        let gene = source
                            .genes
                            .get(&gene_id)
                            .cloned()
                            .unwrap_or_else(|| Gene::new(&gene_id));
                        self.add_gene(gene);
                    }
                }
            }
            self.add_reaction(reaction);
        }
        Ok(new_metabolites)
    }

    /// Check that the model is internally consistent
    ///
    /// All metabolites in reaction stoichiometries must exist, reaction bounds must be
    /// ordered, and the objective must name a single existing reaction.
    pub fn check_consistency(&self) -> Result<(), ModelError> {
        for reaction in self.reactions.values() {
            if reaction.lower_bound > reaction.upper_bound {
                return Err(ModelError::InvalidBounds(reaction.id.clone()));
            }
            for met_id in reaction.metabolites.keys() {
                if !self.metabolites.contains_key(met_id) {
                    return Err(ModelError::UnknownMetabolite {
                        reaction: reaction.id.clone(),
                        metabolite: met_id.clone(),
                    });
                }
            }
        }
        self.biomass_reaction()?;
        Ok(())
    }
}

/// Errors associated with a Model
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Model has no objective reaction")]
    NoObjective,
    #[error("Model objective contains more than one reaction")]
    AmbiguousObjective,
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    #[error("Reaction {reaction} uses metabolite {metabolite} which is not in the model")]
    UnknownMetabolite { reaction: String, metabolite: String },
    #[error("Reaction {0} has a lower bound greater than its upper bound")]
    InvalidBounds(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::toy_universe;

    #[test]
    fn biomass() {
        let universe = toy_universe();
        assert_eq!(universe.biomass_reaction().unwrap(), "R_BIOMASS");

        let mut empty = Model::new_empty();
        assert_eq!(empty.biomass_reaction(), Err(ModelError::NoObjective));
        assert_eq!(
            empty.set_objective("R_missing"),
            Err(ModelError::UnknownReaction("R_missing".to_string()))
        );
    }

    #[test]
    fn exchanges_exclude_biomass() {
        let universe = toy_universe();
        let exchanges: Vec<&str> = universe
            .exchange_reactions()
            .map(|r| r.id.as_str())
            .collect();
        assert!(exchanges.contains(&"R_EX_glc_e"));
        assert!(exchanges.contains(&"R_EX_nh4_e"));
        assert!(!exchanges.contains(&"R_BIOMASS"));
        assert!(!exchanges.contains(&"R_GLCt"));
    }

    #[test]
    fn subset_keeps_used_metabolites() {
        let universe = toy_universe();
        let keep: IndexSet<String> = ["R_EX_glc_e", "R_GLCt", "R_BIOMASS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let model = universe.subset(&keep);
        assert_eq!(model.reactions.len(), 3);
        assert!(model.metabolites.contains_key("glc_e"));
        assert!(model.metabolites.contains_key("glc_c"));
        assert!(!model.metabolites.contains_key("ac_e"));
        assert!(model.genes.contains_key("g_glct"));
        assert!(!model.genes.contains_key("g_act"));
        assert_eq!(model.biomass_reaction().unwrap(), "R_BIOMASS");
        // The universe itself is untouched
        assert_eq!(universe, toy_universe());
    }

    #[test]
    fn copy_reactions() {
        let universe = toy_universe();
        let keep: IndexSet<String> = ["R_BIOMASS"].iter().map(|s| s.to_string()).collect();
        let mut model = universe.subset(&keep);
        let added = model
            .copy_reactions_from(
                &universe,
                &["R_GLCt".to_string(), "R_BIOMASS".to_string()],
                |r| r.gpr.clone(),
            )
            .unwrap();
        assert_eq!(added, vec!["glc_e".to_string(), "glc_c".to_string()]);
        assert_eq!(model.reactions.len(), 2);
        assert!(model.genes.contains_key("g_glct"));

        // Rewritten rules bring their own genes along
        model
            .copy_reactions_from(&universe, &["R_ACt".to_string()], |_| {
                Some(Gpr::Gene("orgA_6".to_string()))
            })
            .unwrap();
        assert_eq!(
            model.reactions["R_ACt"].gpr,
            Some(Gpr::Gene("orgA_6".to_string()))
        );
        assert!(model.genes.contains_key("orgA_6"));
        assert!(!model.genes.contains_key("g_act"));

        let res = model.copy_reactions_from(&universe, &["R_nope".to_string()], |r| r.gpr.clone());
        assert_eq!(res, Err(ModelError::UnknownReaction("R_nope".to_string())));
    }

    #[test]
    fn consistency() {
        let mut universe = toy_universe();
        universe.check_consistency().unwrap();
        universe.metabolites.shift_remove("glc_c");
        match universe.check_consistency() {
            Err(ModelError::UnknownMetabolite { metabolite, .. }) => assert_eq!(metabolite, "glc_c"),
            other => panic!("Missing metabolite not caught: {:?}", other),
        }
    }

    #[test]
    fn participation() {
        let universe = toy_universe();
        let participation = universe.metabolite_participation();
        let pyr = participation.get("pyr_c").unwrap();
        assert!(pyr.contains(&("R_BIOMASS".to_string(), -1.)));
        assert!(pyr.contains(&("R_GLYC".to_string(), 2.)));
    }
}
