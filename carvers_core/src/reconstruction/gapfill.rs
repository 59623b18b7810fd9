//! Gap-filling: add the fewest universe reactions needed for a model to grow on a medium
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::configuration::Configuration;
use crate::flux_balance::{add_flux_variable, add_mass_balance, grows_on, FluxBalanceError};
use crate::metabolic_model::environment::{Environment, Medium};
use crate::metabolic_model::gene::Gpr;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::Variable;
use crate::optimize::OptimizationStatus;
use crate::reconstruction::scoring::{organism_rule, GprTable, ReactionScores};

/// What gap-filling did for one medium
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GapFillOutcome {
    /// The model grows on the medium after adding these reactions (possibly none)
    Filled {
        reactions: Vec<String>,
        metabolites: Vec<String>,
    },
    /// No set of universe reactions lets the model grow on the medium, or the reactions
    /// picked didn't reach the minimum growth in flux balance analysis. The model is left
    /// as it was.
    Infeasible,
}

/// Gap-filling outcome for a single medium
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediumGapFill {
    pub medium: String,
    #[serde(flatten)]
    pub outcome: GapFillOutcome,
}

/// Gap-filling outcomes, in the order the media were processed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GapFillResult {
    pub media: Vec<MediumGapFill>,
}

impl GapFillResult {
    /// All reactions added, over every medium
    pub fn added_reactions(&self) -> Vec<&str> {
        self.media
            .iter()
            .flat_map(|m| match &m.outcome {
                GapFillOutcome::Filled { reactions, .. } => {
                    reactions.iter().map(String::as_str).collect::<Vec<_>>()
                }
                GapFillOutcome::Infeasible => Vec::new(),
            })
            .collect()
    }

    /// Names of the media which couldn't be gap-filled
    pub fn infeasible_media(&self) -> Vec<&str> {
        self.media
            .iter()
            .filter(|m| m.outcome == GapFillOutcome::Infeasible)
            .map(|m| m.medium.as_str())
            .collect()
    }

    pub fn outcome(&self, medium: &str) -> Option<&GapFillOutcome> {
        self.media
            .iter()
            .find(|m| m.medium == medium)
            .map(|m| &m.outcome)
    }
}

/// Gap-fills models against a universe
pub struct GapFiller<'a> {
    universe: &'a Model,
    config: &'a Configuration,
    lp_solver: &'a dyn Solver,
    milp_solver: &'a dyn Solver,
    scores: Option<&'a ReactionScores>,
    gpr_table: Option<&'a GprTable>,
}

impl<'a> GapFiller<'a> {
    /// Create a gap-filler, `lp_solver` checks growth and `milp_solver` picks the reactions
    pub fn new(
        universe: &'a Model,
        config: &'a Configuration,
        lp_solver: &'a dyn Solver,
        milp_solver: &'a dyn Solver,
    ) -> Self {
        GapFiller {
            universe,
            config,
            lp_solver,
            milp_solver,
            scores: None,
            gpr_table: None,
        }
    }

    /// Prefer well supported reactions among equally small additions
    ///
    /// Ignored when the configuration asks for blind gap-filling.
    pub fn with_scores(mut self, scores: &'a ReactionScores) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Gene rules to give the added reactions, instead of those stored on the universe
    pub fn with_gpr_table(mut self, gpr_table: &'a GprTable) -> Self {
        self.gpr_table = Some(gpr_table);
        self
    }

    /// Rule of an added reaction
    ///
    /// Follows the carved reactions: table rules first, then renamed to the organism's genes
    /// when scores are given and renaming is on.
    fn added_rule(&self, reaction: &Reaction) -> Option<Gpr> {
        let best_hits = self
            .scores
            .filter(|_| self.config.carving.rename_genes)
            .map(|scores| &scores.best_hits);
        organism_rule(reaction, self.gpr_table, best_hits)
    }

    /// Gap-fill `model` for each medium in turn
    ///
    /// Additions accumulate, each medium is gap-filled against the model as left by the
    /// previous ones. A medium which can't be gap-filled is recorded and skipped. Once all
    /// media are done the `initial_environment` (if any) is applied to the model.
    pub fn fill(
        &self,
        model: &mut Model,
        media: &[Medium],
        initial_environment: Option<&Environment>,
    ) -> Result<GapFillResult, GapFillError> {
        let mut result = GapFillResult::default();
        for medium in media {
            let outcome = self.fill_medium(model, medium)?;
            if outcome == GapFillOutcome::Infeasible {
                warn!(
                    model = model.id.as_deref().unwrap_or(""),
                    medium = medium.name.as_str(),
                    "Gap-filling failed, the model won't grow on this medium"
                );
            }
            result.media.push(MediumGapFill {
                medium: medium.name.clone(),
                outcome,
            });
        }
        if let Some(env) = initial_environment {
            env.apply(model);
        }
        Ok(result)
    }

    /// Gap-fill `model` for a single medium
    pub fn fill_medium(
        &self,
        model: &mut Model,
        medium: &Medium,
    ) -> Result<GapFillOutcome, GapFillError> {
        let env = Environment::from_medium(
            medium,
            &self.config.exchange_format,
            self.config.gapfill.max_uptake,
        );
        for missing in env.missing_exchanges(self.universe) {
            if !model.reactions.contains_key(&missing) {
                warn!(
                    reaction = missing.as_str(),
                    medium = medium.name.as_str(),
                    "Medium compound has no exchange reaction"
                );
            }
        }
        let min_growth = self.config.gapfill.min_growth;
        if grows_on(
            model,
            Some(&env),
            min_growth,
            self.config.tolerance,
            self.lp_solver,
        )? {
            debug!(medium = medium.name.as_str(), "Model already grows");
            return Ok(GapFillOutcome::Filled {
                reactions: Vec::new(),
                metabolites: Vec::new(),
            });
        }
        if !self.milp_solver.integer_variable_capable() {
            return Err(SolverError::IntegerVariablesUnsupported(self.milp_solver.name()).into());
        }

        let candidates: Vec<&Reaction> = self
            .universe
            .reactions
            .values()
            .filter(|r| !model.reactions.contains_key(&r.id))
            .collect();
        let problem = self.build_problem(model, &env, &candidates)?;
        debug!(
            medium = medium.name.as_str(),
            candidates = candidates.len(),
            variables = problem.num_variables(),
            "Solving gap-filling problem"
        );
        let solution = self.milp_solver.solve(&problem)?;
        match solution.status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => {}
            OptimizationStatus::Infeasible => return Ok(GapFillOutcome::Infeasible),
            status => {
                return Err(GapFillError::Unsolved {
                    medium: medium.name.clone(),
                    status,
                })
            }
        }

        let added: Vec<String> = candidates
            .iter()
            .filter(|r| solution.value(&Self::added_id(r)).unwrap_or(0.) > 0.5)
            .map(|r| r.id.clone())
            .collect();
        let mut filled = model.clone();
        let metabolites =
            filled.copy_reactions_from(self.universe, &added, |r| self.added_rule(r))?;
        if !grows_on(&filled, Some(&env), min_growth, self.config.tolerance, self.lp_solver)? {
            warn!(
                medium = medium.name.as_str(),
                reactions = added.len(),
                "Gap-filled model doesn't reach the minimum growth in flux balance analysis, additions dropped"
            );
            return Ok(GapFillOutcome::Infeasible);
        }
        *model = filled;
        info!(
            model = model.id.as_deref().unwrap_or(""),
            medium = medium.name.as_str(),
            reactions = added.len(),
            metabolites = metabolites.len(),
            "Gap-filled model"
        );
        Ok(GapFillOutcome::Filled {
            reactions: added,
            metabolites,
        })
    }

    fn added_id(reaction: &Reaction) -> String {
        format!("{}_added", reaction.id)
    }

    /// Cost of adding each candidate
    ///
    /// Blind mode costs every candidate 1. Otherwise each candidate costs 1 plus a penalty
    /// in [0, 1] (1 for the lowest scored or unscored) divided by the number of candidates
    /// plus one, so the size of the addition always dominates and scores only break ties.
    fn candidate_costs(&self, candidates: &[&Reaction]) -> IndexMap<String, f64> {
        let scores = match self.scores {
            Some(scores) if !self.config.gapfill.blind => scores,
            _ => return candidates.iter().map(|r| (r.id.clone(), 1.)).collect(),
        };
        let scored: IndexMap<&str, f64> = candidates
            .iter()
            .filter(|r| scores.has_evidence(&r.id))
            .filter_map(|r| scores.get(&r.id).map(|s| (r.id.as_str(), s)))
            .collect();
        let min = scored.values().copied().fold(f64::INFINITY, f64::min);
        let max = scored.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let scale = (candidates.len() + 1) as f64;
        candidates
            .iter()
            .map(|r| {
                let penalty = match scored.get(r.id.as_str()) {
                    Some(s) if max > min => 1. - (s - min) / (max - min),
                    Some(_) => 0.,
                    None => 1.,
                };
                (r.id.clone(), 1. + penalty / scale)
            })
            .collect()
    }

    fn build_problem(
        &self,
        model: &Model,
        env: &Environment,
        candidates: &[&Reaction],
    ) -> Result<Problem, GapFillError> {
        let biomass = model.biomass_reaction()?;
        let overrides = env.bounds_for(model);
        let universe_exchanges: IndexSet<&str> = self
            .universe
            .exchange_reactions()
            .map(|r| r.id.as_str())
            .collect();
        let costs = self.candidate_costs(candidates);

        let mut problem = Problem::new_minimization();
        for reaction in model.reactions.values() {
            let (mut lower, upper) = overrides
                .get(&reaction.id)
                .copied()
                .unwrap_or((reaction.lower_bound, reaction.upper_bound));
            if reaction.id == biomass {
                lower = lower.max(self.config.gapfill.min_growth);
            }
            if lower > upper {
                return Err(ModelError::InvalidBounds(reaction.id.clone()).into());
            }
            add_flux_variable(&mut problem, &reaction.id, lower, upper)?;
        }
        for reaction in candidates {
            let (lower, upper) = if universe_exchanges.contains(reaction.id.as_str()) {
                env.exchange_bounds(reaction)
            } else {
                (reaction.lower_bound, reaction.upper_bound)
            };
            let added = Self::added_id(reaction);
            add_flux_variable(&mut problem, &reaction.id, lower.min(0.), upper.max(0.))?;
            problem.add_variable(Variable::binary(&added))?;
            problem.add_new_linear_objective_term_by_id(&added, costs[&reaction.id])?;
            // lb y <= v <= ub y
            problem.add_new_inequality_constraint_by_id(
                &format!("{}_added_lower", reaction.id),
                &[reaction.id.as_str(), added.as_str()],
                &[1., -lower],
                0.,
                f64::INFINITY,
            )?;
            problem.add_new_inequality_constraint_by_id(
                &format!("{}_added_upper", reaction.id),
                &[reaction.id.as_str(), added.as_str()],
                &[1., -upper],
                f64::NEG_INFINITY,
                0.,
            )?;
        }
        add_mass_balance(
            &mut problem,
            model.reactions.values().chain(candidates.iter().copied()),
        )?;
        Ok(problem)
    }
}

/// Errors raised while gap-filling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GapFillError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Unable to check growth: {0}")]
    FluxBalance(#[from] FluxBalanceError),
    #[error("Unable to build gap-filling problem: {0}")]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Gap-filling problem for medium {medium} ended with status {status:?}")]
    Unsolved {
        medium: String,
        status: OptimizationStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::solvers::clarabel::ClarabelSolver;
    use crate::optimize::ProblemSolution;
    use crate::optimize::solvers::microlp::MicrolpSolver;
    use crate::reconstruction::scoring::{score_reactions, GprTable};
    use crate::test_utils::{toy_annotations, toy_configuration, toy_universe};

    fn draft_without(missing: &[&str]) -> Model {
        let universe = toy_universe();
        let keep: IndexSet<String> = universe
            .reactions
            .keys()
            .filter(|id| !missing.contains(&id.as_str()))
            .cloned()
            .collect();
        let mut draft = universe.subset(&keep);
        draft.id = Some("draft".to_string());
        draft
    }

    fn glucose() -> Medium {
        Medium::new("glucose", ["glc", "nh4"])
    }

    fn acetate() -> Medium {
        Medium::new("acetate", ["ac", "co2", "nh4"])
    }

    fn env(medium: &Medium) -> Environment {
        Environment::from_medium(medium, "R_EX_{}_e", 10.)
    }

    #[test]
    fn already_growing_model_needs_nothing() {
        let universe = toy_universe();
        let config = Configuration::default();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = universe.clone();
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .fill(&mut model, &[glucose()], None)
            .unwrap();
        assert_eq!(
            result.outcome("glucose"),
            Some(&GapFillOutcome::Filled {
                reactions: vec![],
                metabolites: vec![]
            })
        );
        assert_eq!(model, universe);
    }

    #[test]
    fn single_medium() {
        let universe = toy_universe();
        let config = Configuration::default();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLCt", "R_NH4t", "R_ACPYR"]);
        assert!(!grows_on(&model, Some(&env(&glucose())), 0.1, 1e-7, &lp).unwrap());

        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .fill(&mut model, &[glucose()], None)
            .unwrap();
        let mut added = result.added_reactions();
        added.sort();
        assert_eq!(added, vec!["R_GLCt", "R_NH4t"]);
        assert!(grows_on(&model, Some(&env(&glucose())), 0.1, 1e-7, &lp).unwrap());
        // Every reaction of the gap-filled model comes from the universe
        assert!(model.reaction_ids().is_subset(&universe.reaction_ids()));
    }

    #[test]
    fn media_are_cumulative() {
        let universe = toy_universe();
        let config = Configuration::default();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLCt", "R_NH4t", "R_ACPYR"]);
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .fill(&mut model, &[glucose(), acetate()], None)
            .unwrap();
        // Ammonium transport was already added for glucose
        assert_eq!(
            result.outcome("acetate"),
            Some(&GapFillOutcome::Filled {
                reactions: vec!["R_ACPYR".to_string()],
                metabolites: vec![]
            })
        );
        assert!(grows_on(&model, Some(&env(&glucose())), 0.1, 1e-7, &lp).unwrap());
        assert!(grows_on(&model, Some(&env(&acetate())), 0.1, 1e-7, &lp).unwrap());
    }

    #[test]
    fn infeasible_medium_is_skipped() {
        let universe = toy_universe();
        let config = Configuration::default();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLCt", "R_NH4t", "R_ACPYR"]);
        let no_carbon = Medium::new("no_carbon", ["nh4"]);
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .fill(&mut model, &[no_carbon, glucose()], None)
            .unwrap();
        assert_eq!(result.infeasible_media(), vec!["no_carbon"]);
        assert_eq!(result.added_reactions().len(), 2);
    }

    #[test]
    fn scores_break_ties() {
        let universe = toy_universe();
        let config = toy_configuration();
        let scores = score_reactions(
            &universe,
            &toy_annotations(),
            &GprTable::new(),
            None,
            &config.scoring,
        )
        .unwrap();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLYC", "R_GLYC2", "R_NH4t"]);
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .with_scores(&scores)
            .fill(&mut model, &[glucose()], None)
            .unwrap();
        let mut added = result.added_reactions();
        added.sort();
        // R_GLYC has gene evidence, R_GLYC2 doesn't
        assert_eq!(added, vec!["R_GLYC", "R_NH4t"]);

        // Blind mode only cares about the number of reactions
        let mut blind = config.clone();
        blind.gapfill.blind = true;
        let mut model = draft_without(&["R_GLYC", "R_GLYC2", "R_NH4t"]);
        let result = GapFiller::new(&universe, &blind, &lp, &milp)
            .with_scores(&scores)
            .fill(&mut model, &[glucose()], None)
            .unwrap();
        assert_eq!(result.added_reactions().len(), 2);
    }

    #[test]
    fn added_reactions_follow_organism_rules() {
        let universe = toy_universe();
        let config = toy_configuration();
        let table = GprTable::from_rules([("R_ACPYR", "g_act")]).unwrap();
        let scores =
            score_reactions(&universe, &toy_annotations(), &table, None, &config.scoring).unwrap();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLCt", "R_NH4t", "R_ACPYR"]);
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .with_scores(&scores)
            .with_gpr_table(&table)
            .fill(&mut model, &[glucose(), acetate()], None)
            .unwrap();
        assert_eq!(result.added_reactions().len(), 3);

        let rule = |id: &str| model.reactions[id].gpr.as_ref().map(|g| g.to_string_id());
        assert_eq!(rule("R_GLCt").as_deref(), Some("orgA_1"));
        assert_eq!(rule("R_NH4t").as_deref(), Some("orgA_4"));
        assert_eq!(rule("R_ACPYR").as_deref(), Some("orgA_6"));
        for gene in ["orgA_1", "orgA_4", "orgA_6"] {
            assert!(model.genes.contains_key(gene), "{} missing", gene);
        }
        assert!(!model.genes.contains_key("g_glct"));
        assert!(!model.genes.contains_key("g_nh4t"));
        assert!(!model.genes.contains_key("g_alt"));

        // With renaming off the table rule is copied as is
        let mut keep_ids = config.clone();
        keep_ids.carving.rename_genes = false;
        let mut model = draft_without(&["R_ACPYR"]);
        GapFiller::new(&universe, &keep_ids, &lp, &milp)
            .with_scores(&scores)
            .with_gpr_table(&table)
            .fill(&mut model, &[acetate()], None)
            .unwrap();
        assert_eq!(
            model.reactions["R_ACPYR"].gpr.as_ref().map(|g| g.to_string_id()).as_deref(),
            Some("g_act")
        );
        assert!(!model.genes.contains_key("g_alt"));
    }

    /// A flux balance solver which never finds growth
    struct NeverGrows;

    impl Solver for NeverGrows {
        fn name(&self) -> &'static str {
            "never_grows"
        }

        fn integer_variable_capable(&self) -> bool {
            false
        }

        fn solve(&self, _problem: &Problem) -> Result<ProblemSolution, SolverError> {
            Ok(ProblemSolution::without_values(OptimizationStatus::Infeasible))
        }
    }

    #[test]
    fn unverified_additions_are_dropped() {
        let universe = toy_universe();
        let config = Configuration::default();
        let milp = MicrolpSolver::default();
        let draft = draft_without(&["R_GLCt", "R_NH4t", "R_ACPYR"]);
        let mut model = draft.clone();
        let result = GapFiller::new(&universe, &config, &NeverGrows, &milp)
            .fill(&mut model, &[glucose()], None)
            .unwrap();
        assert_eq!(result.outcome("glucose"), Some(&GapFillOutcome::Infeasible));
        assert!(result.added_reactions().is_empty());
        assert_eq!(model, draft);
    }

    #[test]
    fn initial_environment_reapplied() {
        let universe = toy_universe();
        let config = Configuration::default();
        let (lp, milp) = (ClarabelSolver::default(), MicrolpSolver::default());
        let mut model = draft_without(&["R_GLCt", "R_EX_glc_e"]);
        let initial = env(&glucose());
        let result = GapFiller::new(&universe, &config, &lp, &milp)
            .fill(&mut model, &[glucose()], Some(&initial))
            .unwrap();
        let mut added = result.added_reactions();
        added.sort();
        assert_eq!(added, vec!["R_EX_glc_e", "R_GLCt"]);
        assert_eq!(model.reactions["R_EX_glc_e"].lower_bound, -10.);
        // Uptake of compounds outside the initial environment is closed
        assert_eq!(model.reactions["R_EX_lac_e"].lower_bound, 0.);
    }

    #[test]
    fn serialized_outcome() {
        let result = GapFillResult {
            media: vec![MediumGapFill {
                medium: "M9".to_string(),
                outcome: GapFillOutcome::Infeasible,
            }],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"media":[{"medium":"M9","outcome":"infeasible"}]}"#);
    }
}
