//! Carve a context specific model out of the universe
//!
//! Carving is a mixed integer problem over the whole universe. Every reaction gets a flux
//! variable and a binary indicator per direction it can run in, the objective rewards keeping
//! well supported reactions and penalizes the rest, and the network kept has to carry a
//! minimum biomass flux at steady state.
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::configuration::Configuration;
use crate::flux_balance::{add_flux_variable, add_mass_balance};
use crate::metabolic_model::environment::Environment;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::constraint::{Constraint, ConstraintTerm};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::Variable;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use crate::reconstruction::constraints::{Directive, HardConstraints, SoftConstraints};
use crate::reconstruction::scoring::{organism_rule, GprTable, ReactionScores};

/// Reaction selections which later solves are not allowed to repeat
///
/// Each cut holds a previously found set of reactions S and becomes the constraint
/// `sum_{r in S} z_r - sum_{r not in S} z_r <= |S| - 1` over the inclusion indicators z.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExclusionCuts {
    cuts: Vec<IndexSet<String>>,
}

impl ExclusionCuts {
    pub fn new() -> Self {
        ExclusionCuts::default()
    }

    /// Forbid `selection` from being found again
    pub fn add(&mut self, selection: IndexSet<String>) {
        self.cuts.push(selection);
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexSet<String>> {
        self.cuts.iter()
    }
}

/// Outcome of a single carving solve
#[derive(Clone, Debug, PartialEq)]
pub struct CarvingSolution {
    /// The carved model
    pub model: Model,
    /// Ids of the universe reactions which were kept, in universe order
    pub selected: IndexSet<String>,
    /// Objective value of the optimum
    pub objective_value: f64,
}

/// Indicator variable ids of a reaction
struct Indicators {
    forward: Option<String>,
    reverse: Option<String>,
}

impl Indicators {
    fn ids(&self) -> impl Iterator<Item = &str> {
        self.forward.iter().chain(self.reverse.iter()).map(String::as_str)
    }
}

/// Carves models out of a universe for one organism
///
/// Holds references to every input of the carving problem, so repeated solves (as done when
/// building an ensemble) only differ by the [`ExclusionCuts`] they are given.
pub struct Carver<'a> {
    universe: &'a Model,
    scores: &'a ReactionScores,
    config: &'a Configuration,
    solver: &'a dyn Solver,
    hard: Option<&'a HardConstraints>,
    soft: Option<&'a SoftConstraints>,
    environment: Option<&'a Environment>,
    gpr_table: Option<&'a GprTable>,
}

impl<'a> Carver<'a> {
    pub fn new(
        universe: &'a Model,
        scores: &'a ReactionScores,
        config: &'a Configuration,
        solver: &'a dyn Solver,
    ) -> Self {
        Carver {
            universe,
            scores,
            config,
            solver,
            hard: None,
            soft: None,
            environment: None,
            gpr_table: None,
        }
    }

    pub fn with_hard_constraints(mut self, hard: &'a HardConstraints) -> Self {
        self.hard = Some(hard);
        self
    }

    pub fn with_soft_constraints(mut self, soft: &'a SoftConstraints) -> Self {
        self.soft = Some(soft);
        self
    }

    /// Restrict the exchange reactions to an environment before carving
    pub fn with_environment(mut self, environment: &'a Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Gene rules to give the carved reactions, instead of those stored on the universe
    pub fn with_gpr_table(mut self, gpr_table: &'a GprTable) -> Self {
        self.gpr_table = Some(gpr_table);
        self
    }

    /// Objective weight of each universe reaction
    ///
    /// The score (plus any soft constraint delta), minus a tie-break penalty growing with the
    /// position of the reaction in the universe. Among otherwise equal optima this favours
    /// fewer reactions, then reactions listed earlier.
    pub fn weights(&self) -> IndexMap<String, f64> {
        let n = self.universe.reactions.len() as f64;
        self.universe
            .reactions
            .keys()
            .enumerate()
            .map(|(i, id)| {
                let score = self
                    .scores
                    .get(id)
                    .unwrap_or(self.config.scoring.default_score);
                let delta = self.soft.and_then(|s| s.delta(id)).unwrap_or(0.);
                let penalty = self.config.carving.tie_break * (i as f64 + 1.) / n;
                (id.clone(), score + delta - penalty)
            })
            .collect()
    }

    /// Flux bounds of each reaction going into the problem, after the environment, hard
    /// constraints and growth requirements are applied
    fn bounds(&self, biomass: &str) -> IndexMap<String, (f64, f64)> {
        let mut bounds: IndexMap<String, (f64, f64)> = self
            .universe
            .reactions
            .values()
            .map(|r| (r.id.clone(), (r.lower_bound, r.upper_bound)))
            .collect();
        if let Some(env) = self.environment {
            for missing in env.missing_exchanges(self.universe) {
                warn!(reaction = missing.as_str(), "Environment exchange not in universe");
            }
            bounds.extend(env.bounds_for(self.universe));
        }
        if let Some(hard) = self.hard {
            for (id, directive) in &hard.directives {
                match bounds.get_mut(id) {
                    Some(b) if *directive == Directive::ForcedOff => *b = (0., 0.),
                    Some(_) => {}
                    None => warn!(reaction = id.as_str(), "Hard constraint on unknown reaction ignored"),
                }
            }
        }
        if let Some((lower, _)) = bounds.get_mut(biomass) {
            *lower = lower.max(self.config.carving.min_growth);
        }
        if let Some(maintenance) = &self.config.carving.maintenance_reaction {
            match bounds.get_mut(maintenance) {
                Some((lower, _)) => *lower = lower.max(self.config.carving.min_maintenance),
                None => warn!(
                    reaction = maintenance.as_str(),
                    "Maintenance reaction not in universe"
                ),
            }
        }
        bounds
    }

    /// Build the carving problem
    ///
    /// Returns the problem along with the indicator variables of every reaction, or None
    /// when the constraints can already be seen to be contradictory.
    fn build_problem(
        &self,
        cuts: &ExclusionCuts,
    ) -> Result<Option<(Problem, IndexMap<String, Indicators>)>, CarvingError> {
        let biomass = self
            .universe
            .biomass_reaction()
            .map_err(CarvingError::MissingBiomass)?;
        let bounds = self.bounds(biomass);
        if let Some(soft) = self.soft {
            for id in soft.weights.keys() {
                if !self.universe.reactions.contains_key(id) {
                    warn!(reaction = id.as_str(), "Soft constraint on unknown reaction ignored");
                }
            }
        }
        let weights = self.weights();
        let eps = self.config.carving.epsilon;

        let mut problem = Problem::new_maximization();
        let mut indicators: IndexMap<String, Indicators> = IndexMap::new();
        for reaction in self.universe.reactions.values() {
            let id = reaction.id.as_str();
            let (lower, upper) = bounds[id];
            if lower > upper {
                warn!(reaction = id, lower, upper, "Reaction bounds can't be satisfied");
                return Ok(None);
            }
            add_flux_variable(&mut problem, id, lower, upper)?;

            let forward = (upper > 0.).then(|| reaction.get_forward_id());
            let reverse = (lower < 0.).then(|| reaction.get_reverse_id());
            // v - eps f + |lb| b >= 0 and v - ub f + eps b <= 0
            let mut lower_terms = vec![ConstraintTerm::new(id, 1.)];
            let mut upper_terms = vec![ConstraintTerm::new(id, 1.)];
            if let Some(f) = &forward {
                problem.add_variable(Variable::binary(f))?;
                problem.add_new_linear_objective_term_by_id(f, weights[id])?;
                lower_terms.push(ConstraintTerm::new(f, -eps));
                upper_terms.push(ConstraintTerm::new(f, -upper));
            }
            if let Some(b) = &reverse {
                problem.add_variable(Variable::binary(b))?;
                problem.add_new_linear_objective_term_by_id(b, weights[id])?;
                lower_terms.push(ConstraintTerm::new(b, lower.abs()));
                upper_terms.push(ConstraintTerm::new(b, eps));
            }
            let ind = Indicators { forward, reverse };
            if ind.ids().next().is_some() {
                problem.add_constraint(
                    &format!("{}_indicator_lower", id),
                    Constraint::from_terms(lower_terms, 0., f64::INFINITY),
                )?;
                problem.add_constraint(
                    &format!("{}_indicator_upper", id),
                    Constraint::from_terms(upper_terms, f64::NEG_INFINITY, 0.),
                )?;
            }
            if let (Some(f), Some(b)) = (&ind.forward, &ind.reverse) {
                problem.add_new_inequality_constraint_by_id(
                    &format!("{}_one_direction", id),
                    &[f.as_str(), b.as_str()],
                    &[1., 1.],
                    f64::NEG_INFINITY,
                    1.,
                )?;
            }
            if self.hard.and_then(|h| h.get(id)) == Some(Directive::ForcedOn) {
                let ids: Vec<&str> = ind.ids().collect();
                if ids.is_empty() {
                    warn!(reaction = id, "Reaction forced on can't carry flux");
                    return Ok(None);
                }
                problem.add_new_inequality_constraint_by_id(
                    &format!("{}_forced_on", id),
                    &ids,
                    &vec![1.; ids.len()],
                    1.,
                    f64::INFINITY,
                )?;
            }
            indicators.insert(id.to_string(), ind);
        }
        add_mass_balance(&mut problem, self.universe.reactions.values())?;

        for (k, selection) in cuts.iter().enumerate() {
            let terms: Vec<ConstraintTerm> = indicators
                .iter()
                .flat_map(|(id, ind)| {
                    let coef = if selection.contains(id) { 1. } else { -1. };
                    ind.ids()
                        .map(move |var| ConstraintTerm::new(var, coef))
                        .collect::<Vec<_>>()
                })
                .collect();
            problem.add_constraint(
                &format!("exclusion_{}", k),
                Constraint::from_terms(
                    terms,
                    f64::NEG_INFINITY,
                    selection.len() as f64 - 1.,
                ),
            )?;
        }
        Ok(Some((problem, indicators)))
    }

    /// Solve the carving problem with the given exclusion cuts
    pub fn solve(&self, model_id: &str, cuts: &ExclusionCuts) -> Result<CarvingSolution, CarvingError> {
        if !self.solver.integer_variable_capable() {
            return Err(SolverError::IntegerVariablesUnsupported(self.solver.name()).into());
        }
        let Some((problem, indicators)) = self.build_problem(cuts)? else {
            return Err(CarvingError::Infeasible);
        };
        debug!(
            model = model_id,
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            cuts = cuts.len(),
            "Solving carving problem"
        );
        let solution = self.solver.solve(&problem)?;
        match solution.status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => {}
            OptimizationStatus::Infeasible => return Err(CarvingError::Infeasible),
            status => return Err(CarvingError::Unsolved(status)),
        }
        let selected = Self::selected_reactions(&solution, &indicators);
        let model = self.carved_model(model_id, &selected);
        let objective_value = solution.objective_value.unwrap_or_default();
        info!(
            model = model_id,
            reactions = model.reactions.len(),
            metabolites = model.metabolites.len(),
            genes = model.genes.len(),
            objective = objective_value,
            "Carved model"
        );
        Ok(CarvingSolution {
            model,
            selected,
            objective_value,
        })
    }

    /// Carve a single model
    pub fn carve(&self, model_id: &str) -> Result<Model, CarvingError> {
        Ok(self.solve(model_id, &ExclusionCuts::new())?.model)
    }

    fn selected_reactions(
        solution: &ProblemSolution,
        indicators: &IndexMap<String, Indicators>,
    ) -> IndexSet<String> {
        indicators
            .iter()
            .filter(|(_, ind)| {
                ind.ids()
                    .map(|var| solution.value(var).unwrap_or(0.))
                    .sum::<f64>()
                    > 0.5
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Restrict the universe to `selected`, and set up rules, bounds and metadata
    fn carved_model(&self, model_id: &str, selected: &IndexSet<String>) -> Model {
        let mut model = self.universe.subset(selected);
        if let Some(env) = self.environment {
            env.apply(&mut model);
        }
        let best_hits = self
            .config
            .carving
            .rename_genes
            .then_some(&self.scores.best_hits);
        for reaction in model.reactions.values_mut() {
            reaction.gpr = organism_rule(reaction, self.gpr_table, best_hits);
        }
        model.genes = Self::rule_genes(&model, self.universe);
        model.id = Some(model_id.to_string());
        model.notes = Some(format!(
            "Carved from {} ({} of {} reactions)",
            self.universe.id.as_deref().unwrap_or("universe"),
            model.reactions.len(),
            self.universe.reactions.len()
        ));
        model
    }

    /// Genes referenced by the rules of `model`, keeping the records `universe` has for them
    fn rule_genes(model: &Model, universe: &Model) -> IndexMap<String, Gene> {
        model
            .reactions
            .values()
            .filter_map(|r: &Reaction| r.gpr.as_ref())
            .flat_map(|gpr| gpr.genes())
            .map(|id| {
                let gene = universe
                    .genes
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| Gene::new(&id));
                (id, gene)
            })
            .collect()
    }
}

/// Errors raised while carving
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CarvingError {
    /// The universe has no single biomass (objective) reaction
    #[error("Universe has no usable biomass reaction: {0}")]
    MissingBiomass(#[source] ModelError),
    /// No subset of the universe can grow under the given constraints
    #[error("Carving problem is infeasible, the universe can't grow under the given constraints")]
    Infeasible,
    /// The solver stopped without an optimum
    #[error("Carving problem ended with status {0:?}")]
    Unsolved(OptimizationStatus),
    #[error("Unable to build carving problem: {0}")]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
