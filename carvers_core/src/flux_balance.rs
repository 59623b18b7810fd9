//! Flux balance analysis, used to check whether a model can grow in an environment
//!
//! Also home to the pieces of problem formulation shared by the reconstruction stages:
//! flux variables and steady state mass balance constraints.
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::metabolic_model::environment::Environment;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

/// Result of maximizing the biomass flux
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSolution {
    pub status: OptimizationStatus,
    /// Optimal biomass flux, None if the problem couldn't be solved
    pub growth: Option<f64>,
    /// Flux of every reaction at the optimum, empty if the problem couldn't be solved
    pub fluxes: IndexMap<String, f64>,
}

/// Add a continuous flux variable for a reaction, with the reaction id as variable id
pub(crate) fn add_flux_variable(
    problem: &mut Problem,
    reaction_id: &str,
    lower_bound: f64,
    upper_bound: f64,
) -> Result<(), ProblemError> {
    problem.add_new_variable(
        reaction_id,
        None,
        VariableType::Continuous,
        lower_bound,
        upper_bound,
    )
}

/// Add a steady state constraint (net production of zero) for every metabolite used by
/// `reactions`, whose flux variables must already be in the problem
pub(crate) fn add_mass_balance<'r, I>(problem: &mut Problem, reactions: I) -> Result<(), ProblemError>
where
    I: IntoIterator<Item = &'r Reaction>,
{
    let mut balances: IndexMap<&str, (Vec<&str>, Vec<f64>)> = IndexMap::new();
    for reaction in reactions {
        for (met, coef) in &reaction.metabolites {
            let (vars, coefs) = balances.entry(met.as_str()).or_default();
            vars.push(reaction.id.as_str());
            coefs.push(*coef);
        }
    }
    for (met, (vars, coefs)) in balances {
        problem.add_new_equality_constraint_by_id(met, &vars, &coefs, 0.)?;
    }
    Ok(())
}

/// Maximize the biomass flux of `model`
///
/// If an environment is given, the exchange bounds it implies replace those of the model
/// for this solve only, the model itself is never modified.
pub fn optimize_biomass(
    model: &Model,
    environment: Option<&Environment>,
    solver: &dyn Solver,
) -> Result<FluxSolution, FluxBalanceError> {
    let biomass = model.biomass_reaction()?;
    let overrides = environment
        .map(|env| env.bounds_for(model))
        .unwrap_or_default();

    let mut problem = Problem::new_maximization();
    for reaction in model.reactions.values() {
        let (lower, upper) = overrides
            .get(&reaction.id)
            .copied()
            .unwrap_or((reaction.lower_bound, reaction.upper_bound));
        add_flux_variable(&mut problem, &reaction.id, lower, upper)?;
    }
    add_mass_balance(&mut problem, model.reactions.values())?;
    problem.add_new_linear_objective_term_by_id(biomass, 1.)?;

    let solution = solver.solve(&problem)?;
    debug!(
        model = model.id.as_deref().unwrap_or(""),
        status = ?solution.status,
        growth = ?solution.objective_value,
        solver = solver.name(),
        "Optimized biomass"
    );
    if !solution.is_optimal() {
        return Ok(FluxSolution {
            status: solution.status,
            growth: None,
            fluxes: IndexMap::new(),
        });
    }
    Ok(FluxSolution {
        status: solution.status,
        growth: solution.value(biomass),
        fluxes: solution.variable_values.unwrap_or_default(),
    })
}

/// Whether `model` reaches a biomass flux of at least `min_growth` (within `tolerance`)
pub fn grows_on(
    model: &Model,
    environment: Option<&Environment>,
    min_growth: f64,
    tolerance: f64,
    solver: &dyn Solver,
) -> Result<bool, FluxBalanceError> {
    let solution = optimize_biomass(model, environment, solver)?;
    Ok(solution
        .growth
        .is_some_and(|growth| growth >= min_growth - tolerance))
}

/// Errors raised during flux balance analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxBalanceError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Unable to build flux balance problem: {0}")]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
