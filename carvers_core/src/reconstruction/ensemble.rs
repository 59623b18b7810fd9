//! Ensembles of alternative carved models
//!
//! Carving is repeated with a growing set of exclusion cuts, each forbidding a reaction
//! selection found before, until the requested size is reached or no further selection
//! satisfies the constraints.
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{info, warn};

use crate::metabolic_model::model::Model;
use crate::reconstruction::carving::{Carver, CarvingError, ExclusionCuts};

/// A population of carved models with pairwise distinct reaction sets
#[derive(Clone, Debug, PartialEq)]
pub struct Ensemble {
    /// Members, in the order they were found
    pub members: Vec<Model>,
    /// Number of members asked for
    pub requested: usize,
}

impl Ensemble {
    /// Number of members actually found
    pub fn found(&self) -> usize {
        self.members.len()
    }

    /// Whether fewer members than requested exist
    pub fn is_partial(&self) -> bool {
        self.found() < self.requested
    }

    /// For every reaction present in at least one member, whether each member contains it
    pub fn presence_matrix(&self) -> IndexMap<String, Vec<bool>> {
        let mut matrix: IndexMap<String, Vec<bool>> = IndexMap::new();
        for member in &self.members {
            for id in member.reactions.keys() {
                matrix.entry(id.clone()).or_insert_with(|| {
                    self.members
                        .iter()
                        .map(|m| m.reactions.contains_key(id))
                        .collect()
                });
            }
        }
        matrix
    }

    /// Fraction of members containing each reaction
    pub fn reaction_frequency(&self) -> IndexMap<String, f64> {
        let n = self.found() as f64;
        self.presence_matrix()
            .into_iter()
            .map(|(id, present)| {
                let count = present.iter().filter(|p| **p).count() as f64;
                (id, count / n)
            })
            .collect()
    }
}

/// Build an ensemble of up to `size` models, named `{model_id}_{k}` with k starting at 1
///
/// Any failure of the first solve is an error. Once a member exists, infeasibility ends the
/// ensemble early and other failures are logged before returning the members found so far.
pub fn build_ensemble(
    carver: &Carver,
    model_id: &str,
    size: usize,
) -> Result<Ensemble, EnsembleError> {
    if size < 2 {
        return Err(EnsembleError::InvalidSize(size));
    }
    let mut cuts = ExclusionCuts::new();
    let mut members = Vec::with_capacity(size);
    while members.len() < size {
        let member_id = format!("{}_{}", model_id, members.len() + 1);
        match carver.solve(&member_id, &cuts) {
            Ok(solution) => {
                cuts.add(solution.selected);
                members.push(solution.model);
            }
            Err(err) if members.is_empty() => return Err(err.into()),
            Err(CarvingError::Infeasible) => break,
            Err(err) => {
                warn!(
                    model = model_id,
                    member = member_id.as_str(),
                    error = %err,
                    "Carving failed, keeping the members found so far"
                );
                break;
            }
        }
    }
    let ensemble = Ensemble {
        members,
        requested: size,
    };
    if ensemble.is_partial() {
        warn!(
            model = model_id,
            requested = size,
            found = ensemble.found(),
            "Fewer alternative models exist than requested"
        );
    }
    info!(model = model_id, found = ensemble.found(), "Built ensemble");
    Ok(ensemble)
}

/// Errors raised while building an ensemble
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("Ensemble size must be greater than 1, got {0}")]
    InvalidSize(usize),
    #[error(transparent)]
    Carving(#[from] CarvingError),
}
