//! End to end reconstruction of one or many genomes
use derive_builder::Builder;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::configuration::{Configuration, ConfigurationError};
use crate::flux_balance::{grows_on, FluxBalanceError};
use crate::metabolic_model::environment::{Environment, Medium};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::solvers::Solver;
use crate::reconstruction::carving::{Carver, CarvingError};
use crate::reconstruction::constraints::{HardConstraints, SoftConstraints};
use crate::reconstruction::ensemble::{build_ensemble, EnsembleError};
use crate::reconstruction::gapfill::{GapFillError, GapFillOutcome, GapFillResult, GapFiller};
use crate::reconstruction::scoring::{score_reactions, AnnotationTable, GprTable, ReactionScores, ScoringError};

/// Read-only reference data shared by every reconstruction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct References {
    /// The reaction universe models are carved from
    pub universe: Model,
    /// Gene rules overriding those of the universe's reactions
    pub gpr_table: GprTable,
    /// Media library, keyed by medium name
    pub media: IndexMap<String, Medium>,
}

impl References {
    pub fn new(universe: Model) -> Self {
        References {
            universe,
            ..References::default()
        }
    }

    pub fn with_gpr_table(mut self, gpr_table: GprTable) -> Self {
        self.gpr_table = gpr_table;
        self
    }

    /// Add a medium to the library
    pub fn with_medium(mut self, medium: Medium) -> Self {
        self.media.insert(medium.name.clone(), medium);
        self
    }

    /// Look a medium up by name
    pub fn medium(&self, name: &str) -> Result<&Medium, ReconstructionError> {
        self.media
            .get(name)
            .ok_or_else(|| ReconstructionError::UnknownMedium {
                name: name.to_string(),
                available: self.media.keys().cloned().collect(),
            })
    }
}

/// Everything specific to one genome
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into))]
pub struct GenomeInput {
    /// Id given to the reconstructed model
    pub id: String,
    /// Homology hits of the genome's genes
    pub annotations: AnnotationTable,
    #[builder(default = "None")]
    pub hard_constraints: Option<HardConstraints>,
    #[builder(default = "None")]
    pub soft_constraints: Option<SoftConstraints>,
    /// Name of the medium restricting the exchanges while carving
    #[builder(default = "None")]
    pub initial_medium: Option<String>,
    /// Names of the media to gap-fill for, in order
    #[builder(default = "Vec::new()")]
    pub gapfill_media: Vec<String>,
    /// Build an ensemble of this size instead of a single model
    #[builder(default = "None")]
    pub ensemble_size: Option<usize>,
}

/// Counts describing a reconstruction, meant to be persisted next to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionSummary {
    pub id: String,
    /// Sizes of the (first) model
    pub reactions: usize,
    pub metabolites: usize,
    pub genes: usize,
    pub ensemble: Option<EnsembleSummary>,
    /// Gap-filling of the (first) model
    pub gapfill: Vec<MediumSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    pub requested: usize,
    pub found: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediumSummary {
    pub medium: String,
    /// Whether gap-filling found a solution
    pub feasible: bool,
    pub added_reactions: usize,
    pub added_metabolites: usize,
    /// Whether the final model grows on the medium
    pub grows: bool,
}

/// Models and intermediate results of a reconstruction
#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructionOutput {
    /// The reconstructed model, or every member of the ensemble
    pub models: Vec<Model>,
    pub scores: ReactionScores,
    /// Gap-filling results, one per model
    pub gapfill: Vec<GapFillResult>,
    pub summary: ReconstructionSummary,
}

/// Runs reconstructions with a fixed configuration and solvers
pub struct Reconstruction {
    config: Configuration,
    lp_solver: Box<dyn Solver + Send + Sync>,
    milp_solver: Box<dyn Solver + Send + Sync>,
}

impl Reconstruction {
    /// Create a reconstruction with the solvers named in `config`
    pub fn new(config: Configuration) -> Result<Self, ReconstructionError> {
        config.validate()?;
        Ok(Reconstruction {
            lp_solver: config.lp_solver.build(),
            milp_solver: config.milp_solver.build(),
            config,
        })
    }

    /// Create a reconstruction with explicitly provided solvers
    pub fn with_solvers(
        config: Configuration,
        lp_solver: Box<dyn Solver + Send + Sync>,
        milp_solver: Box<dyn Solver + Send + Sync>,
    ) -> Result<Self, ReconstructionError> {
        config.validate()?;
        Ok(Reconstruction {
            config,
            lp_solver,
            milp_solver,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Reconstruct a single genome: score, carve (or build an ensemble), gap-fill, and check
    /// growth on every gap-filling medium
    pub fn reconstruct(
        &self,
        input: &GenomeInput,
        references: &References,
    ) -> Result<ReconstructionOutput, ReconstructionError> {
        let _span = info_span!("reconstruct", genome = input.id.as_str()).entered();
        let universe = &references.universe;
        universe.check_consistency()?;

        // Resolve every medium up front, before any solving
        let initial_environment = input
            .initial_medium
            .as_deref()
            .map(|name| {
                references.medium(name).map(|medium| {
                    Environment::from_medium(
                        medium,
                        &self.config.exchange_format,
                        self.config.gapfill.max_uptake,
                    )
                })
            })
            .transpose()?;
        let gapfill_media: Vec<Medium> = input
            .gapfill_media
            .iter()
            .map(|name| references.medium(name).cloned())
            .collect::<Result<_, _>>()?;

        let scores = score_reactions(
            universe,
            &input.annotations,
            &references.gpr_table,
            input.soft_constraints.as_ref(),
            &self.config.scoring,
        )?;

        let mut carver = Carver::new(universe, &scores, &self.config, self.milp_solver.as_ref())
            .with_gpr_table(&references.gpr_table);
        if let Some(hard) = &input.hard_constraints {
            carver = carver.with_hard_constraints(hard);
        }
        if let Some(soft) = &input.soft_constraints {
            carver = carver.with_soft_constraints(soft);
        }
        if let Some(env) = &initial_environment {
            carver = carver.with_environment(env);
        }

        let (mut models, ensemble) = match input.ensemble_size {
            Some(size) => {
                let ensemble = build_ensemble(&carver, &input.id, size)?;
                let summary = EnsembleSummary {
                    requested: ensemble.requested,
                    found: ensemble.found(),
                };
                (ensemble.members, Some(summary))
            }
            None => (vec![carver.carve(&input.id)?], None),
        };

        let mut gapfill = Vec::with_capacity(models.len());
        if !gapfill_media.is_empty() {
            let filler = GapFiller::new(
                universe,
                &self.config,
                self.lp_solver.as_ref(),
                self.milp_solver.as_ref(),
            )
            .with_scores(&scores)
            .with_gpr_table(&references.gpr_table);
            for model in models.iter_mut() {
                gapfill.push(filler.fill(model, &gapfill_media, initial_environment.as_ref())?);
            }
        }

        let summary = self.summarize(&input.id, &models, ensemble, &gapfill, &gapfill_media)?;
        info!(
            reactions = summary.reactions,
            metabolites = summary.metabolites,
            genes = summary.genes,
            models = models.len(),
            "Reconstruction finished"
        );
        Ok(ReconstructionOutput {
            models,
            scores,
            gapfill,
            summary,
        })
    }

    fn summarize(
        &self,
        id: &str,
        models: &[Model],
        ensemble: Option<EnsembleSummary>,
        gapfill: &[GapFillResult],
        media: &[Medium],
    ) -> Result<ReconstructionSummary, ReconstructionError> {
        let first = models.first();
        let mut media_summary = Vec::new();
        if let (Some(model), Some(result)) = (first, gapfill.first()) {
            for (medium, filled) in media.iter().zip(&result.media) {
                let env = Environment::from_medium(
                    medium,
                    &self.config.exchange_format,
                    self.config.gapfill.max_uptake,
                );
                let grows = grows_on(
                    model,
                    Some(&env),
                    self.config.gapfill.min_growth,
                    self.config.tolerance,
                    self.lp_solver.as_ref(),
                )?;
                let (feasible, added_reactions, added_metabolites) = match &filled.outcome {
                    GapFillOutcome::Filled {
                        reactions,
                        metabolites,
                    } => (true, reactions.len(), metabolites.len()),
                    GapFillOutcome::Infeasible => (false, 0, 0),
                };
                if feasible && !grows {
                    warn!(medium = medium.name.as_str(), "Gap-filled model doesn't grow");
                }
                media_summary.push(MediumSummary {
                    medium: medium.name.clone(),
                    feasible,
                    added_reactions,
                    added_metabolites,
                    grows,
                });
            }
        }
        Ok(ReconstructionSummary {
            id: id.to_string(),
            reactions: first.map_or(0, |m| m.reactions.len()),
            metabolites: first.map_or(0, |m| m.metabolites.len()),
            genes: first.map_or(0, |m| m.genes.len()),
            ensemble,
            gapfill: media_summary,
        })
    }

    /// Reconstruct many genomes in parallel, one worker per genome
    ///
    /// The number of worker threads comes from `Configuration::processes` (0 lets rayon
    /// decide). A failure only affects its own genome. Results keep the order of `inputs`.
    pub fn reconstruct_all(
        &self,
        inputs: &[GenomeInput],
        references: &References,
    ) -> Result<Vec<(String, Result<ReconstructionOutput, ReconstructionError>)>, ReconstructionError>
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.processes)
            .build()
            .map_err(|e| ReconstructionError::ThreadPool(e.to_string()))?;
        info!(
            genomes = inputs.len(),
            threads = pool.current_num_threads(),
            "Reconstructing genomes"
        );
        let results: Vec<_> = pool.install(|| {
            inputs
                .par_iter()
                .map(|input| {
                    let result = self.reconstruct(input, references);
                    if let Err(err) = &result {
                        warn!(genome = input.id.as_str(), error = %err, "Reconstruction failed");
                    }
                    (input.id.clone(), result)
                })
                .collect()
        });
        Ok(results)
    }
}

/// Errors which end the reconstruction of a genome
#[derive(Error, Debug)]
pub enum ReconstructionError {
    /// A medium name is not in the media library
    #[error("Unknown medium {name}, available media: {}", .available.join(", "))]
    UnknownMedium {
        name: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid universe: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Carving(#[from] CarvingError),
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    GapFill(#[from] GapFillError),
    #[error(transparent)]
    FluxBalance(#[from] FluxBalanceError),
    #[error("Unable to start worker threads: {0}")]
    ThreadPool(String),
}
