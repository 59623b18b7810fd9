//! Configuration values consumed by the reconstruction stages
//!
//! Every stage takes the piece of [`Configuration`] it needs as an explicit
//! argument, there is no process wide configuration state.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::solvers::SolverBackend;

/// Lower flux bound of reactions built without one
pub const DEFAULT_LOWER_BOUND: f64 = -1000.;
/// Upper flux bound of reactions built without one
pub const DEFAULT_UPPER_BOUND: f64 = 1000.;

/// Top level configuration for a reconstruction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Absolute tolerance used when comparing fluxes and indicator values
    pub tolerance: f64,
    /// Number of worker threads used when reconstructing several genomes,
    /// 0 leaves the choice to rayon
    pub processes: usize,
    /// Template turning a compound id into its exchange reaction id, `{}` is
    /// replaced by the compound id
    pub exchange_format: String,
    /// Solver used for continuous (flux balance) problems
    pub lp_solver: SolverBackend,
    /// Solver used for carving, ensemble and gap-filling problems
    pub milp_solver: SolverBackend,
    /// Reaction scoring options
    pub scoring: ScoringConfig,
    /// Carving options
    pub carving: CarvingConfig,
    /// Gap-filling options
    pub gapfill: GapFillConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            tolerance: 1e-07,
            processes: 0,
            exchange_format: "R_EX_{}_e".to_string(),
            lp_solver: SolverBackend::Clarabel,
            milp_solver: SolverBackend::Microlp,
            scoring: ScoringConfig::default(),
            carving: CarvingConfig::default(),
            gapfill: GapFillConfig::default(),
        }
    }
}

impl Configuration {
    /// Read a configuration from a JSON string, missing fields take their default value
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::configuration::Configuration;
    /// let config = Configuration::from_json_str(r#"{"gapfill": {"max_uptake": 20.0}}"#).unwrap();
    /// assert_eq!(config.gapfill.max_uptake, 20.0);
    /// assert_eq!(config.carving.min_growth, 0.1);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: Configuration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration values are usable
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.tolerance <= 0. {
            return Err(ConfigurationError::Invalid(
                "tolerance must be positive".to_string(),
            ));
        }
        if !self.exchange_format.contains("{}") {
            return Err(ConfigurationError::Invalid(format!(
                "exchange_format `{}` has no `{{}}` placeholder",
                self.exchange_format
            )));
        }
        if let Normalization::MinMax { lower, upper } = self.scoring.normalization {
            if lower > upper {
                return Err(ConfigurationError::Invalid(
                    "min-max normalization range is inverted".to_string(),
                ));
            }
        }
        let lowest_normalized = self.scoring.normalization.lowest_score();
        if self.scoring.absent_score >= lowest_normalized {
            return Err(ConfigurationError::Invalid(format!(
                "absent_score {} must be below the lowest normalized score {}",
                self.scoring.absent_score, lowest_normalized
            )));
        }
        if self.carving.min_growth <= 0. || self.gapfill.min_growth <= 0. {
            return Err(ConfigurationError::Invalid(
                "min_growth must be positive".to_string(),
            ));
        }
        if self.carving.epsilon <= 0. {
            return Err(ConfigurationError::Invalid(
                "carving epsilon must be positive".to_string(),
            ));
        }
        if self.gapfill.max_uptake < 0. {
            return Err(ConfigurationError::Invalid(
                "max_uptake can't be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for turning gene annotations into reaction scores
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score of reactions without a gene rule that are not exchanges
    pub default_score: f64,
    /// Score of exchange (uptake) reactions without a gene rule
    pub uptake_score: f64,
    /// Score of rule-free reactions named in the soft constraints
    pub soft_score: f64,
    /// Score given to reactions whose rule has no supporting gene evidence
    pub absent_score: f64,
    /// How raw reaction scores are normalized
    pub normalization: Normalization,
    /// Minimum number of reactions with gene evidence needed to carve a model
    pub min_scored_reactions: usize,
    /// Keep the per-gene and per-reaction intermediate scores
    pub debug: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            default_score: -1.0,
            uptake_score: 0.0,
            soft_score: 0.0,
            absent_score: -1.0,
            normalization: Normalization::MaxScaled,
            min_scored_reactions: 10,
            debug: false,
        }
    }
}

/// Normalization applied to the raw scores of reactions with gene evidence
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the largest raw score, mapping scores into `[0, 1]`
    MaxScaled,
    /// Linearly map the smallest raw score to `lower` and the largest to `upper`
    MinMax { lower: f64, upper: f64 },
    /// Divide by the median raw score
    Median,
}

impl Normalization {
    /// Lowest score a reaction with gene evidence can get, raw scores being non-negative
    pub fn lowest_score(&self) -> f64 {
        match self {
            Normalization::MinMax { lower, .. } => *lower,
            Normalization::MaxScaled | Normalization::Median => 0.,
        }
    }
}

/// Options for the carving problem
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarvingConfig {
    /// Minimum flux through the biomass reaction
    pub min_growth: f64,
    /// Minimum absolute flux of a reaction considered present
    pub epsilon: f64,
    /// Optional maintenance reaction (e.g. ATP maintenance) given a minimum flux
    pub maintenance_reaction: Option<String>,
    /// Minimum flux through the maintenance reaction
    pub min_maintenance: f64,
    /// Largest objective penalty spread over the universe order, among otherwise
    /// equal optima fewer and earlier reactions win
    pub tie_break: f64,
    /// Rewrite the rules of carved reactions using the organism's gene ids
    pub rename_genes: bool,
}

impl Default for CarvingConfig {
    fn default() -> Self {
        CarvingConfig {
            min_growth: 0.1,
            epsilon: 1e-3,
            maintenance_reaction: None,
            min_maintenance: 0.1,
            tie_break: 1e-6,
            rename_genes: true,
        }
    }
}

/// Options for gap-filling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillConfig {
    /// Minimum biomass flux the gap-filled model has to reach
    pub min_growth: f64,
    /// Uptake bound applied to every compound of a medium
    pub max_uptake: f64,
    /// Ignore reaction scores and minimize the number of added reactions only
    pub blind: bool,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        GapFillConfig {
            min_growth: 0.1,
            max_uptake: 10.0,
            blind: false,
        }
    }
}

/// Errors in loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Unable to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Configuration::default();
        config.validate().unwrap();
        assert_eq!(config.scoring.default_score, -1.0);
        assert_eq!(config.scoring.uptake_score, 0.0);
        assert_eq!(config.lp_solver, SolverBackend::Clarabel);
    }

    #[test]
    fn partial_json() {
        let config = Configuration::from_json_str(
            r#"{
                "processes": 4,
                "scoring": {"normalization": {"method": "min_max", "lower": 0.5, "upper": 2.0}},
                "carving": {"maintenance_reaction": "R_ATPM"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.processes, 4);
        assert_eq!(
            config.scoring.normalization,
            Normalization::MinMax {
                lower: 0.5,
                upper: 2.0
            }
        );
        assert_eq!(config.carving.maintenance_reaction.as_deref(), Some("R_ATPM"));
        // Untouched sections keep their defaults
        assert_eq!(config.gapfill, GapFillConfig::default());
    }

    #[test]
    fn invalid_json() {
        match Configuration::from_json_str(r#"{"carving": {"min_growth": 0.0}}"#) {
            Err(ConfigurationError::Invalid(_)) => {}
            _ => panic!("Non-positive min_growth not caught"),
        }
        match Configuration::from_json_str(r#"{"exchange_format": "EX_glc"}"#) {
            Err(ConfigurationError::Invalid(_)) => {}
            _ => panic!("Missing placeholder not caught"),
        }
        match Configuration::from_json_str(
            r#"{"scoring": {"normalization": {"method": "min_max", "lower": -5.0, "upper": 1.0}}}"#,
        ) {
            Err(ConfigurationError::Invalid(_)) => {}
            _ => panic!("Evidence scored below absent rules not caught"),
        }
        match Configuration::from_json_str(r#"{"scoring": {"absent_score": 0.5}}"#) {
            Err(ConfigurationError::Invalid(_)) => {}
            _ => panic!("Non-negative absent_score not caught"),
        }
        match Configuration::from_json_str("{not json") {
            Err(ConfigurationError::Parse(_)) => {}
            _ => panic!("Malformed json not caught"),
        }
    }
}
