//! Turn gene level homology evidence into reaction scores
//!
//! Each query gene of the organism carries hits against reference genes of the universe.
//! A reference gene is scored with its best hit, reaction rules are then evaluated with AND
//! as minimum and OR as sum (see [`Gpr::score`]), and the resulting raw scores are
//! normalized so reactions with very different rules are comparable.
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::configuration::{Normalization, ScoringConfig};
use crate::io::gpr_parse::{parse_gpr, GprParseError};
use crate::metabolic_model::gene::{Gene, Gpr};
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;
use crate::reconstruction::constraints::SoftConstraints;

/// A single homology hit of a query gene against a reference gene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Id of the reference gene, as used in the universe's gene rules
    pub reference: String,
    /// Confidence of the match (e.g. an alignment bitscore)
    pub score: f64,
}

/// Homology hits of an organism's genes, keyed by query gene id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTable {
    pub hits: IndexMap<String, Vec<Hit>>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        AnnotationTable::default()
    }

    /// Record a hit of `query` against `reference`
    pub fn add_hit(&mut self, query: &str, reference: &str, score: f64) {
        self.hits.entry(query.to_string()).or_default().push(Hit {
            reference: reference.to_string(),
            score,
        });
    }

    /// Build a table from (query, reference, score) triples
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::reconstruction::scoring::AnnotationTable;
    /// let table = AnnotationTable::from_hits([("q1", "b0001", 120.), ("q2", "b0001", 80.)]);
    /// let (scores, best) = table.reference_scores();
    /// assert_eq!(scores["b0001"], 120.);
    /// assert_eq!(best["b0001"], "q1");
    /// ```
    pub fn from_hits<'a, I>(hits: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let mut table = AnnotationTable::new();
        for (query, reference, score) in hits {
            table.add_hit(query, reference, score);
        }
        table
    }

    /// Best score of each reference gene over all query genes, along with the query gene
    /// which supplied it
    ///
    /// Ties keep the query gene seen first.
    pub fn reference_scores(&self) -> (IndexMap<String, f64>, IndexMap<String, String>) {
        let mut scores: IndexMap<String, f64> = IndexMap::new();
        let mut best_query: IndexMap<String, String> = IndexMap::new();
        for (query, hits) in &self.hits {
            for hit in hits {
                let better = scores
                    .get(&hit.reference)
                    .map_or(true, |current| hit.score > *current);
                if better {
                    scores.insert(hit.reference.clone(), hit.score);
                    best_query.insert(hit.reference.clone(), query.clone());
                }
            }
        }
        (scores, best_query)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Gene rules associated with universe reactions, taking precedence over the rules stored
/// on the reactions themselves
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GprTable {
    pub rules: IndexMap<String, Gpr>,
}

impl GprTable {
    pub fn new() -> Self {
        GprTable::default()
    }

    /// Parse a table of (reaction id, rule string) pairs
    ///
    /// Empty rule strings are skipped.
    pub fn from_rules<I, K, V>(rules: I) -> Result<Self, ScoringError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut genes: IndexMap<String, Gene> = IndexMap::new();
        let mut table = GprTable::new();
        for (reaction, rule) in rules {
            let (reaction, rule) = (reaction.as_ref(), rule.as_ref());
            if rule.trim().is_empty() {
                continue;
            }
            let gpr = parse_gpr(rule, &mut genes).map_err(|source| ScoringError::InvalidRule {
                reaction: reaction.to_string(),
                source,
            })?;
            table.rules.insert(reaction.to_string(), gpr);
        }
        Ok(table)
    }

    /// Rule used for `reaction`, the table entry if there is one
    pub fn rule_for<'a>(&'a self, reaction: &'a Reaction) -> Option<&'a Gpr> {
        self.rules.get(&reaction.id).or(reaction.gpr.as_ref())
    }
}

/// Rule a reaction carries once it is placed in an organism's model
///
/// The [`GprTable`] entry takes precedence over the reaction's own rule. With `best_hits`
/// given, reference genes are then renamed to the organism genes hitting them, and the rule
/// is dropped when none of its genes has a hit.
pub fn organism_rule(
    reaction: &Reaction,
    gpr_table: Option<&GprTable>,
    best_hits: Option<&IndexMap<String, String>>,
) -> Option<Gpr> {
    let rule = match gpr_table {
        Some(table) => table.rule_for(reaction),
        None => reaction.gpr.as_ref(),
    }?;
    match best_hits {
        Some(hits) => rule.rename_genes(hits),
        None => Some(rule.clone()),
    }
}

/// Scores of the universe's reactions for one organism
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReactionScores {
    /// Normalized score for every universe reaction
    pub scores: IndexMap<String, f64>,
    /// Best hit score for every annotated reference gene
    pub gene_scores: IndexMap<String, f64>,
    /// For every annotated reference gene, the query gene with the best hit
    pub best_hits: IndexMap<String, String>,
    /// Reactions whose rule found supporting gene evidence
    pub evidence: IndexSet<String>,
    /// Intermediate values, kept when scoring in debug mode
    pub trace: Option<ScoringTrace>,
}

impl ReactionScores {
    /// Score of a reaction, None if the reaction isn't in the universe
    pub fn get(&self, reaction_id: &str) -> Option<f64> {
        self.scores.get(reaction_id).copied()
    }

    /// Whether the reaction's score comes from gene evidence
    pub fn has_evidence(&self, reaction_id: &str) -> bool {
        self.evidence.contains(reaction_id)
    }
}

/// Debug record of the intermediate scores
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringTrace {
    pub gene_scores: IndexMap<String, f64>,
    pub reactions: IndexMap<String, ReactionTrace>,
}

/// How a single reaction was scored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionTrace {
    /// Rule used, None for rule free reactions
    pub rule: Option<String>,
    /// Raw rule score, None when the rule had no evidence or there was no rule
    pub raw: Option<f64>,
    /// Final score
    pub score: f64,
}

impl ScoringTrace {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Score every reaction of `universe`
///
/// # Parameters
/// - `universe`: the reaction universe
/// - `annotations`: homology hits of the organism's genes
/// - `gpr_table`: rules overriding those stored on the universe's reactions
/// - `soft`: soft constraints, rule free reactions named there get the `soft_score`
/// - `config`: scoring options
///
/// # Returns
/// The score table, or [`ScoringError::InsufficientEvidence`] if fewer than
/// `min_scored_reactions` reactions have supporting evidence
pub fn score_reactions(
    universe: &Model,
    annotations: &AnnotationTable,
    gpr_table: &GprTable,
    soft: Option<&SoftConstraints>,
    config: &ScoringConfig,
) -> Result<ReactionScores, ScoringError> {
    let (gene_scores, best_hits) = annotations.reference_scores();
    let exchanges: IndexSet<&str> = universe
        .exchange_reactions()
        .map(|r| r.id.as_str())
        .collect();
    let ignored = gpr_table
        .rules
        .keys()
        .filter(|id| !universe.reactions.contains_key(*id))
        .count();
    if ignored > 0 {
        debug!(ignored, "Gene rules for reactions outside the universe ignored");
    }

    let mut raw_scores: IndexMap<String, f64> = IndexMap::new();
    let mut rule_genes: IndexSet<&str> = IndexSet::new();
    let mut rules: IndexMap<&str, &Gpr> = IndexMap::new();
    for reaction in universe.reactions.values() {
        if let Some(rule) = gpr_table.rule_for(reaction) {
            rules.insert(reaction.id.as_str(), rule);
            for gene in rule.genes() {
                if let Some((g, _)) = gene_scores.get_key_value(&gene) {
                    rule_genes.insert(g.as_str());
                }
            }
            if let Some(raw) = rule.score(&gene_scores) {
                raw_scores.insert(reaction.id.clone(), raw);
            }
        }
    }

    if raw_scores.len() < config.min_scored_reactions {
        return Err(ScoringError::InsufficientEvidence {
            matched_genes: rule_genes.len(),
            scored_reactions: raw_scores.len(),
            required: config.min_scored_reactions,
        });
    }

    let normalized = normalize(&raw_scores, config.normalization);
    let mut scores = IndexMap::with_capacity(universe.reactions.len());
    for id in universe.reactions.keys() {
        let score = match (rules.contains_key(id.as_str()), normalized.get(id)) {
            (_, Some(score)) => *score,
            (true, None) => config.absent_score,
            (false, None) if exchanges.contains(id.as_str()) => config.uptake_score,
            (false, None) if soft.is_some_and(|s| s.contains(id)) => config.soft_score,
            (false, None) => config.default_score,
        };
        scores.insert(id.clone(), score);
    }

    let trace = config.debug.then(|| ScoringTrace {
        gene_scores: gene_scores.clone(),
        reactions: scores
            .iter()
            .map(|(id, score)| {
                let trace = ReactionTrace {
                    rule: rules.get(id.as_str()).map(|r| r.to_string_id()),
                    raw: raw_scores.get(id).copied(),
                    score: *score,
                };
                (id.clone(), trace)
            })
            .collect(),
    });

    info!(
        matched_genes = rule_genes.len(),
        scored_reactions = raw_scores.len(),
        universe_reactions = universe.reactions.len(),
        "Scored reactions"
    );
    Ok(ReactionScores {
        scores,
        gene_scores,
        best_hits,
        evidence: raw_scores.keys().cloned().collect(),
        trace,
    })
}

/// Normalize raw scores, the result only depends on the multiset of raw values
fn normalize(raw_scores: &IndexMap<String, f64>, normalization: Normalization) -> IndexMap<String, f64> {
    let mut values: Vec<f64> = raw_scores.values().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let (Some(min), Some(max)) = (values.first().copied(), values.last().copied()) else {
        return IndexMap::new();
    };
    let transform: Box<dyn Fn(f64) -> f64> = match normalization {
        Normalization::MaxScaled if max > 0. => Box::new(move |raw| raw / max),
        Normalization::MaxScaled => Box::new(|raw| raw),
        Normalization::MinMax { lower, upper } if max > min => {
            Box::new(move |raw| lower + (raw - min) * (upper - lower) / (max - min))
        }
        // Every reaction is equally supported
        Normalization::MinMax { upper, .. } => Box::new(move |_| upper),
        Normalization::Median => {
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.
            } else {
                values[mid]
            };
            if median > 0. {
                Box::new(move |raw| raw / median)
            } else {
                Box::new(|raw| raw)
            }
        }
    };
    raw_scores
        .iter()
        .map(|(id, raw)| (id.clone(), transform(*raw)))
        .collect()
}

/// Errors raised while scoring reactions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// Too few reactions of the universe are supported by the annotations
    #[error(
        "Insufficient gene evidence: {matched_genes} genes matched, {scored_reactions} reactions \
         scored, at least {required} needed"
    )]
    InsufficientEvidence {
        matched_genes: usize,
        scored_reactions: usize,
        required: usize,
    },
    /// A gene rule could not be parsed
    #[error("Invalid gene rule for reaction {reaction}: {source}")]
    InvalidRule {
        reaction: String,
        source: GprParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{toy_annotations, toy_configuration, toy_universe};

    fn toy_scores(config: &ScoringConfig) -> ReactionScores {
        score_reactions(
            &toy_universe(),
            &toy_annotations(),
            &GprTable::new(),
            None,
            config,
        )
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn best_hit_per_reference() {
        let (scores, best) = toy_annotations().reference_scores();
        assert_eq!(scores["g_pfk"], 60.);
        assert_eq!(best["g_pfk"], "orgA_3");
        assert_eq!(best["g_pgi"], "orgA_2");
        assert!(!scores.contains_key("g_alt"));
    }

    #[test]
    fn and_is_min_or_is_sum() {
        let mut config = toy_configuration().scoring;
        config.debug = true;
        let scores = toy_scores(&config);
        let trace = scores.trace.as_ref().unwrap();
        // R_GLYC is "g_pgi and g_pfk"
        assert_eq!(trace.reactions["R_GLYC"].raw, Some(60.));

        // An OR rule over annotated genes sums them
        let table = GprTable::from_rules([("R_GLYC2", "g_pgi or g_ldh")]).unwrap();
        let scores = score_reactions(&toy_universe(), &toy_annotations(), &table, None, &config)
            .unwrap();
        assert_eq!(scores.trace.unwrap().reactions["R_GLYC2"].raw, Some(120.));
    }

    #[test]
    fn default_policies() {
        let config = toy_configuration().scoring;
        let scores = toy_scores(&config);
        // Max scaled by the largest raw score (R_GLCt, 100)
        assert!(close(scores.get("R_GLCt").unwrap(), 1.));
        assert!(close(scores.get("R_GLYC").unwrap(), 0.6));
        assert!(close(scores.get("R_NH4t").unwrap(), 0.5));
        assert!(close(scores.get("R_ACt").unwrap(), 0.1));
        // Rules without evidence
        assert_eq!(scores.get("R_GLYC2"), Some(config.absent_score));
        assert_eq!(scores.get("R_ACPYR"), Some(config.absent_score));
        // Rule free reactions
        assert_eq!(scores.get("R_EX_glc_e"), Some(config.uptake_score));
        assert_eq!(scores.get("R_CO2t"), Some(config.default_score));
        assert_eq!(scores.get("R_BIOMASS"), Some(config.default_score));
        // Reactions outside the universe have no score
        assert_eq!(scores.get("R_NOT_THERE"), None);
        assert_eq!(scores.evidence.len(), 5);
        assert!(scores.has_evidence("R_LDH"));
    }

    #[test]
    fn soft_score_for_rule_free() {
        let mut config = toy_configuration().scoring;
        config.soft_score = 0.25;
        let soft: SoftConstraints = [("R_CO2t", 1.), ("R_GLCt", 1.)].into_iter().collect();
        let scores = score_reactions(
            &toy_universe(),
            &toy_annotations(),
            &GprTable::new(),
            Some(&soft),
            &config,
        )
        .unwrap();
        assert_eq!(scores.get("R_CO2t"), Some(0.25));
        // Reactions with evidence keep it
        assert!(close(scores.get("R_GLCt").unwrap(), 1.));
    }

    #[test]
    fn gpr_table_takes_precedence() {
        let config = toy_configuration().scoring;
        let table = GprTable::from_rules([
            ("R_CO2t", "g_ldh"),
            ("R_GLCt", "g_iso1"),
            ("R_OUTSIDE", "g_glct"),
        ])
        .unwrap();
        let scores =
            score_reactions(&toy_universe(), &toy_annotations(), &table, None, &config).unwrap();
        // R_GLCt lost its evidence, so g_pgi/g_pfk (60) is now the largest raw score
        assert_eq!(scores.get("R_GLCt"), Some(config.absent_score));
        assert!(close(scores.get("R_GLYC").unwrap(), 1.));
        assert!(close(scores.get("R_CO2t").unwrap(), 40. / 60.));
        assert_eq!(scores.get("R_OUTSIDE"), None);
    }

    #[test]
    fn normalizations() {
        let raw: IndexMap<String, f64> = [("a", 10.), ("b", 20.), ("c", 40.)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let scaled = normalize(&raw, Normalization::MaxScaled);
        assert!(close(scaled["a"], 0.25));
        let min_max = normalize(
            &raw,
            Normalization::MinMax {
                lower: 0.,
                upper: 3.,
            },
        );
        assert!(close(min_max["a"], 0.));
        assert!(close(min_max["b"], 1.));
        assert!(close(min_max["c"], 3.));
        let median = normalize(&raw, Normalization::Median);
        assert!(close(median["c"], 2.));
        // Same input, same output
        assert_eq!(normalize(&raw, Normalization::Median), median);
        assert!(normalize(&IndexMap::new(), Normalization::MaxScaled).is_empty());
    }

    #[test]
    fn insufficient_evidence() {
        let config = ScoringConfig::default();
        let result = score_reactions(
            &toy_universe(),
            &toy_annotations(),
            &GprTable::new(),
            None,
            &config,
        );
        assert_eq!(
            result,
            Err(ScoringError::InsufficientEvidence {
                matched_genes: 6,
                scored_reactions: 5,
                required: 10
            })
        );
    }

    #[test]
    fn organism_rules() {
        let universe = toy_universe();
        let scores = toy_scores(&toy_configuration().scoring);
        let table = GprTable::from_rules([("R_ACPYR", "g_act")]).unwrap();
        let hits = Some(&scores.best_hits);

        let glyc = &universe.reactions["R_GLYC"];
        assert_eq!(
            organism_rule(glyc, Some(&table), hits).unwrap().to_string_id(),
            "(orgA_2 and orgA_3)"
        );
        assert_eq!(organism_rule(glyc, None, None), glyc.gpr.clone());

        // The table wins over the universe's own rule, before renaming
        let acpyr = &universe.reactions["R_ACPYR"];
        assert_eq!(
            organism_rule(acpyr, Some(&table), hits),
            Some(Gpr::new_gene_node("orgA_6"))
        );
        assert_eq!(
            organism_rule(acpyr, Some(&table), None),
            Some(Gpr::new_gene_node("g_act"))
        );
        // No organism gene hits g_alt
        assert_eq!(organism_rule(acpyr, None, hits), None);
    }

    #[test]
    fn invalid_rule() {
        match GprTable::from_rules([("R_A", "g1 and (g2 or")]) {
            Err(ScoringError::InvalidRule { reaction, .. }) => assert_eq!(reaction, "R_A"),
            other => panic!("Invalid rule not caught: {:?}", other),
        }
    }

    #[test]
    fn trace_to_json() {
        let mut config = toy_configuration().scoring;
        config.debug = true;
        let json = toy_scores(&config).trace.unwrap().to_json().unwrap();
        let trace: ScoringTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(trace.reactions["R_GLYC"].rule.as_deref(), Some("(g_pgi and g_pfk)"));
    }
}
