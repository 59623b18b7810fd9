//! This module provides the Gene struct, representing a gene, and the Gpr enum, representing a
//! gene protein reaction rule
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};

/// Structure Representing a Gene
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    pub id: String,
    /// Human Readable Gene Name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Notes about the gene
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Gene {
    /// Create a gene with only an id
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            notes: None,
            annotation: None,
        }
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Hash for Gene {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Representation of a Gene Protein Reaction Rule as an AST
///
/// `And` and `Or` nodes are n-ary, nested nodes of the same kind are flattened when built
/// through [`Gpr::and`] and [`Gpr::or`].
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// A terminal gene node, holding the gene id
    Gene(String),
    /// All children are required (e.g. subunits of a complex)
    And(Vec<Gpr>),
    /// Any child is sufficient (e.g. isozymes)
    Or(Vec<Gpr>),
}

/// Types of Allowed GPR Operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
}

impl Gpr {
    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::Gene(gene.to_string())
    }

    /// Create a new binary operation node, flattening nested operations of the same type
    pub fn new_binary_operation(left: Gpr, operator: GprOperatorType, right: Gpr) -> Gpr {
        match operator {
            GprOperatorType::And => Gpr::and(vec![left, right]),
            GprOperatorType::Or => Gpr::or(vec![left, right]),
        }
    }

    /// Create an AND node over `children`
    ///
    /// Nested AND children are merged into this node, and a single child is returned as is.
    pub fn and(children: Vec<Gpr>) -> Gpr {
        Self::flatten(children, GprOperatorType::And)
    }

    /// Create an OR node over `children`
    ///
    /// Nested OR children are merged into this node, and a single child is returned as is.
    pub fn or(children: Vec<Gpr>) -> Gpr {
        Self::flatten(children, GprOperatorType::Or)
    }

    fn flatten(children: Vec<Gpr>, operator: GprOperatorType) -> Gpr {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match (child, operator) {
                (Gpr::And(inner), GprOperatorType::And) | (Gpr::Or(inner), GprOperatorType::Or) => {
                    flat.extend(inner)
                }
                (other, _) => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        match operator {
            GprOperatorType::And => Gpr::And(flat),
            GprOperatorType::Or => Gpr::Or(flat),
        }
    }

    /// Ids of the genes referenced by the rule, in order of first appearance
    pub fn genes(&self) -> IndexSet<String> {
        let mut genes = IndexSet::new();
        self.collect_genes(&mut genes);
        genes
    }

    fn collect_genes(&self, genes: &mut IndexSet<String>) {
        match self {
            Gpr::Gene(g) => {
                genes.insert(g.clone());
            }
            Gpr::And(children) | Gpr::Or(children) => {
                children.iter().for_each(|c| c.collect_genes(genes));
            }
        }
    }

    /// Evaluate the rule numerically against per-gene scores
    ///
    /// AND takes the minimum of its children (a complex is only as well supported as its
    /// weakest subunit) and OR takes the sum (isozyme evidence accumulates). Genes missing from
    /// `gene_scores` are absent: an AND with an absent child is absent, an OR ignores absent
    /// children and is only absent if all of them are. `None` means no evidence.
    ///
    /// # Examples
    /// ```rust
    /// use indexmap::IndexMap;
    /// use carvers_core::metabolic_model::gene::Gpr;
    /// let rule = Gpr::or(vec![
    ///     Gpr::and(vec![Gpr::new_gene_node("a"), Gpr::new_gene_node("b")]),
    ///     Gpr::new_gene_node("c"),
    /// ]);
    /// let scores = IndexMap::from([
    ///     ("a".to_string(), 40.),
    ///     ("b".to_string(), 10.),
    ///     ("c".to_string(), 5.),
    /// ]);
    /// assert_eq!(rule.score(&scores), Some(15.));
    /// ```
    pub fn score(&self, gene_scores: &IndexMap<String, f64>) -> Option<f64> {
        match self {
            Gpr::Gene(g) => gene_scores.get(g).copied(),
            Gpr::And(children) => {
                let mut min: Option<f64> = None;
                for child in children {
                    let s = child.score(gene_scores)?;
                    min = Some(min.map_or(s, |m| m.min(s)));
                }
                min
            }
            Gpr::Or(children) => children
                .iter()
                .filter_map(|c| c.score(gene_scores))
                .fold(None, |acc, s| Some(acc.unwrap_or(0.) + s)),
        }
    }

    /// Rewrite the gene ids of the rule using `mapping`
    ///
    /// Genes without an entry in `mapping` are dropped, operation nodes left without children
    /// are dropped as well, returns None if nothing remains.
    pub fn rename_genes(&self, mapping: &IndexMap<String, String>) -> Option<Gpr> {
        match self {
            Gpr::Gene(g) => mapping.get(g).map(|new_id| Gpr::Gene(new_id.clone())),
            Gpr::And(children) => {
                let kept: Vec<Gpr> = children
                    .iter()
                    .filter_map(|c| c.rename_genes(mapping))
                    .collect();
                (!kept.is_empty()).then(|| Gpr::and(kept))
            }
            Gpr::Or(children) => {
                let mut kept: Vec<Gpr> = Vec::new();
                for child in children.iter().filter_map(|c| c.rename_genes(mapping)) {
                    // Several reference genes can map onto the same organism gene
                    if !kept.contains(&child) {
                        kept.push(child);
                    }
                }
                (!kept.is_empty()).then(|| Gpr::or(kept))
            }
        }
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Gene(g) => g.clone(),
            Gpr::And(children) => Self::join(children, " and "),
            Gpr::Or(children) => Self::join(children, " or "),
        }
    }

    fn join(children: &[Gpr], separator: &str) -> String {
        let parts: Vec<String> = children.iter().map(|c| c.to_string_id()).collect();
        format!("({})", parts.join(separator))
    }
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> IndexMap<String, f64> {
        IndexMap::from([
            ("g1".to_string(), 120.),
            ("g2".to_string(), 35.5),
            ("g3".to_string(), 80.),
        ])
    }

    #[test]
    fn gene_node() {
        let scores = scores();
        assert_eq!(Gpr::new_gene_node("g1").score(&scores), Some(120.));
        assert_eq!(Gpr::new_gene_node("missing").score(&scores), None);
    }

    #[test]
    fn and_node_is_minimum() {
        let scores = scores();
        let rule = Gpr::and(vec![
            Gpr::new_gene_node("g1"),
            Gpr::new_gene_node("g2"),
            Gpr::new_gene_node("g3"),
        ]);
        assert_eq!(rule.score(&scores), Some(35.5));

        // An absent subunit makes the whole complex absent
        let rule = Gpr::and(vec![Gpr::new_gene_node("g1"), Gpr::new_gene_node("missing")]);
        assert_eq!(rule.score(&scores), None);
    }

    #[test]
    fn or_node_is_sum() {
        let scores = scores();
        let rule = Gpr::or(vec![
            Gpr::new_gene_node("g1"),
            Gpr::new_gene_node("g2"),
            Gpr::new_gene_node("g3"),
        ]);
        assert!((rule.score(&scores).unwrap() - 235.5).abs() < 1e-12);

        // Absent isozymes add nothing
        let rule = Gpr::or(vec![Gpr::new_gene_node("g2"), Gpr::new_gene_node("missing")]);
        assert_eq!(rule.score(&scores), Some(35.5));

        let rule = Gpr::or(vec![
            Gpr::new_gene_node("missing1"),
            Gpr::new_gene_node("missing2"),
        ]);
        assert_eq!(rule.score(&scores), None);
    }

    #[test]
    fn nested() {
        let scores = scores();
        // (g1 and g2) or (g3 and missing)
        let rule = Gpr::or(vec![
            Gpr::and(vec![Gpr::new_gene_node("g1"), Gpr::new_gene_node("g2")]),
            Gpr::and(vec![Gpr::new_gene_node("g3"), Gpr::new_gene_node("missing")]),
        ]);
        assert_eq!(rule.score(&scores), Some(35.5));
    }

    #[test]
    fn flattening() {
        let rule = Gpr::new_binary_operation(
            Gpr::new_binary_operation(
                Gpr::new_gene_node("a"),
                GprOperatorType::And,
                Gpr::new_gene_node("b"),
            ),
            GprOperatorType::And,
            Gpr::new_gene_node("c"),
        );
        assert_eq!(
            rule,
            Gpr::And(vec![
                Gpr::new_gene_node("a"),
                Gpr::new_gene_node("b"),
                Gpr::new_gene_node("c")
            ])
        );
        assert_eq!(Gpr::or(vec![Gpr::new_gene_node("a")]), Gpr::new_gene_node("a"));
    }

    #[test]
    fn genes_in_order() {
        let rule = Gpr::or(vec![
            Gpr::and(vec![Gpr::new_gene_node("b"), Gpr::new_gene_node("a")]),
            Gpr::new_gene_node("b"),
        ]);
        let genes: Vec<String> = rule.genes().into_iter().collect();
        assert_eq!(genes, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn rename() {
        let rule = Gpr::or(vec![
            Gpr::and(vec![Gpr::new_gene_node("b0001"), Gpr::new_gene_node("b0002")]),
            Gpr::new_gene_node("b0003"),
            Gpr::new_gene_node("b0004"),
        ]);
        let mapping = IndexMap::from([
            ("b0001".to_string(), "orgA_12".to_string()),
            ("b0003".to_string(), "orgA_40".to_string()),
            ("b0004".to_string(), "orgA_40".to_string()),
        ]);
        let renamed = rule.rename_genes(&mapping).unwrap();
        assert_eq!(renamed.to_string_id(), "(orgA_12 or orgA_40)");

        let empty = IndexMap::new();
        assert_eq!(rule.rename_genes(&empty), None);
    }

    #[test]
    fn display() {
        let gene = Gpr::new_gene_node("ActiveGene1");
        assert_eq!(format!("{}", gene), "ActiveGene1");

        let rule = Gpr::or(vec![
            Gpr::and(vec![Gpr::new_gene_node("Rv0001"), Gpr::new_gene_node("Rv0002")]),
            Gpr::new_gene_node("Rv0003"),
        ]);
        assert_eq!(format!("{}", rule), "((Rv0001 and Rv0002) or Rv0003)");
    }
}
