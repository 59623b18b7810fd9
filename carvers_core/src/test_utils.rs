//! Small hand built networks shared by the unit tests
use indexmap::{IndexMap, IndexSet};

use crate::configuration::Configuration;
use crate::metabolic_model::gene::Gpr;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};
use crate::reconstruction::scoring::AnnotationTable;

pub(crate) fn ids(values: &[&str]) -> IndexSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub(crate) fn reaction(
    id: &str,
    metabolites: &[(&str, f64)],
    bounds: (f64, f64),
    gpr: Option<Gpr>,
) -> Reaction {
    ReactionBuilder::default()
        .id(id)
        .metabolites(
            metabolites
                .iter()
                .map(|(m, c)| (m.to_string(), *c))
                .collect::<IndexMap<String, f64>>(),
        )
        .lower_bound(bounds.0)
        .upper_bound(bounds.1)
        .gpr(gpr)
        .build()
        .unwrap()
}

fn gene(id: &str) -> Option<Gpr> {
    Some(Gpr::new_gene_node(id))
}

/// A toy universe with three routes to pyruvate (from glucose, acetate + CO2, or lactate)
/// and a biomass reaction consuming pyruvate and ammonium
///
/// Exchange reactions allow an uptake of 10 for every compound.
pub(crate) fn toy_universe() -> Model {
    let mut model = Model::new_empty();
    model.id = Some("toy_universe".to_string());
    for compound in ["glc", "ac", "co2", "nh4", "lac"] {
        let met = format!("{}_e", compound);
        model.add_reaction(reaction(
            &format!("R_EX_{}_e", compound),
            &[(met.as_str(), -1.)],
            (-10., 1000.),
            None,
        ));
    }
    let reversible = (-1000., 1000.);
    let irreversible = (0., 1000.);
    model.add_reaction(reaction(
        "R_GLCt",
        &[("glc_e", -1.), ("glc_c", 1.)],
        irreversible,
        gene("g_glct"),
    ));
    model.add_reaction(reaction(
        "R_ACt",
        &[("ac_e", -1.), ("ac_c", 1.)],
        reversible,
        gene("g_act"),
    ));
    model.add_reaction(reaction(
        "R_CO2t",
        &[("co2_e", -1.), ("co2_c", 1.)],
        reversible,
        None,
    ));
    model.add_reaction(reaction(
        "R_NH4t",
        &[("nh4_e", -1.), ("nh4_c", 1.)],
        reversible,
        gene("g_nh4t"),
    ));
    model.add_reaction(reaction(
        "R_GLYC",
        &[("glc_c", -1.), ("pyr_c", 2.)],
        irreversible,
        Some(Gpr::and(vec![
            Gpr::new_gene_node("g_pgi"),
            Gpr::new_gene_node("g_pfk"),
        ])),
    ));
    model.add_reaction(reaction(
        "R_GLYC2",
        &[("glc_c", -1.), ("pyr_c", 2.)],
        irreversible,
        Some(Gpr::or(vec![
            Gpr::new_gene_node("g_iso1"),
            Gpr::new_gene_node("g_iso2"),
        ])),
    ));
    model.add_reaction(reaction(
        "R_ACPYR",
        &[("ac_c", -1.), ("co2_c", -1.), ("pyr_c", 1.)],
        irreversible,
        gene("g_alt"),
    ));
    model.add_reaction(reaction(
        "R_LDH",
        &[("pyr_c", -1.), ("lac_c", 1.)],
        reversible,
        gene("g_ldh"),
    ));
    model.add_reaction(reaction(
        "R_LACt",
        &[("lac_c", -1.), ("lac_e", 1.)],
        reversible,
        None,
    ));
    model.add_reaction(reaction(
        "R_BIOMASS",
        &[("pyr_c", -1.), ("nh4_c", -1.)],
        irreversible,
        None,
    ));
    model.set_objective("R_BIOMASS").unwrap();
    model
}

/// Homology hits of a toy genome against the genes of [`toy_universe`]
///
/// Reference scores (best hit per reference gene) are g_glct 100, g_pgi 80, g_pfk 60,
/// g_nh4t 50, g_ldh 40 and g_act 10. g_iso1, g_iso2 and g_alt have no hit.
pub(crate) fn toy_annotations() -> AnnotationTable {
    AnnotationTable::from_hits([
        ("orgA_1", "g_glct", 100.),
        ("orgA_2", "g_pgi", 80.),
        ("orgA_2", "g_pfk", 30.),
        ("orgA_3", "g_pfk", 60.),
        ("orgA_4", "g_nh4t", 50.),
        ("orgA_5", "g_ldh", 40.),
        ("orgA_6", "g_act", 10.),
        ("orgA_7", "g_unrelated", 500.),
    ])
}

/// Configuration accepting the small amount of evidence the toy genome provides
pub(crate) fn toy_configuration() -> Configuration {
    let mut config = Configuration::default();
    config.scoring.min_scored_reactions = 3;
    config
}
