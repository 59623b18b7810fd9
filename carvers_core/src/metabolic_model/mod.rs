//! Module providing the Model struct for representing a metabolic model, and the pieces
//! (reactions, metabolites, genes, environments) it is made from.

pub mod environment;
pub mod gene;
pub mod metabolite;
pub mod model;
pub mod reaction;
