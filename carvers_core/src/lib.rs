//! Core rust implementation of Carve.rs, a crate for reconstructing genome scale metabolic
//! models from gene annotations and a universal reaction database.

pub mod configuration;
pub mod flux_balance;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
pub mod reconstruction;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
