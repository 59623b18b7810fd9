//! Module for reading the textual inputs of a reconstruction
pub mod gpr_parse;
