//! Module reconstructing organism specific models from a reaction universe
//!
//! Reactions are scored from gene annotations ([`scoring`]), a minimal well supported
//! subnetwork is carved out of the universe ([`carving`], [`ensemble`]), and the result is
//! gap-filled until it grows on the requested media ([`gapfill`]). [`pipeline`] chains the
//! stages together for one or many genomes.

pub mod carving;
pub mod constraints;
pub mod ensemble;
pub mod gapfill;
pub mod pipeline;
pub mod scoring;
