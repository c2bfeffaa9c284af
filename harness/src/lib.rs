//! Recon Harness: deterministic engines, report accumulation, and bundles.
//!
//! The harness runs a search against a [`recon_search::ModelingEngineV1`]
//! implementation and packages the result as a self-contained artifact
//! bundle whose report is bound to the search log by digest.
//!
//! The harness does NOT implement search logic; it delegates to
//! `recon_search`. Engines provide lattice data and statistics only.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bundle;
pub mod bundle_dir;
pub mod digest;
pub mod report;
pub mod runner;
pub mod worlds;
