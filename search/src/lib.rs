//! Recon Search: level-wise bounded beam search over a model lattice.
//!
//! This crate is the search driver. It never computes statistics or
//! lattice neighbors itself; those come from a [`ModelingEngineV1`]
//! implementation. It does NOT depend on `recon_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! recon_search  ←  recon_harness  ←  lock_tests
//! (driver, log)    (engines, bundles, runner)
//! ```
//!
//! # Key types
//!
//! - [`SearchSession`]: one search invocation: setup plus the level loop
//! - [`SearchConfigV1`]: width, level budget, direction, filter, ranking
//! - [`ModelingEngineV1`]: the engine capability interface
//! - [`ReportSinkV1`]: the report accumulator contract
//! - [`SearchLogV1`]: per-level audit trail with the termination reason

#![forbid(unsafe_code)]

pub mod config;
pub mod contract;
pub mod error;
pub mod expand;
pub mod log;
pub mod model;
pub mod model_name;
pub mod pool;
pub mod ranking;
pub mod reclaim;
pub mod search_type;
pub mod select;
pub mod session;


pub use config::{ModelSpec, SearchConfigV1};
pub use contract::{
    ModelHandle, ModelingEngineV1, ReportEntryV1, ReportSinkV1, StatisticGroup, VariableListV1,
};
pub use error::{ConfigParseError, EngineError, SearchError};
pub use log::{SearchLogV1, TerminationReasonV1};
pub use ranking::SortDirection;
pub use session::{SearchOutcomeV1, SearchSession};
