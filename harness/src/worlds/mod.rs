//! Deterministic modeling engines for the harness runner and lock tests.

pub mod partition_lattice;
pub mod scripted;
