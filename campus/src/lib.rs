//! Campus application services built on top of `campus-discovery`: a remote
//! log sink, a grade-tracking API, and the teacher portal. Each binary under
//! `src/bin/` wires one service into the registry.

pub mod config;
pub mod grading;
pub mod logging;
pub mod logsink;
pub mod portal;
