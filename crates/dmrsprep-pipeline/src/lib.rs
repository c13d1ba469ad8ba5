#![forbid(unsafe_code)]
//! dmrsprep-pipeline library.
//!
//! The graph transformation stages of the DMRS preprocessing pipeline and
//! the orchestrator that sequences them. Each stage reads and writes the
//! same in-memory [`dmrsprep_core::Graph`] in a single synchronous pass;
//! stages are independently toggleable and only [`pipeline`] knows their
//! order.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` at I/O seams and
//!   [`dmrsprep_core::DmrsError`] for per-graph failures.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod align;
pub mod connectivity;
pub mod cycle;
pub mod filter_gpred;
pub mod label;
pub mod ltop;
pub mod map_tokens;
pub mod mt_prep;
pub mod pipeline;
pub mod unknown;

pub use cycle::CycleCounters;
pub use pipeline::{Options, process};
