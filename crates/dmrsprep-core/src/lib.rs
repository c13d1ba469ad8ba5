#![forbid(unsafe_code)]
//! dmrsprep-core library.
//!
//! Data model and serialization layer for DMRS (Dependency Minimal
//! Recursion Semantics) graphs, plus the persistent word-map and
//! vocabulary extraction used by the ID-mapping tools.
//!
//! # Conventions
//!
//! - **Errors**: Typed errors live in [`error`]; I/O seams return
//!   `anyhow::Result` with context.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod codec;
pub mod error;
pub mod model;
pub mod vocab;
pub mod wmap;

pub use error::DmrsError;
pub use model::{Edge, Graph, Node, NodeId, Pred, Sortinfo};
