//! Storage for BuenaVista.
//!
//! This crate provides the storage abstraction for users, locations and
//! comments. The document database used in production is an external
//! collaborator; the in-memory store implements the same contract for
//! single-process deployments and tests.

mod error;
mod memory;
mod traits;

pub use error::*;
pub use memory::*;
pub use traits::*;
