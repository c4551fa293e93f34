//! Declarative migrations for the protocol's admin surface: declare which
//! contracts are managed, how tokens are listed, and which strategies are
//! enabled; a reconciliation pass diffs that against the chain and batches
//! the difference into disposable migration units.

pub mod chain;
pub mod cli;
pub mod desired;
pub mod engine;
pub mod model;
pub mod store;
