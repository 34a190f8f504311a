//! Conflict set management for transaction consensus.
//!
//! This crate implements the bookkeeping half of a consensus engine that
//! agrees on a set of transactions. It tracks, for every processing
//! transaction, the transition it proposes, the inputs that transition
//! consumes, the transitions it depends on, and the epoch restrictions
//! declared against it. The outer voting protocol asks two questions:
//!
//! - Which tracked transactions conflict with a given transaction? Is it
//!   *virtuous* (conflict free)?
//! - Once a transaction has been selected by the protocol, which
//!   transactions are now finally acceptable and which must be rejected,
//!   honoring dependencies, restrictions, epoch rules, and input
//!   contention?
//!
//! The manager is a synchronous, deterministic state machine: no I/O, no
//! internal parallelism, bounded work per call. Decisions stream out of
//! [`Conflicts::updateable`], which the caller pulls until quiescent.
//! [`SharedConflicts`] wraps the manager in a coarse lock for callers that
//! do not serialize access themselves.

mod error;
mod manager;
mod node;
mod ordered_set;
mod shared;

pub use error::AddError;
pub use manager::Conflicts;
pub use ordered_set::OrderedSet;
pub use shared::SharedConflicts;
