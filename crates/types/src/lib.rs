//! Core data types for the graupel conflict engine.
//!
//! The conflict engine agrees on a set of transactions, where a transaction
//! binds an identity to a *transition* (the state change it proposes) and an
//! *epoch* (the era it proposes to commit in). This crate holds the plain
//! data vocabulary shared by the engine and its callers:
//!
//! - [`Id`]: opaque 32-byte identifier for txs, transitions, and inputs
//! - [`Status`]: decision state of a transaction
//! - [`Transition`]: immutable state-change descriptor
//! - [`Tx`]: the polymorphic transaction interface consumed by the engine

mod id;
mod status;
mod transition;
mod tx;

pub use id::{HexError, Id, InputId, TransitionId, TxId};
pub use status::Status;
pub use transition::Transition;
pub use tx::{Epoch, Tx};
