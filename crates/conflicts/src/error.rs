//! Error types for admission.

use graupel_types::TransitionId;
use thiserror::Error;

/// Errors surfaced by [`crate::Conflicts::add`].
///
/// Only malformed transactions fail admission; everything else (duplicate
/// ids, transactions destined for rejection) is accepted and resolved
/// through the normal decision flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddError {
    /// A transition listed itself among its own dependencies.
    #[error("transition {0} depends on itself")]
    SelfReferentialDependency(TransitionId),

    /// Admitting the transition would close a dependency cycle, which the
    /// engine could never make progress on.
    #[error("transition {0} closes a dependency cycle")]
    DependencyCycle(TransitionId),
}
