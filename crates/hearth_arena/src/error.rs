//! Arena rejection reasons.
//!
//! These become the `error` text of results with `success = false`. They are
//! expected outcomes, not failures of the simulation.

use hearth_abilities::ActorId;
use thiserror::Error;

/// Why the arena refused a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No actor with this id.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// The explicit target does not exist.
    #[error("unknown target {0}")]
    UnknownTarget(ActorId),

    /// The ability book has no such ability.
    #[error("unknown ability {0}")]
    UnknownAbility(String),

    /// The actor was never granted this handle.
    #[error("actor {actor} has no ability handle {handle}")]
    UnknownHandle {
        /// Actor.
        actor: ActorId,
        /// Handle asked for.
        handle: u32,
    },

    /// Defeated actors cannot act.
    #[error("actor {0} is defeated")]
    Defeated(ActorId),

    /// Gate failed, cooldown running, or no target resolved.
    #[error("ability not ready")]
    NotReady,

    /// `RemoveTag` for a tag without loose references.
    #[error("tag {0} not held")]
    TagNotHeld(String),

    /// Empty actor, ability or tag name.
    #[error("name must not be empty")]
    EmptyName,
}
