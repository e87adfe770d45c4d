//! # Ability Error Types
//!
//! Errors raised while loading ability and effect definitions.
//!
//! Runtime gameplay failures (blocked effects, abilities on cooldown,
//! missing targets) are not errors; they are plain `false` / `Blocked`
//! returns.

use thiserror::Error;

/// Errors that can occur while building an [`crate::AbilityBook`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbilityError {
    /// The balance file could not be read.
    #[error("failed to read ability book: {0}")]
    Io(String),

    /// The balance document is not valid TOML or does not match the schema.
    #[error("invalid ability book: {0}")]
    Parse(String),

    /// An ability references an effect that was never defined.
    #[error("ability {ability} references unknown effect {effect}")]
    UnknownEffect {
        /// Ability doing the referencing.
        ability: String,
        /// Missing effect name.
        effect: String,
    },

    /// Two definitions share a name.
    #[error("duplicate definition: {0}")]
    Duplicate(String),

    /// A definition is internally inconsistent.
    #[error("invalid definition {name}: {reason}")]
    InvalidDefinition {
        /// Definition name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<toml::de::Error> for AbilityError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for ability definition loading.
pub type AbilityResult<T> = Result<T, AbilityError>;
