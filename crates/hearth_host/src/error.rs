//! # Host Error Types
//!
//! Three layers fail differently:
//!
//! - [`SimulationError`]: returned by a simulation's command handler or
//!   tick hook. Isolated per command / per tick; the loop keeps running.
//! - [`LoopFailure`]: anything that escapes those guards. The loop thread
//!   ends and the failure is kept for the owner to inspect.
//! - [`HostError`] / [`ConfigError`]: lifecycle and configuration misuse,
//!   returned to the caller directly.
//!
//! Expected gameplay rejections ("no empty slot", "ability on cooldown")
//! are none of these: they are results with `success = false`.

use std::fmt;

use thiserror::Error;

use crate::wire::Tick;

/// Failure raised by simulation code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The command cannot be handled in the current state.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// Handler or tick logic failed.
    #[error("simulation failure: {0}")]
    Failed(String),

    /// Handler or tick logic panicked; the payload message is kept.
    #[error("simulation panicked: {0}")]
    Panicked(String),
}

/// Result type for simulation hooks.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host was disposed.
    #[error("host has been disposed")]
    Disposed,

    /// A loop thread from an earlier run did not stop within its timeout
    /// and is still alive.
    #[error("previous simulation thread is still running")]
    PreviousLoopAlive,

    /// The OS refused to spawn the loop thread.
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(String),
}

/// Result type for lifecycle operations.
pub type HostResult<T> = Result<T, HostError>;

/// Configuration loading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read host config: {0}")]
    Io(String),

    /// The document is not valid TOML or has wrongly typed fields.
    #[error("invalid host config: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error that terminated the simulation loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopFailure {
    /// Tick during which the loop failed.
    pub tick: Tick,
    /// Panic message.
    pub message: String,
}

impl fmt::Display for LoopFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulation loop failed at tick {}: {}", self.tick, self.message)
    }
}

impl std::error::Error for LoopFailure {}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
