//! # HEARTH Host
//!
//! Threaded fixed-step host for a host-authoritative simulation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  send_command   ┌──────────────────────────┐
//! │ producers  │────────────────►│ simulation thread        │
//! └────────────┘                 │  FixedStepClock          │
//!                                │  advance(dt):            │
//!                                │   handle_command × N     │
//! ┌────────────┐  flush_events   │   on_tick                │
//! │ consumer   │◄────────────────│   build_snapshot         │
//! │            │◄── latest ──────│                          │
//! └────────────┘                 └──────────────────────────┘
//! ```
//!
//! The game supplies a [`Simulation`]; this crate never depends on game
//! rules, rendering or transport.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod outcome;
pub mod simulation;
pub mod stats;
pub mod wire;

pub use clock::{ClockStats, FixedStepClock};
pub use config::HostConfig;
pub use error::{ConfigError, ConfigResult, HostError, HostResult, LoopFailure, SimulationError, SimulationResult};
pub use host::{CommandSender, Host, StopOutcome, SubscriptionId, SIMULATION_THREAD_NAME};
pub use outcome::CommandOutcome;
pub use simulation::{OutcomeOf, Simulation};
pub use stats::HostStats;
pub use wire::{
    CommandHeader, CorrelationId, EventHeader, ResultHeader, SnapshotHeader, Tick, TickHeader, WireCommand,
    WireEvent, WireResult, WireSnapshot,
};
