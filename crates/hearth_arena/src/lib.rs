//! # HEARTH Arena
//!
//! Reference simulation for the host: actors carrying ability-system
//! components fight with the abilities of a data-driven book.
//!
//! - [`ArenaSimulation`] implements [`hearth_host::Simulation`]
//! - [`wire`] defines the command, result, event and snapshot records
//! - `arena_server` runs it on the threaded host with seeded bots

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod simulation;
pub mod wire;

pub use error::Rejection;
pub use simulation::{ArenaSimulation, DEFAULT_BOOK, DEFEATED_TAG};
pub use wire::{
    ArenaCommand, ArenaEvent, ArenaReply, ArenaResult, ArenaSnapshot, CommandEnvelope, EventEnvelope,
};
