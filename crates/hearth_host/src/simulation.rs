//! # Simulation Extension Trait
//!
//! The game plugs into the host by implementing [`Simulation`]. Every hook
//! runs on the simulation thread (or the caller of [`crate::Host::advance`])
//! with the simulation lock held.

use crate::error::{SimulationError, SimulationResult};
use crate::outcome::CommandOutcome;
use crate::wire::{Tick, WireCommand, WireEvent, WireResult, WireSnapshot};

/// Outcome type produced by a simulation's command handler.
pub type OutcomeOf<S> = CommandOutcome<<S as Simulation>::Output, <S as Simulation>::Event>;

/// Game-specific rules driven by the host.
///
/// Handlers are expected to be short, CPU-only state transitions. Returning
/// an error (or panicking) from `handle_command` or `on_tick` is contained
/// to that command / tick; a panic from `build_snapshot` ends the loop.
pub trait Simulation: Send + 'static {
    /// Command records accepted from producers.
    type Command: WireCommand;
    /// Result records answering commands.
    type Output: WireResult;
    /// Event records.
    type Event: WireEvent;
    /// Snapshot records.
    type Snapshot: WireSnapshot;

    /// Handles one command during `tick`.
    ///
    /// # Errors
    ///
    /// Unexpected failures. Expected rejections should be a result with
    /// `success = false` instead.
    fn handle_command(&mut self, tick: Tick, command: &Self::Command) -> SimulationResult<OutcomeOf<Self>>;

    /// Advances simulation time by `dt` after all queued commands ran.
    /// Events pushed into `events` are dispatched after the command output
    /// of the same tick, even if the hook then fails.
    ///
    /// # Errors
    ///
    /// Tick failures; logged and isolated to this tick.
    fn on_tick(&mut self, tick: Tick, dt: f32, events: &mut Vec<Self::Event>) -> SimulationResult<()> {
        let _ = (tick, dt, events);
        Ok(())
    }

    /// Builds an independent snapshot of the current state.
    ///
    /// Must not alias live simulation data: the result is read from other
    /// threads without synchronization.
    fn build_snapshot(&self, tick: Tick) -> Option<Self::Snapshot>;

    /// Converts a failed command into an event for consumers. Default none.
    fn error_event(&self, tick: Tick, command: &Self::Command, error: &SimulationError) -> Option<Self::Event> {
        let _ = (tick, command, error);
        None
    }
}
