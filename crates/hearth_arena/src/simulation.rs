//! # Arena Simulation
//!
//! Actors are ability-system components keyed by a sequential id. Commands
//! spawn them, grant and activate abilities from the [`AbilityBook`], and
//! edit loose tags; every tick advances effect timers and marks actors whose
//! health reached zero as defeated.
//!
//! Ordering is deterministic: actors live in a `BTreeMap`, so ticking,
//! candidate lists and snapshots all walk ascending ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use hearth_abilities::{
    AbilityBook, AbilityHandle, AbilityResult, AbilityRuntime, AbilitySystemComponent, ActorId, AttributeId, Tag,
    TargetContext,
};
use hearth_host::{OutcomeOf, Simulation, SimulationError, SimulationResult, SnapshotHeader, Tick};
use tracing::{debug, info};

use crate::error::Rejection;
use crate::wire::{
    ArenaCommand, ArenaEvent, ArenaReply, ArenaResult, ArenaSnapshot, CommandEnvelope, EventEnvelope,
};

/// Ability book compiled into the crate.
pub const DEFAULT_BOOK: &str = include_str!("../data/arena_book.toml");

/// Tag added to actors whose health reached zero.
pub const DEFEATED_TAG: &str = "State.Defeated";

struct Actor {
    name: String,
    asc: Arc<AbilitySystemComponent>,
    defeated: bool,
}

/// Arena rules plugged into the host.
pub struct ArenaSimulation {
    book: AbilityBook,
    runtime: Arc<AbilityRuntime>,
    actors: BTreeMap<ActorId, Actor>,
    next_actor: ActorId,
    defeated_tag: Tag,
}

type Outcome = OutcomeOf<ArenaSimulation>;

impl ArenaSimulation {
    /// Arena using `book` and the built-in calculators and targeting.
    #[must_use]
    pub fn new(book: AbilityBook) -> Self {
        Self {
            book,
            runtime: Arc::new(AbilityRuntime::with_builtins()),
            actors: BTreeMap::new(),
            next_actor: 1,
            defeated_tag: Tag::new(DEFEATED_TAG),
        }
    }

    /// Arena using [`DEFAULT_BOOK`].
    ///
    /// # Errors
    ///
    /// The bundled book failed to parse.
    pub fn with_default_book() -> AbilityResult<Self> {
        Ok(Self::new(AbilityBook::from_toml_str(DEFAULT_BOOK)?))
    }

    /// Live actor count.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Component of `actor`.
    #[must_use]
    pub fn component(&self, actor: ActorId) -> Option<&Arc<AbilitySystemComponent>> {
        self.actors.get(&actor).map(|a| &a.asc)
    }

    /// Whether `actor` exists and has been defeated.
    #[must_use]
    pub fn is_defeated(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_some_and(|a| a.defeated)
    }

    /// The loaded ability book.
    #[must_use]
    pub fn book(&self) -> &AbilityBook {
        &self.book
    }

    fn actor(&self, id: ActorId) -> Result<&Actor, Rejection> {
        self.actors.get(&id).ok_or(Rejection::UnknownActor(id))
    }

    fn spawn(
        &mut self,
        tick: Tick,
        sender_id: i64,
        name: &str,
        health: f32,
        attack_damage: f32,
    ) -> SimulationResult<Outcome> {
        if !health.is_finite() || !attack_damage.is_finite() {
            return Err(SimulationError::Rejected(format!(
                "non-finite attributes for {name}: health {health}, attack damage {attack_damage}"
            )));
        }
        if name.is_empty() {
            return Ok(Outcome::result(reject(tick, sender_id, &Rejection::EmptyName)));
        }

        let id = self.next_actor;
        self.next_actor += 1;

        let asc = Arc::new(AbilitySystemComponent::new(id, Arc::clone(&self.runtime)));
        asc.set(AttributeId::MAX_HEALTH, health);
        asc.set(AttributeId::HEALTH, health);
        asc.set(AttributeId::ATTACK_DAMAGE, attack_damage);
        self.actors.insert(
            id,
            Actor {
                name: name.to_string(),
                asc,
                defeated: false,
            },
        );
        info!(actor = id, name, health, "actor spawned");

        Ok(Outcome::result(ArenaResult::ok(tick, sender_id, ArenaReply::Spawned { actor: id })).with_post_event(
            EventEnvelope::new(
                tick,
                ArenaEvent::ActorSpawned {
                    actor: id,
                    name: name.to_string(),
                },
            ),
        ))
    }

    fn grant(&self, actor: ActorId, ability: &str) -> Result<ArenaReply, Rejection> {
        if ability.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let asc = &self.actor(actor)?.asc;
        let definition = self
            .book
            .ability(ability)
            .ok_or_else(|| Rejection::UnknownAbility(ability.to_string()))?;
        let AbilityHandle(handle) = asc.give_ability(definition);
        debug!(actor, ability, handle, "ability granted");
        Ok(ArenaReply::Granted { actor, handle })
    }

    fn activate(
        &self,
        tick: Tick,
        actor: ActorId,
        handle: u32,
        target: Option<ActorId>,
    ) -> Result<(ArenaReply, EventEnvelope), Rejection> {
        let caster = self.actor(actor)?;
        if caster.defeated {
            return Err(Rejection::Defeated(actor));
        }
        let spec = caster
            .asc
            .ability_spec(AbilityHandle(handle))
            .ok_or(Rejection::UnknownHandle { actor, handle })?;

        let primary = match target {
            Some(id) => Some(Arc::clone(
                &self.actors.get(&id).ok_or(Rejection::UnknownTarget(id))?.asc,
            )),
            None => None,
        };
        let candidates = self
            .actors
            .iter()
            .filter(|(id, other)| **id != actor && !other.defeated)
            .map(|(_, other)| Arc::clone(&other.asc))
            .collect();
        let context = TargetContext { primary, candidates };

        let pending = caster
            .asc
            .try_activate_ability_deferred(AbilityHandle(handle), &context)
            .ok_or(Rejection::NotReady)?;
        let targets = u16::try_from(pending.targets().len()).unwrap_or(u16::MAX);
        pending.apply();

        debug!(actor, ability = %spec.ability.name, targets, "ability activated");
        Ok((
            ArenaReply::Activated { actor, handle, targets },
            EventEnvelope::new(
                tick,
                ArenaEvent::AbilityActivated {
                    actor,
                    ability: spec.ability.name.clone(),
                    target,
                },
            ),
        ))
    }

    fn add_tag(&self, actor: ActorId, tag: &str) -> Result<ArenaReply, Rejection> {
        if tag.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let asc = &self.actor(actor)?.asc;
        let change = asc.add_loose_tag(&Tag::new(tag));
        Ok(ArenaReply::TagChanged {
            actor,
            present: change.total > 0,
        })
    }

    fn remove_tag(&self, actor: ActorId, tag: &str) -> Result<ArenaReply, Rejection> {
        if tag.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let asc = &self.actor(actor)?.asc;
        let tag = Tag::new(tag);
        if asc.tag_counts(&tag).0 == 0 {
            return Err(Rejection::TagNotHeld(tag.name().to_string()));
        }
        let change = asc.remove_loose_tag(&tag);
        Ok(ArenaReply::TagChanged {
            actor,
            present: change.total > 0,
        })
    }

    fn despawn(&mut self, actor: ActorId) -> Result<ArenaReply, Rejection> {
        let removed = self.actors.remove(&actor).ok_or(Rejection::UnknownActor(actor))?;
        removed.asc.dispose();
        info!(actor, name = %removed.name, "actor despawned");
        Ok(ArenaReply::Despawned { actor })
    }
}

fn reject(tick: Tick, sender_id: i64, rejection: &Rejection) -> ArenaResult {
    debug!(tick, sender_id, %rejection, "command rejected");
    ArenaResult::rejected(tick, sender_id, rejection.to_string())
}

fn answer(tick: Tick, sender_id: i64, reply: Result<ArenaReply, Rejection>) -> ArenaResult {
    match reply {
        Ok(reply) => ArenaResult::ok(tick, sender_id, reply),
        Err(rejection) => reject(tick, sender_id, &rejection),
    }
}

impl Simulation for ArenaSimulation {
    type Command = CommandEnvelope;
    type Output = ArenaResult;
    type Event = EventEnvelope;
    type Snapshot = ArenaSnapshot;

    fn handle_command(&mut self, tick: Tick, command: &CommandEnvelope) -> SimulationResult<Outcome> {
        let sender_id = command.header.sender_id;
        let outcome = match &command.command {
            ArenaCommand::SpawnActor {
                name,
                health,
                attack_damage,
            } => self.spawn(tick, sender_id, name, *health, *attack_damage)?,
            ArenaCommand::GrantAbility { actor, ability } => {
                Outcome::result(answer(tick, sender_id, self.grant(*actor, ability)))
            }
            ArenaCommand::ActivateAbility { actor, handle, target } => {
                match self.activate(tick, *actor, *handle, *target) {
                    Ok((reply, event)) => {
                        Outcome::result(ArenaResult::ok(tick, sender_id, reply)).with_post_event(event)
                    }
                    Err(rejection) => Outcome::result(reject(tick, sender_id, &rejection)),
                }
            }
            ArenaCommand::AddTag { actor, tag } => Outcome::result(answer(tick, sender_id, self.add_tag(*actor, tag))),
            ArenaCommand::RemoveTag { actor, tag } => {
                Outcome::result(answer(tick, sender_id, self.remove_tag(*actor, tag)))
            }
            ArenaCommand::DespawnActor { actor } => {
                let reply = self.despawn(*actor);
                let despawned = reply.is_ok();
                let outcome = Outcome::result(answer(tick, sender_id, reply));
                if despawned {
                    outcome.with_post_event(EventEnvelope::new(tick, ArenaEvent::ActorDespawned { actor: *actor }))
                } else {
                    outcome
                }
            }
        };
        Ok(outcome)
    }

    fn on_tick(&mut self, tick: Tick, dt: f32, events: &mut Vec<EventEnvelope>) -> SimulationResult<()> {
        for (&id, actor) in &mut self.actors {
            let expired = actor.asc.tick(dt);
            if !expired.is_empty() {
                debug!(actor = id, expired = expired.len(), "effects expired");
            }
            if !actor.defeated && actor.asc.get(AttributeId::HEALTH) <= 0.0 {
                actor.defeated = true;
                actor.asc.add_loose_tag(&self.defeated_tag);
                info!(actor = id, name = %actor.name, tick, "actor defeated");
                events.push(EventEnvelope::new(tick, ArenaEvent::ActorDefeated { actor: id }));
            }
        }
        Ok(())
    }

    fn build_snapshot(&self, tick: Tick) -> Option<ArenaSnapshot> {
        Some(ArenaSnapshot {
            header: SnapshotHeader::new(tick),
            actors: self.actors.values().map(|a| a.asc.build_snapshot()).collect(),
        })
    }

    fn error_event(&self, tick: Tick, command: &CommandEnvelope, error: &SimulationError) -> Option<EventEnvelope> {
        Some(EventEnvelope::new(
            tick,
            ArenaEvent::CommandFailed {
                correlation_id: command.header.correlation_id,
                sender_id: command.header.sender_id,
                reason: error.to_string(),
            },
        ))
    }
}
