//! # Arena Wire Records
//!
//! Every record is a host header followed by a one-byte variant tag and the
//! variant's fields:
//!
//! ```text
//! command:  CommandHeader  tag:u8  fields...
//! result:   ResultHeader   tag:u8  fields...
//! event:    EventHeader    tag:u8  fields...
//! snapshot: SnapshotHeader count:u16 AscSnapshot*
//! ```
//!
//! Optional actor ids are `present:u8 id:u64` (the id is zero when absent).

use hearth_abilities::{ActorId, AscSnapshot};
use hearth_core::{str_size, ByteReader, ByteSerializable, ByteWriter, CodecError, CodecResult};
use hearth_host::{
    CommandHeader, CorrelationId, EventHeader, ResultHeader, SnapshotHeader, Tick, WireCommand, WireEvent,
    WireResult, WireSnapshot,
};

const OPTIONAL_ACTOR_SIZE: usize = 1 + 8;

fn write_optional_actor(out: &mut ByteWriter<'_>, actor: Option<ActorId>) -> CodecResult<()> {
    out.write_bool(actor.is_some())?;
    out.write_u64(actor.unwrap_or(0))
}

fn read_optional_actor(input: &mut ByteReader<'_>) -> CodecResult<Option<ActorId>> {
    let present = input.read_bool()?;
    let actor = input.read_u64()?;
    Ok(present.then_some(actor))
}

// =============================================================================
// COMMANDS
// =============================================================================

/// What a producer asks the arena to do.
#[derive(Clone, Debug, PartialEq)]
pub enum ArenaCommand {
    /// Creates an actor with starting attributes.
    SpawnActor {
        /// Display name.
        name: String,
        /// Starting (and maximum) health.
        health: f32,
        /// Attack damage used by damage calculators.
        attack_damage: f32,
    },
    /// Grants an ability from the arena's book.
    GrantAbility {
        /// Receiving actor.
        actor: ActorId,
        /// Ability name in the book.
        ability: String,
    },
    /// Activates a granted ability.
    ActivateAbility {
        /// Caster.
        actor: ActorId,
        /// Handle returned by `GrantAbility`.
        handle: u32,
        /// Explicit target, if any.
        target: Option<ActorId>,
    },
    /// Adds one loose reference to a tag.
    AddTag {
        /// Actor.
        actor: ActorId,
        /// Tag name.
        tag: String,
    },
    /// Removes one loose reference to a tag.
    RemoveTag {
        /// Actor.
        actor: ActorId,
        /// Tag name.
        tag: String,
    },
    /// Removes an actor.
    DespawnActor {
        /// Actor.
        actor: ActorId,
    },
}

impl ArenaCommand {
    const fn tag(&self) -> u8 {
        match self {
            Self::SpawnActor { .. } => 0,
            Self::GrantAbility { .. } => 1,
            Self::ActivateAbility { .. } => 2,
            Self::AddTag { .. } => 3,
            Self::RemoveTag { .. } => 4,
            Self::DespawnActor { .. } => 5,
        }
    }

    /// Decodes a payload.
    ///
    /// # Errors
    ///
    /// Short input, invalid UTF-8 or an unknown variant tag.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(match input.read_u8()? {
            0 => Self::SpawnActor {
                name: input.read_str()?.to_string(),
                health: input.read_f32()?,
                attack_damage: input.read_f32()?,
            },
            1 => Self::GrantAbility {
                actor: input.read_u64()?,
                ability: input.read_str()?.to_string(),
            },
            2 => Self::ActivateAbility {
                actor: input.read_u64()?,
                handle: input.read_u32()?,
                target: read_optional_actor(input)?,
            },
            3 => Self::AddTag {
                actor: input.read_u64()?,
                tag: input.read_str()?.to_string(),
            },
            4 => Self::RemoveTag {
                actor: input.read_u64()?,
                tag: input.read_str()?.to_string(),
            },
            5 => Self::DespawnActor {
                actor: input.read_u64()?,
            },
            value => {
                return Err(CodecError::UnknownVariant {
                    kind: "ArenaCommand",
                    value,
                })
            }
        })
    }
}

impl ByteSerializable for ArenaCommand {
    fn size_of(&self) -> usize {
        1 + match self {
            Self::SpawnActor { name, .. } => str_size(name) + 4 + 4,
            Self::GrantAbility { ability, .. } => 8 + str_size(ability),
            Self::ActivateAbility { .. } => 8 + 4 + OPTIONAL_ACTOR_SIZE,
            Self::AddTag { tag, .. } | Self::RemoveTag { tag, .. } => 8 + str_size(tag),
            Self::DespawnActor { .. } => 8,
        }
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_u8(self.tag())?;
        match self {
            Self::SpawnActor {
                name,
                health,
                attack_damage,
            } => {
                out.write_str(name)?;
                out.write_f32(*health)?;
                out.write_f32(*attack_damage)
            }
            Self::GrantAbility { actor, ability } => {
                out.write_u64(*actor)?;
                out.write_str(ability)
            }
            Self::ActivateAbility { actor, handle, target } => {
                out.write_u64(*actor)?;
                out.write_u32(*handle)?;
                write_optional_actor(out, *target)
            }
            Self::AddTag { actor, tag } | Self::RemoveTag { actor, tag } => {
                out.write_u64(*actor)?;
                out.write_str(tag)
            }
            Self::DespawnActor { actor } => out.write_u64(*actor),
        }
    }
}

/// Command record: header + payload.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandEnvelope {
    /// Correlation and sender.
    pub header: CommandHeader,
    /// What to do.
    pub command: ArenaCommand,
}

impl CommandEnvelope {
    /// Wraps a command.
    #[must_use]
    pub fn new(correlation_id: CorrelationId, sender_id: i64, command: ArenaCommand) -> Self {
        Self {
            header: CommandHeader::new(correlation_id, sender_id),
            command,
        }
    }

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// As [`ArenaCommand::read_from`].
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            header: CommandHeader::read_from(input)?,
            command: ArenaCommand::read_from(input)?,
        })
    }
}

impl ByteSerializable for CommandEnvelope {
    fn size_of(&self) -> usize {
        CommandHeader::SIZE + self.command.size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        self.command.write_to(out)
    }
}

impl WireCommand for CommandEnvelope {
    fn header(&self) -> &CommandHeader {
        &self.header
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Successful command payloads. Failed commands carry [`ArenaReply::None`]
/// and the reason in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaReply {
    /// No payload.
    None,
    /// Actor created.
    Spawned {
        /// New actor id.
        actor: ActorId,
    },
    /// Ability granted.
    Granted {
        /// Actor.
        actor: ActorId,
        /// Handle for `ActivateAbility`.
        handle: u32,
    },
    /// Ability activated.
    Activated {
        /// Caster.
        actor: ActorId,
        /// Handle used.
        handle: u32,
        /// Number of components the ability's effects reached.
        targets: u16,
    },
    /// Tag reference added or removed.
    TagChanged {
        /// Actor.
        actor: ActorId,
        /// Whether the tag is present afterwards.
        present: bool,
    },
    /// Actor removed.
    Despawned {
        /// Actor.
        actor: ActorId,
    },
}

impl ArenaReply {
    const fn tag(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Spawned { .. } => 1,
            Self::Granted { .. } => 2,
            Self::Activated { .. } => 3,
            Self::TagChanged { .. } => 4,
            Self::Despawned { .. } => 5,
        }
    }

    /// Decodes a payload.
    ///
    /// # Errors
    ///
    /// Short input or an unknown variant tag.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(match input.read_u8()? {
            0 => Self::None,
            1 => Self::Spawned {
                actor: input.read_u64()?,
            },
            2 => Self::Granted {
                actor: input.read_u64()?,
                handle: input.read_u32()?,
            },
            3 => Self::Activated {
                actor: input.read_u64()?,
                handle: input.read_u32()?,
                targets: input.read_u16()?,
            },
            4 => Self::TagChanged {
                actor: input.read_u64()?,
                present: input.read_bool()?,
            },
            5 => Self::Despawned {
                actor: input.read_u64()?,
            },
            value => {
                return Err(CodecError::UnknownVariant {
                    kind: "ArenaReply",
                    value,
                })
            }
        })
    }
}

impl ByteSerializable for ArenaReply {
    fn size_of(&self) -> usize {
        1 + match self {
            Self::None => 0,
            Self::Spawned { .. } | Self::Despawned { .. } => 8,
            Self::Granted { .. } => 8 + 4,
            Self::Activated { .. } => 8 + 4 + 2,
            Self::TagChanged { .. } => 8 + 1,
        }
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_u8(self.tag())?;
        match self {
            Self::None => Ok(()),
            Self::Spawned { actor } | Self::Despawned { actor } => out.write_u64(*actor),
            Self::Granted { actor, handle } => {
                out.write_u64(*actor)?;
                out.write_u32(*handle)
            }
            Self::Activated { actor, handle, targets } => {
                out.write_u64(*actor)?;
                out.write_u32(*handle)?;
                out.write_u16(*targets)
            }
            Self::TagChanged { actor, present } => {
                out.write_u64(*actor)?;
                out.write_bool(*present)
            }
        }
    }
}

/// Result record: header + reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaResult {
    /// Tick, sender, success and reason.
    pub header: ResultHeader,
    /// Payload; [`ArenaReply::None`] on failure.
    pub reply: ArenaReply,
}

impl ArenaResult {
    /// Successful result.
    #[must_use]
    pub fn ok(tick: Tick, sender_id: i64, reply: ArenaReply) -> Self {
        Self {
            header: ResultHeader::ok(tick, sender_id),
            reply,
        }
    }

    /// Validation failure.
    #[must_use]
    pub fn rejected(tick: Tick, sender_id: i64, reason: impl Into<String>) -> Self {
        Self {
            header: ResultHeader::failure(tick, sender_id, reason),
            reply: ArenaReply::None,
        }
    }

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// As [`ArenaReply::read_from`].
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            header: ResultHeader::read_from(input)?,
            reply: ArenaReply::read_from(input)?,
        })
    }
}

impl ByteSerializable for ArenaResult {
    fn size_of(&self) -> usize {
        self.header.size_of() + self.reply.size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        self.reply.write_to(out)
    }
}

impl WireResult for ArenaResult {
    fn header(&self) -> &ResultHeader {
        &self.header
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Things that happened in the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaEvent {
    /// An actor entered the arena.
    ActorSpawned {
        /// Actor.
        actor: ActorId,
        /// Display name.
        name: String,
    },
    /// An ability went off.
    AbilityActivated {
        /// Caster.
        actor: ActorId,
        /// Ability name.
        ability: String,
        /// Explicit target, if any.
        target: Option<ActorId>,
    },
    /// An actor's health reached zero.
    ActorDefeated {
        /// Actor.
        actor: ActorId,
    },
    /// An actor left the arena.
    ActorDespawned {
        /// Actor.
        actor: ActorId,
    },
    /// A command failed unexpectedly.
    CommandFailed {
        /// Correlation id of the failed command.
        correlation_id: CorrelationId,
        /// Sender of the failed command.
        sender_id: i64,
        /// Failure text.
        reason: String,
    },
}

impl ArenaEvent {
    const fn tag(&self) -> u8 {
        match self {
            Self::ActorSpawned { .. } => 0,
            Self::AbilityActivated { .. } => 1,
            Self::ActorDefeated { .. } => 2,
            Self::ActorDespawned { .. } => 3,
            Self::CommandFailed { .. } => 4,
        }
    }

    /// Decodes a payload.
    ///
    /// # Errors
    ///
    /// Short input, invalid UTF-8 or an unknown variant tag.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(match input.read_u8()? {
            0 => Self::ActorSpawned {
                actor: input.read_u64()?,
                name: input.read_str()?.to_string(),
            },
            1 => Self::AbilityActivated {
                actor: input.read_u64()?,
                ability: input.read_str()?.to_string(),
                target: read_optional_actor(input)?,
            },
            2 => Self::ActorDefeated {
                actor: input.read_u64()?,
            },
            3 => Self::ActorDespawned {
                actor: input.read_u64()?,
            },
            4 => Self::CommandFailed {
                correlation_id: CorrelationId(input.read_array()?),
                sender_id: input.read_i64()?,
                reason: input.read_str()?.to_string(),
            },
            value => {
                return Err(CodecError::UnknownVariant {
                    kind: "ArenaEvent",
                    value,
                })
            }
        })
    }
}

impl ByteSerializable for ArenaEvent {
    fn size_of(&self) -> usize {
        1 + match self {
            Self::ActorSpawned { name, .. } => 8 + str_size(name),
            Self::AbilityActivated { ability, .. } => 8 + str_size(ability) + OPTIONAL_ACTOR_SIZE,
            Self::ActorDefeated { .. } | Self::ActorDespawned { .. } => 8,
            Self::CommandFailed { reason, .. } => 16 + 8 + str_size(reason),
        }
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_u8(self.tag())?;
        match self {
            Self::ActorSpawned { actor, name } => {
                out.write_u64(*actor)?;
                out.write_str(name)
            }
            Self::AbilityActivated { actor, ability, target } => {
                out.write_u64(*actor)?;
                out.write_str(ability)?;
                write_optional_actor(out, *target)
            }
            Self::ActorDefeated { actor } | Self::ActorDespawned { actor } => out.write_u64(*actor),
            Self::CommandFailed {
                correlation_id,
                sender_id,
                reason,
            } => {
                out.write_bytes(&correlation_id.0)?;
                out.write_i64(*sender_id)?;
                out.write_str(reason)
            }
        }
    }
}

/// Event record: header + event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Tick the event happened in.
    pub header: EventHeader,
    /// What happened.
    pub event: ArenaEvent,
}

impl EventEnvelope {
    /// Wraps an event.
    #[must_use]
    pub const fn new(tick: Tick, event: ArenaEvent) -> Self {
        Self {
            header: EventHeader::new(tick),
            event,
        }
    }

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// As [`ArenaEvent::read_from`].
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            header: EventHeader::read_from(input)?,
            event: ArenaEvent::read_from(input)?,
        })
    }
}

impl ByteSerializable for EventEnvelope {
    fn size_of(&self) -> usize {
        EventHeader::SIZE + self.event.size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        self.event.write_to(out)
    }
}

impl WireEvent for EventEnvelope {
    fn header(&self) -> &EventHeader {
        &self.header
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Every actor's component state at one tick, ordered by actor id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArenaSnapshot {
    /// Tick the snapshot was built in.
    pub header: SnapshotHeader,
    /// One entry per actor.
    pub actors: Vec<AscSnapshot>,
}

impl ArenaSnapshot {
    /// Snapshot of `actor`, if present.
    #[must_use]
    pub fn actor(&self, actor: ActorId) -> Option<&AscSnapshot> {
        self.actors.iter().find(|a| a.owner == Some(actor))
    }

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// Short input or invalid UTF-8.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        let header = SnapshotHeader::read_from(input)?;
        let count = input.read_u16()?;
        let mut actors = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            actors.push(AscSnapshot::read_from(input)?);
        }
        Ok(Self { header, actors })
    }
}

impl ByteSerializable for ArenaSnapshot {
    fn size_of(&self) -> usize {
        SnapshotHeader::SIZE + 2 + self.actors.iter().map(ByteSerializable::size_of).sum::<usize>()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        out.write_len_u16(self.actors.len())?;
        for actor in &self.actors {
            actor.write_to(out)?;
        }
        Ok(())
    }
}

impl WireSnapshot for ArenaSnapshot {
    fn header(&self) -> &SnapshotHeader {
        &self.header
    }
}
