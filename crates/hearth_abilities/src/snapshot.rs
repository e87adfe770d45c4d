//! # Component Snapshots
//!
//! Owned, immutable copies of a component's state, safe to hand to another
//! thread and encodable with the byte codec.
//!
//! ## Wire Layout
//!
//! ```text
//! has_owner:u8 owner:u64
//! attr_count:u16   { id:u16 value:f32 }*
//! tag_count:u16    { name:str }*
//! ability_count:u16 { handle:u32 name:str activations:u32 ready:u8 }*
//! effect_count:u16 { uid:u64 name:str has_remaining:u8 remaining:f32 }*
//! ```

use hearth_core::{str_size, ByteReader, ByteSerializable, ByteWriter, CodecResult};

use crate::attribute::AttributeId;
use crate::ActorId;

/// Granted ability as seen in a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct AbilitySnapshot {
    /// Handle value.
    pub handle: u32,
    /// Ability name.
    pub name: String,
    /// Successful activations.
    pub activation_count: u32,
    /// Whether the gate passed when the snapshot was taken.
    pub can_activate: bool,
}

/// Active effect as seen in a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveEffectSnapshot {
    /// Effect uid value.
    pub uid: u64,
    /// Effect name.
    pub name: String,
    /// Seconds left; `None` for infinite effects.
    pub remaining: Option<f32>,
}

/// Point-in-time copy of one component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AscSnapshot {
    /// Owning actor, `None` if disposed.
    pub owner: Option<ActorId>,
    /// Attributes in ascending id order.
    pub attributes: Vec<(AttributeId, f32)>,
    /// Present tag names, ordered by tag hash.
    pub tags: Vec<String>,
    /// Granted abilities in grant order.
    pub abilities: Vec<AbilitySnapshot>,
    /// Active effects in application order.
    pub effects: Vec<ActiveEffectSnapshot>,
}

impl AscSnapshot {
    /// Value of `id` at snapshot time.
    #[must_use]
    pub fn attribute(&self, id: AttributeId) -> Option<f32> {
        self.attributes.iter().find(|(a, _)| *a == id).map(|(_, v)| *v)
    }

    /// Whether a tag with this exact name was present.
    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    /// Decodes a snapshot written by [`ByteSerializable::write_to`].
    ///
    /// # Errors
    ///
    /// Returns a codec error if the buffer is truncated or a string is not
    /// valid UTF-8.
    pub fn read_from(input: &mut ByteReader<'_>) -> CodecResult<Self> {
        let has_owner = input.read_bool()?;
        let owner = input.read_u64()?;

        let count = input.read_u16()?;
        let mut attributes = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let id = AttributeId(input.read_u16()?);
            attributes.push((id, input.read_f32()?));
        }

        let count = input.read_u16()?;
        let mut tags = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            tags.push(input.read_str()?.to_string());
        }

        let count = input.read_u16()?;
        let mut abilities = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            abilities.push(AbilitySnapshot {
                handle: input.read_u32()?,
                name: input.read_str()?.to_string(),
                activation_count: input.read_u32()?,
                can_activate: input.read_bool()?,
            });
        }

        let count = input.read_u16()?;
        let mut effects = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let uid = input.read_u64()?;
            let name = input.read_str()?.to_string();
            let has_remaining = input.read_bool()?;
            let remaining = input.read_f32()?;
            effects.push(ActiveEffectSnapshot {
                uid,
                name,
                remaining: has_remaining.then_some(remaining),
            });
        }

        Ok(Self {
            owner: has_owner.then_some(owner),
            attributes,
            tags,
            abilities,
            effects,
        })
    }
}

impl ByteSerializable for AscSnapshot {
    fn size_of(&self) -> usize {
        let tags: usize = self.tags.iter().map(|t| str_size(t)).sum();
        let abilities: usize = self.abilities.iter().map(|a| 4 + str_size(&a.name) + 4 + 1).sum();
        let effects: usize = self.effects.iter().map(|e| 8 + str_size(&e.name) + 1 + 4).sum();
        9 + 2 + self.attributes.len() * 6 + 2 + tags + 2 + abilities + 2 + effects
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        out.write_bool(self.owner.is_some())?;
        out.write_u64(self.owner.unwrap_or(0))?;

        out.write_len_u16(self.attributes.len())?;
        for (id, value) in &self.attributes {
            out.write_u16(id.0)?;
            out.write_f32(*value)?;
        }

        out.write_len_u16(self.tags.len())?;
        for tag in &self.tags {
            out.write_str(tag)?;
        }

        out.write_len_u16(self.abilities.len())?;
        for ability in &self.abilities {
            out.write_u32(ability.handle)?;
            out.write_str(&ability.name)?;
            out.write_u32(ability.activation_count)?;
            out.write_bool(ability.can_activate)?;
        }

        out.write_len_u16(self.effects.len())?;
        for effect in &self.effects {
            out.write_u64(effect.uid)?;
            out.write_str(&effect.name)?;
            out.write_bool(effect.remaining.is_some())?;
            out.write_f32(effect.remaining.unwrap_or(0.0))?;
        }
        Ok(())
    }
}
