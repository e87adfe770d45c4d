//! # Abilities
//!
//! An ability is a tag gate, a targeting rule, effects to apply to the
//! targets, and an optional cooldown effect applied to the caster. There is
//! no cooldown timer: the cooldown effect grants a tag the ability lists as
//! blocked, and cooldown expiry is just that effect expiring.

use std::fmt;
use std::sync::Arc;

use crate::effect::GameplayEffect;
use crate::tag::{Tag, TagContainer};
use crate::targeting::TargetingType;

/// Immutable ability definition.
#[derive(Clone, Debug, Default)]
pub struct GameplayAbility {
    /// Display / lookup name.
    pub name: String,
    /// Caster must own all of these.
    pub activation_required_tags: Vec<Tag>,
    /// Caster must own none of these.
    pub activation_blocked_tags: Vec<Tag>,
    /// Effects applied to every resolved target.
    pub applied_effects: Vec<Arc<GameplayEffect>>,
    /// Effect applied to the caster on activation.
    pub cooldown_effect: Option<Arc<GameplayEffect>>,
    /// How targets are resolved.
    pub targeting: TargetingType,
    /// Abort activation when targeting yields nothing.
    pub requires_target: bool,
}

impl GameplayAbility {
    /// Creates an ability that targets its caster and does nothing.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a required activation tag.
    #[must_use]
    pub fn requiring(mut self, tag: impl Into<Tag>) -> Self {
        self.activation_required_tags.push(tag.into());
        self
    }

    /// Appends a blocked activation tag.
    #[must_use]
    pub fn blocked_by(mut self, tag: impl Into<Tag>) -> Self {
        self.activation_blocked_tags.push(tag.into());
        self
    }

    /// Appends an effect applied to targets.
    #[must_use]
    pub fn applying(mut self, effect: Arc<GameplayEffect>) -> Self {
        self.applied_effects.push(effect);
        self
    }

    /// Sets the cooldown effect and blocks activation on the tags it grants.
    #[must_use]
    pub fn with_cooldown(mut self, effect: Arc<GameplayEffect>) -> Self {
        for tag in &effect.granted_tags {
            if !self.activation_blocked_tags.contains(tag) {
                self.activation_blocked_tags.push(tag.clone());
            }
        }
        self.cooldown_effect = Some(effect);
        self
    }

    /// Sets the targeting rule.
    #[must_use]
    pub fn targeting(mut self, targeting: TargetingType, requires_target: bool) -> Self {
        self.targeting = targeting;
        self.requires_target = requires_target;
        self
    }

    /// Tag gate against the caster's tags.
    #[must_use]
    pub fn passes_gate(&self, tags: &TagContainer) -> bool {
        tags.has_all(&self.activation_required_tags) && !tags.has_any(&self.activation_blocked_tags)
    }
}

/// Per-component handle of a granted ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbilityHandle(pub u32);

impl fmt::Display for AbilityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability#{}", self.0)
    }
}

/// A granted ability.
#[derive(Clone, Debug)]
pub struct AbilitySpec {
    /// Handle assigned on grant.
    pub handle: AbilityHandle,
    /// Definition.
    pub ability: Arc<GameplayAbility>,
    /// Successful activations so far.
    pub activation_count: u32,
}
