//! # Gameplay Effects
//!
//! Immutable effect *definitions* plus the per-target [`ActiveEffect`]
//! instances that track remaining time.
//!
//! ## Application Order
//!
//! ```text
//! gate (required / blocked tags)
//!   └─► modifiers (static op, or registered calculator)
//!         └─► granted tags (effect counter)
//!               └─► active effect (duration policy applied first)
//! ```
//!
//! Definitions are shared behind `Arc` and never mutated after
//! construction, so the same effect can be applied from many components
//! at once.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeId, AttributeSet};
use crate::tag::Tag;

/// How long an effect persists on its target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationType {
    /// Modifiers apply once; granted tags stay until removed explicitly.
    #[default]
    Instant,
    /// Registered as an active effect and expires after `duration` seconds.
    HasDuration,
    /// Registered as an active effect that never expires on its own.
    Infinite,
}

/// Whether a modifier's magnitude is used directly or computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueMode {
    /// Apply `operation` with `magnitude`.
    #[default]
    Static,
    /// Delegate to the calculator named by `calculator`.
    Calculated,
}

/// Arithmetic applied by a static modifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierOp {
    /// `value += magnitude`
    #[default]
    Add,
    /// Percent bump; see [`crate::attribute::percent_bonus`].
    Multiply,
    /// `value = magnitude`
    Override,
}

/// Key into the calculator registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculatorType {
    /// No calculator; a `Calculated` modifier with this key is skipped.
    #[default]
    None,
    /// `target[attr] -= source[AttackDamage] * magnitude`, floored at zero.
    SourceDamage,
    /// `target[attr] op= source[source] * magnitude`.
    SourceAttributeScaled {
        /// Source attribute that scales the magnitude.
        source: AttributeId,
    },
    /// Game-defined calculator registered at startup.
    Custom(u16),
}

/// One attribute change carried by an effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeModifier {
    /// Static or calculated.
    #[serde(default)]
    pub value_mode: ValueMode,
    /// Attribute being modified.
    pub attribute: AttributeId,
    /// Operation for static modifiers (and scaled calculators).
    #[serde(default)]
    pub operation: ModifierOp,
    /// Magnitude, or scale factor for calculated modifiers.
    #[serde(default)]
    pub magnitude: f32,
    /// Calculator used when `value_mode` is `Calculated`.
    #[serde(default)]
    pub calculator: CalculatorType,
}

impl AttributeModifier {
    /// Static `Add` modifier.
    #[must_use]
    pub const fn add(attribute: AttributeId, magnitude: f32) -> Self {
        Self::fixed(attribute, ModifierOp::Add, magnitude)
    }

    /// Static percent bump.
    #[must_use]
    pub const fn multiply(attribute: AttributeId, magnitude: f32) -> Self {
        Self::fixed(attribute, ModifierOp::Multiply, magnitude)
    }

    /// Static overwrite.
    #[must_use]
    pub const fn override_with(attribute: AttributeId, magnitude: f32) -> Self {
        Self::fixed(attribute, ModifierOp::Override, magnitude)
    }

    /// Static modifier with an explicit operation.
    #[must_use]
    pub const fn fixed(attribute: AttributeId, operation: ModifierOp, magnitude: f32) -> Self {
        Self {
            value_mode: ValueMode::Static,
            attribute,
            operation,
            magnitude,
            calculator: CalculatorType::None,
        }
    }

    /// Calculated modifier delegating to `calculator`.
    #[must_use]
    pub const fn calculated(attribute: AttributeId, calculator: CalculatorType, magnitude: f32) -> Self {
        Self {
            value_mode: ValueMode::Calculated,
            attribute,
            operation: ModifierOp::Add,
            magnitude,
            calculator,
        }
    }
}

/// Applies `op` with `magnitude` to `attribute` in `set`.
pub fn apply_operation(set: &mut AttributeSet, attribute: AttributeId, op: ModifierOp, magnitude: f32) {
    match op {
        ModifierOp::Add => {
            set.add(attribute, magnitude);
        }
        ModifierOp::Multiply => {
            set.add_percent(attribute, magnitude);
        }
        ModifierOp::Override => set.set(attribute, magnitude),
    }
}

/// Hook that rewrites a nominal duration at apply time.
///
/// Runs under the target's lock with the target's attributes, after the
/// effect's own modifiers have landed.
pub trait DurationPolicy: Send + Sync {
    /// Adjusts `duration` in place.
    fn calculate_duration(&self, target: &AttributeSet, duration: &mut f32);
}

/// Shrinks durations by a cooldown-reduction attribute.
///
/// `duration *= 1 - clamp(target[attribute], 0, max_reduction)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CooldownReductionPolicy {
    /// Attribute holding the reduction fraction.
    pub attribute: AttributeId,
    /// Upper bound on the reduction.
    pub max_reduction: f32,
}

impl Default for CooldownReductionPolicy {
    fn default() -> Self {
        Self {
            attribute: AttributeId::COOLDOWN_REDUCTION,
            max_reduction: 0.8,
        }
    }
}

impl DurationPolicy for CooldownReductionPolicy {
    fn calculate_duration(&self, target: &AttributeSet, duration: &mut f32) {
        let reduction = target.get(self.attribute).clamp(0.0, self.max_reduction.max(0.0));
        *duration *= 1.0 - reduction;
    }
}

/// Immutable effect definition.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GameplayEffect {
    /// Display / lookup name.
    pub name: String,
    /// Lifetime on the target.
    #[serde(default)]
    pub duration_type: DurationType,
    /// Nominal duration in seconds (only for `HasDuration`).
    #[serde(default)]
    pub duration: f32,
    /// Attribute changes applied at apply time.
    #[serde(default)]
    pub modifiers: Vec<AttributeModifier>,
    /// Tags granted through the effect counter.
    #[serde(default)]
    pub granted_tags: Vec<Tag>,
    /// Target must own all of these.
    #[serde(default)]
    pub required_tags: Vec<Tag>,
    /// Target must own none of these.
    #[serde(default)]
    pub blocked_tags: Vec<Tag>,
    /// Optional apply-time duration rewrite.
    #[serde(skip)]
    pub duration_policy: Option<Arc<dyn DurationPolicy>>,
}

impl GameplayEffect {
    /// Creates an instant effect with no modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Makes the effect last `seconds`.
    #[must_use]
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration_type = DurationType::HasDuration;
        self.duration = seconds;
        self
    }

    /// Makes the effect last until removed.
    #[must_use]
    pub fn infinite(mut self) -> Self {
        self.duration_type = DurationType::Infinite;
        self.duration = 0.0;
        self
    }

    /// Appends a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: AttributeModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Appends a granted tag.
    #[must_use]
    pub fn granting(mut self, tag: impl Into<Tag>) -> Self {
        self.granted_tags.push(tag.into());
        self
    }

    /// Appends a required tag.
    #[must_use]
    pub fn requiring(mut self, tag: impl Into<Tag>) -> Self {
        self.required_tags.push(tag.into());
        self
    }

    /// Appends a blocked tag.
    #[must_use]
    pub fn blocked_by(mut self, tag: impl Into<Tag>) -> Self {
        self.blocked_tags.push(tag.into());
        self
    }

    /// Attaches a duration policy.
    #[must_use]
    pub fn with_duration_policy(mut self, policy: Arc<dyn DurationPolicy>) -> Self {
        self.duration_policy = Some(policy);
        self
    }

    /// Whether applying this effect registers an active effect.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        match self.duration_type {
            DurationType::Instant => false,
            DurationType::HasDuration => self.duration > 0.0,
            DurationType::Infinite => true,
        }
    }
}

impl fmt::Debug for GameplayEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameplayEffect")
            .field("name", &self.name)
            .field("duration_type", &self.duration_type)
            .field("duration", &self.duration)
            .field("modifiers", &self.modifiers.len())
            .field("granted_tags", &self.granted_tags)
            .field("required_tags", &self.required_tags)
            .field("blocked_tags", &self.blocked_tags)
            .field("duration_policy", &self.duration_policy.is_some())
            .finish()
    }
}

/// Per-component unique id of an active effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectUid(pub u64);

impl fmt::Display for EffectUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// A live instance of a persistent effect on one target.
#[derive(Clone, Debug)]
pub struct ActiveEffect {
    /// Unique within the owning component.
    pub uid: EffectUid,
    /// Definition it came from.
    pub effect: Arc<GameplayEffect>,
    /// Seconds left; `None` for infinite effects.
    pub remaining: Option<f32>,
}

impl ActiveEffect {
    /// Ages by `dt`. Returns true if this call made the effect expire.
    pub(crate) fn age(&mut self, dt: f32) -> bool {
        match self.remaining.as_mut() {
            Some(remaining) if *remaining > 0.0 => {
                *remaining -= dt;
                *remaining <= 0.0
            }
            _ => false,
        }
    }
}
