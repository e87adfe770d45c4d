//! # HEARTH Abilities
//!
//! Generic attribute / tag / effect state machine for simulated actors.
//!
//! ## Model
//!
//! - **Attributes**: `AttributeId -> f32` per actor
//! - **Tags**: hierarchical names; present while either the loose or the
//!   effect reference count is above zero
//! - **Effects**: modifiers + granted tags, optionally kept alive as an
//!   [`ActiveEffect`] until they expire
//! - **Abilities**: tag gate, targeting, effects on targets, cooldown effect
//!   on the caster
//!
//! All state of one actor lives in an [`AbilitySystemComponent`] behind a
//! private lock, so snapshot reads from other threads never race with
//! modifier application on the simulation thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hearth_abilities::{AbilityBook, AbilitySystemComponent, AttributeId, TargetContext};
//!
//! let book = AbilityBook::from_toml_str(BALANCE)?;
//! let hero = Arc::new(AbilitySystemComponent::with_defaults(1));
//! let strike = hero.give_ability(book.ability("Strike").unwrap());
//!
//! hero.try_activate_ability(strike, &TargetContext::target(enemy));
//! hero.tick(dt);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod ability;
pub mod attribute;
pub mod book;
pub mod calculator;
pub mod component;
pub mod effect;
pub mod error;
pub mod snapshot;
pub mod tag;
pub mod targeting;

pub use ability::{AbilityHandle, AbilitySpec, GameplayAbility};
pub use attribute::{percent_bonus, AttributeId, AttributeSet};
pub use book::AbilityBook;
pub use calculator::{AttributeCalculator, CalculatorRegistry};
pub use component::{
    AbilityRuntime, AbilitySystemComponent, AscNotification, EffectApplication, ObserverId, PendingEffects,
};
pub use effect::{
    ActiveEffect, AttributeModifier, CalculatorType, CooldownReductionPolicy, DurationPolicy, DurationType,
    EffectUid, GameplayEffect, ModifierOp, ValueMode,
};
pub use error::{AbilityError, AbilityResult};
pub use snapshot::{AbilitySnapshot, ActiveEffectSnapshot, AscSnapshot};
pub use tag::{Tag, TagChange, TagContainer};
pub use targeting::{TargetContext, TargetingRegistry, TargetingStrategy, TargetingType};

/// Identifier of the actor that owns a component.
pub type ActorId = u64;
