//! # Ability Book
//!
//! Effect and ability definitions loaded from a TOML balance document.
//!
//! ```toml
//! [[effects]]
//! name = "StrikeDamage"
//! modifiers = [{ value_mode = "Calculated", attribute = "Health", calculator = "SourceDamage", magnitude = 1.0 }]
//!
//! [[effects]]
//! name = "StrikeCooldown"
//! duration_type = "HasDuration"
//! duration = 1.0
//! granted_tags = ["Cooldown.Strike"]
//! duration_policy = { CooldownReduction = { attribute = "CooldownReduction", max_reduction = 0.5 } }
//!
//! [[abilities]]
//! name = "Strike"
//! applied_effects = ["StrikeDamage"]
//! cooldown_effect = "StrikeCooldown"
//! targeting = "Explicit"
//! requires_target = true
//! activation_blocked_tags = ["Stunned"]
//! ```
//!
//! Abilities reference effects by name. A cooldown effect's granted tags
//! are added to the ability's blocked tags automatically.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::ability::GameplayAbility;
use crate::effect::{CooldownReductionPolicy, DurationType, GameplayEffect};
use crate::error::{AbilityError, AbilityResult};
use crate::tag::Tag;
use crate::targeting::TargetingType;

/// Duration policies expressible in data.
#[derive(Clone, Copy, Debug, Deserialize)]
enum DurationPolicyDef {
    CooldownReduction(CooldownReductionPolicy),
}

#[derive(Debug, Deserialize)]
struct EffectDef {
    #[serde(flatten)]
    effect: GameplayEffect,
    #[serde(default)]
    duration_policy: Option<DurationPolicyDef>,
}

#[derive(Debug, Deserialize)]
struct AbilityDef {
    name: String,
    #[serde(default)]
    activation_required_tags: Vec<Tag>,
    #[serde(default)]
    activation_blocked_tags: Vec<Tag>,
    #[serde(default)]
    applied_effects: Vec<String>,
    #[serde(default)]
    cooldown_effect: Option<String>,
    #[serde(default)]
    targeting: TargetingType,
    #[serde(default)]
    requires_target: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BookDef {
    #[serde(default)]
    effects: Vec<EffectDef>,
    #[serde(default)]
    abilities: Vec<AbilityDef>,
}

/// Named effect and ability definitions.
#[derive(Clone, Debug, Default)]
pub struct AbilityBook {
    effects: BTreeMap<String, Arc<GameplayEffect>>,
    abilities: BTreeMap<String, Arc<GameplayAbility>>,
}

impl AbilityBook {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Parse failures, duplicate names, references to undefined effects and
    /// non-finite or negative durations.
    pub fn from_toml_str(text: &str) -> AbilityResult<Self> {
        let def: BookDef = toml::from_str(text)?;
        Self::from_def(def)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// I/O failures, plus everything [`Self::from_toml_str`] rejects.
    pub fn load(path: impl AsRef<Path>) -> AbilityResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AbilityError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn from_def(def: BookDef) -> AbilityResult<Self> {
        let mut book = Self::default();

        for EffectDef {
            mut effect,
            duration_policy,
        } in def.effects
        {
            if !effect.duration.is_finite() || effect.duration < 0.0 {
                return Err(AbilityError::InvalidDefinition {
                    name: effect.name,
                    reason: "duration must be finite and non-negative".into(),
                });
            }
            if effect.duration_type == DurationType::HasDuration && effect.duration == 0.0 {
                tracing::warn!(effect = %effect.name, "HasDuration effect with zero duration acts as instant");
            }
            if let Some(DurationPolicyDef::CooldownReduction(policy)) = duration_policy {
                effect.duration_policy = Some(Arc::new(policy));
            }
            book.add_effect(effect)?;
        }

        for def in def.abilities {
            let mut ability = GameplayAbility::new(def.name.clone()).targeting(def.targeting, def.requires_target);
            ability.activation_required_tags = def.activation_required_tags;
            ability.activation_blocked_tags = def.activation_blocked_tags;
            for name in &def.applied_effects {
                ability = ability.applying(book.require_effect(&def.name, name)?);
            }
            if let Some(name) = &def.cooldown_effect {
                ability = ability.with_cooldown(book.require_effect(&def.name, name)?);
            }
            book.add_ability(ability)?;
        }

        tracing::debug!(
            effects = book.effects.len(),
            abilities = book.abilities.len(),
            "ability book loaded"
        );
        Ok(book)
    }

    fn require_effect(&self, ability: &str, effect: &str) -> AbilityResult<Arc<GameplayEffect>> {
        self.effect(effect).ok_or_else(|| AbilityError::UnknownEffect {
            ability: ability.to_string(),
            effect: effect.to_string(),
        })
    }

    /// Adds an effect defined in code.
    ///
    /// # Errors
    ///
    /// [`AbilityError::Duplicate`] if the name is taken.
    pub fn add_effect(&mut self, effect: GameplayEffect) -> AbilityResult<Arc<GameplayEffect>> {
        if self.effects.contains_key(&effect.name) {
            return Err(AbilityError::Duplicate(effect.name));
        }
        let effect = Arc::new(effect);
        self.effects.insert(effect.name.clone(), Arc::clone(&effect));
        Ok(effect)
    }

    /// Adds an ability defined in code.
    ///
    /// # Errors
    ///
    /// [`AbilityError::Duplicate`] if the name is taken.
    pub fn add_ability(&mut self, ability: GameplayAbility) -> AbilityResult<Arc<GameplayAbility>> {
        if self.abilities.contains_key(&ability.name) {
            return Err(AbilityError::Duplicate(ability.name));
        }
        let ability = Arc::new(ability);
        self.abilities.insert(ability.name.clone(), Arc::clone(&ability));
        Ok(ability)
    }

    /// Looks up an effect.
    #[must_use]
    pub fn effect(&self, name: &str) -> Option<Arc<GameplayEffect>> {
        self.effects.get(name).cloned()
    }

    /// Looks up an ability.
    #[must_use]
    pub fn ability(&self, name: &str) -> Option<Arc<GameplayAbility>> {
        self.abilities.get(name).cloned()
    }

    /// Ability names in sorted order.
    pub fn ability_names(&self) -> impl Iterator<Item = &str> {
        self.abilities.keys().map(String::as_str)
    }

    /// Number of effects.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Number of abilities.
    #[must_use]
    pub fn ability_count(&self) -> usize {
        self.abilities.len()
    }
}
