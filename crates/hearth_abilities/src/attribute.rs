//! # Attributes
//!
//! Per-actor numeric state keyed by [`AttributeId`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a numeric attribute.
///
/// A small integer so it can go on the wire as a `u16`. Well-known ids are
/// associated constants; games are free to use any other value. In balance
/// files an id may be written either as a number or by its well-known name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "AttributeKey", into = "u16")]
pub struct AttributeId(pub u16);

impl AttributeId {
    /// Current health.
    pub const HEALTH: Self = Self(0);
    /// Health cap.
    pub const MAX_HEALTH: Self = Self(1);
    /// Damage dealt by a basic attack.
    pub const ATTACK_DAMAGE: Self = Self(2);
    /// Attacks per second.
    pub const ATTACK_SPEED: Self = Self(3);
    /// Fraction (0..1) removed from cooldown durations.
    pub const COOLDOWN_REDUCTION: Self = Self(4);
    /// Flat damage reduction.
    pub const ARMOR: Self = Self(5);
    /// Movement speed.
    pub const MOVE_SPEED: Self = Self(6);
    /// Attack range.
    pub const RANGE: Self = Self(7);
    /// Level / merge rank.
    pub const LEVEL: Self = Self(8);

    const NAMED: [(&'static str, Self); 9] = [
        ("Health", Self::HEALTH),
        ("MaxHealth", Self::MAX_HEALTH),
        ("AttackDamage", Self::ATTACK_DAMAGE),
        ("AttackSpeed", Self::ATTACK_SPEED),
        ("CooldownReduction", Self::COOLDOWN_REDUCTION),
        ("Armor", Self::ARMOR),
        ("MoveSpeed", Self::MOVE_SPEED),
        ("Range", Self::RANGE),
        ("Level", Self::LEVEL),
    ];

    /// Looks up a well-known attribute by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }

    /// Name of a well-known attribute.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED.iter().find(|(_, id)| *id == self).map(|(n, _)| *n)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Attribute({})", self.0),
        }
    }
}

impl From<AttributeId> for u16 {
    fn from(id: AttributeId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeKey {
    Id(u16),
    Name(String),
}

impl TryFrom<AttributeKey> for AttributeId {
    type Error = String;

    fn try_from(key: AttributeKey) -> Result<Self, Self::Error> {
        match key {
            AttributeKey::Id(id) => Ok(Self(id)),
            AttributeKey::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown attribute name: {name}"))
            }
        }
    }
}

/// Current value of every attribute that has ever been set.
///
/// Not synchronized: the owning component's lock guards it. Iteration is
/// in ascending id order so snapshots are deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeSet {
    values: BTreeMap<AttributeId, f32>,
}

impl AttributeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `id`, or `0.0` if never set.
    #[inline]
    #[must_use]
    pub fn get(&self, id: AttributeId) -> f32 {
        self.get_or(id, 0.0)
    }

    /// Value of `id`, or `default` if never set.
    #[inline]
    #[must_use]
    pub fn get_or(&self, id: AttributeId, default: f32) -> f32 {
        self.values.get(&id).copied().unwrap_or(default)
    }

    /// Whether `id` has ever been set.
    #[must_use]
    pub fn contains(&self, id: AttributeId) -> bool {
        self.values.contains_key(&id)
    }

    /// Overwrites `id`.
    pub fn set(&mut self, id: AttributeId, value: f32) {
        self.values.insert(id, value);
    }

    /// Adds `delta` to `id` and returns the new value.
    pub fn add(&mut self, id: AttributeId, delta: f32) -> f32 {
        let value = self.values.entry(id).or_insert(0.0);
        *value += delta;
        *value
    }

    /// Percent bump: adds `round(value * magnitude)` to `id`.
    ///
    /// Rounding is half-to-even. A non-zero raw bonus that rounds to less
    /// than one whole unit is clamped to `±1`, so small buffs and debuffs
    /// always land. Returns the bonus applied.
    pub fn add_percent(&mut self, id: AttributeId, magnitude: f32) -> f32 {
        let value = self.values.entry(id).or_insert(0.0);
        let bonus = percent_bonus(*value, magnitude);
        *value += bonus;
        bonus
    }

    /// Number of attributes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no attribute has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(id, value)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, f32)> + '_ {
        self.values.iter().map(|(id, v)| (*id, *v))
    }
}

impl FromIterator<(AttributeId, f32)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (AttributeId, f32)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Bonus produced by a percent bump of `value` by `magnitude`.
///
/// Round first, then clamp away from zero. The order matters for balance:
/// clamping first would turn every sub-unit bonus into a full unit before
/// rounding ever sees it.
#[must_use]
pub fn percent_bonus(value: f32, magnitude: f32) -> f32 {
    let raw = value * magnitude;
    let bonus = raw.round_ties_even();
    if raw != 0.0 && bonus.abs() < 1.0 {
        raw.signum()
    } else {
        bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_default() {
        let set = AttributeSet::new();
        assert_eq!(set.get(AttributeId::HEALTH), 0.0);
        assert_eq!(set.get_or(AttributeId::HEALTH, 42.0), 42.0);
        assert!(!set.contains(AttributeId::HEALTH));
    }

    #[test]
    fn test_add_creates_entry() {
        let mut set = AttributeSet::new();
        assert_eq!(set.add(AttributeId::ARMOR, 3.0), 3.0);
        assert_eq!(set.add(AttributeId::ARMOR, -1.0), 2.0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_tiny_percent_clamped_to_one() {
        let mut set = AttributeSet::new();
        set.set(AttributeId::ATTACK_DAMAGE, 100.0);
        let bonus = set.add_percent(AttributeId::ATTACK_DAMAGE, 0.001);
        assert_eq!(bonus, 1.0);
        assert_eq!(set.get(AttributeId::ATTACK_DAMAGE), 101.0);
    }

    #[test]
    fn test_tiny_negative_percent_clamped_to_minus_one() {
        let mut set = AttributeSet::new();
        set.set(AttributeId::MOVE_SPEED, 100.0);
        assert_eq!(set.add_percent(AttributeId::MOVE_SPEED, -0.001), -1.0);
        assert_eq!(set.get(AttributeId::MOVE_SPEED), 99.0);
    }

    #[test]
    fn test_percent_rounds_half_to_even() {
        // 5 * 0.5 = 2.5 -> 2 ; 7 * 0.5 = 3.5 -> 4
        assert_eq!(percent_bonus(5.0, 0.5), 2.0);
        assert_eq!(percent_bonus(7.0, 0.5), 4.0);
        // 1 * 0.5 = 0.5 -> rounds to 0, clamped to 1
        assert_eq!(percent_bonus(1.0, 0.5), 1.0);
    }

    #[test]
    fn test_zero_percent_is_zero() {
        assert_eq!(percent_bonus(100.0, 0.0), 0.0);
        assert_eq!(percent_bonus(0.0, 0.5), 0.0);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(AttributeId::from_name("attackdamage"), Some(AttributeId::ATTACK_DAMAGE));
        assert_eq!(AttributeId::HEALTH.to_string(), "Health");
        assert_eq!(AttributeId(900).to_string(), "Attribute(900)");
    }
}
