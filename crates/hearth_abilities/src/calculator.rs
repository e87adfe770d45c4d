//! # Attribute Calculators
//!
//! Calculated modifiers delegate to a calculator looked up by
//! [`CalculatorType`]. Calculators see a copy of the source's attributes and
//! the live target attributes, which is how damage that depends on the
//! attacker is expressed without game code in the effect engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attribute::{AttributeId, AttributeSet};
use crate::effect::{apply_operation, AttributeModifier, CalculatorType};

/// Computes and applies a calculated modifier.
pub trait AttributeCalculator: Send + Sync {
    /// Applies `modifier` to `target` using `source` as input.
    fn apply(&self, modifier: &AttributeModifier, source: &AttributeSet, target: &mut AttributeSet);
}

impl<F> AttributeCalculator for F
where
    F: Fn(&AttributeModifier, &AttributeSet, &mut AttributeSet) + Send + Sync,
{
    fn apply(&self, modifier: &AttributeModifier, source: &AttributeSet, target: &mut AttributeSet) {
        self(modifier, source, target);
    }
}

/// Subtracts the source's attack damage, scaled by `magnitude`, and floors
/// the result at zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceDamageCalculator;

impl AttributeCalculator for SourceDamageCalculator {
    fn apply(&self, modifier: &AttributeModifier, source: &AttributeSet, target: &mut AttributeSet) {
        let damage = source.get(AttributeId::ATTACK_DAMAGE) * modifier.magnitude;
        let current = target.get(modifier.attribute);
        target.set(modifier.attribute, (current - damage).max(0.0));
    }
}

/// Applies the modifier's operation with `source[attribute] * magnitude`.
#[derive(Clone, Copy, Debug)]
pub struct SourceAttributeScaledCalculator {
    /// Source attribute read.
    pub source: AttributeId,
}

impl AttributeCalculator for SourceAttributeScaledCalculator {
    fn apply(&self, modifier: &AttributeModifier, source: &AttributeSet, target: &mut AttributeSet) {
        let magnitude = source.get(self.source) * modifier.magnitude;
        apply_operation(target, modifier.attribute, modifier.operation, magnitude);
    }
}

/// Map from [`CalculatorType`] to calculator.
///
/// `SourceAttributeScaled` keys carry their own parameter, so they resolve
/// without registration.
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    calculators: HashMap<CalculatorType, Arc<dyn AttributeCalculator>>,
}

impl CalculatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in calculators.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CalculatorType::SourceDamage, Arc::new(SourceDamageCalculator));
        registry
    }

    /// Registers (or replaces) the calculator for `key`.
    pub fn register(&mut self, key: CalculatorType, calculator: Arc<dyn AttributeCalculator>) {
        self.calculators.insert(key, calculator);
    }

    /// Resolves `key`.
    #[must_use]
    pub fn get(&self, key: CalculatorType) -> Option<Arc<dyn AttributeCalculator>> {
        if let Some(calculator) = self.calculators.get(&key) {
            return Some(Arc::clone(calculator));
        }
        match key {
            CalculatorType::SourceAttributeScaled { source } => {
                Some(Arc::new(SourceAttributeScaledCalculator { source }))
            }
            _ => None,
        }
    }

    /// Number of explicitly registered calculators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }
}

impl std::fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculatorRegistry")
            .field("keys", &self.calculators.keys().collect::<Vec<_>>())
            .finish()
    }
}
