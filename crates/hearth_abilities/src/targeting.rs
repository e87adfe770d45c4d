//! # Targeting
//!
//! Abilities name a [`TargetingType`]; the registry maps it to a strategy
//! that turns the caller's [`TargetContext`] into concrete targets.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeId;
use crate::component::AbilitySystemComponent;

/// Key into the targeting registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingType {
    /// The activating component.
    #[default]
    SelfOnly,
    /// The context's primary target.
    Explicit,
    /// Every candidate in the context.
    AllCandidates,
    /// Candidate with the smallest value of the attribute; ties go to the
    /// earliest candidate.
    LowestAttribute(AttributeId),
    /// Game-defined strategy registered at startup.
    Custom(u16),
}

/// What the caller knows about possible targets at activation time.
#[derive(Clone, Default)]
pub struct TargetContext {
    /// Explicitly chosen target, if any.
    pub primary: Option<Arc<AbilitySystemComponent>>,
    /// Candidate pool for area / selection strategies.
    pub candidates: Vec<Arc<AbilitySystemComponent>>,
}

impl TargetContext {
    /// Empty context.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Context with a primary target.
    #[must_use]
    pub fn target(target: Arc<AbilitySystemComponent>) -> Self {
        Self {
            primary: Some(target),
            candidates: Vec::new(),
        }
    }

    /// Context with a candidate pool.
    #[must_use]
    pub fn candidates(candidates: Vec<Arc<AbilitySystemComponent>>) -> Self {
        Self {
            primary: None,
            candidates,
        }
    }
}

impl fmt::Debug for TargetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetContext")
            .field("primary", &self.primary.as_ref().map(|t| t.owner()))
            .field("candidates", &self.candidates.len())
            .finish()
    }
}

/// Turns a context into targets.
///
/// Called with no component lock held, so strategies may read attributes of
/// the owner and candidates freely.
pub trait TargetingStrategy: Send + Sync {
    /// Resolves targets. An empty result means "no target found".
    fn resolve(
        &self,
        owner: &Arc<AbilitySystemComponent>,
        context: &TargetContext,
    ) -> Vec<Arc<AbilitySystemComponent>>;
}

struct SelfOnly;

impl TargetingStrategy for SelfOnly {
    fn resolve(&self, owner: &Arc<AbilitySystemComponent>, _: &TargetContext) -> Vec<Arc<AbilitySystemComponent>> {
        vec![Arc::clone(owner)]
    }
}

struct Explicit;

impl TargetingStrategy for Explicit {
    fn resolve(&self, _: &Arc<AbilitySystemComponent>, context: &TargetContext) -> Vec<Arc<AbilitySystemComponent>> {
        context
            .primary
            .iter()
            .filter(|t| !t.is_disposed())
            .cloned()
            .collect()
    }
}

struct AllCandidates;

impl TargetingStrategy for AllCandidates {
    fn resolve(&self, _: &Arc<AbilitySystemComponent>, context: &TargetContext) -> Vec<Arc<AbilitySystemComponent>> {
        context
            .candidates
            .iter()
            .filter(|t| !t.is_disposed())
            .cloned()
            .collect()
    }
}

struct LowestAttribute(AttributeId);

impl TargetingStrategy for LowestAttribute {
    fn resolve(&self, _: &Arc<AbilitySystemComponent>, context: &TargetContext) -> Vec<Arc<AbilitySystemComponent>> {
        let mut best: Option<(f32, &Arc<AbilitySystemComponent>)> = None;
        for candidate in context.candidates.iter().filter(|t| !t.is_disposed()) {
            let value = candidate.get(self.0);
            match best {
                Some((lowest, _)) if value >= lowest => {}
                _ => best = Some((value, candidate)),
            }
        }
        best.map(|(_, t)| vec![Arc::clone(t)]).unwrap_or_default()
    }
}

/// Map from [`TargetingType`] to strategy.
#[derive(Clone, Default)]
pub struct TargetingRegistry {
    strategies: HashMap<TargetingType, Arc<dyn TargetingStrategy>>,
}

impl TargetingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in strategies.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TargetingType::SelfOnly, Arc::new(SelfOnly));
        registry.register(TargetingType::Explicit, Arc::new(Explicit));
        registry.register(TargetingType::AllCandidates, Arc::new(AllCandidates));
        registry
    }

    /// Registers (or replaces) the strategy for `key`.
    pub fn register(&mut self, key: TargetingType, strategy: Arc<dyn TargetingStrategy>) {
        self.strategies.insert(key, strategy);
    }

    /// Resolves `key`.
    #[must_use]
    pub fn get(&self, key: TargetingType) -> Option<Arc<dyn TargetingStrategy>> {
        if let Some(strategy) = self.strategies.get(&key) {
            return Some(Arc::clone(strategy));
        }
        match key {
            TargetingType::LowestAttribute(id) => Some(Arc::new(LowestAttribute(id))),
            _ => None,
        }
    }
}

impl fmt::Debug for TargetingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetingRegistry")
            .field("keys", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}
