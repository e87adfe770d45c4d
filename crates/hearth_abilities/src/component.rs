//! # Ability System Component
//!
//! The per-actor aggregate: attributes, tags, granted abilities and active
//! effects behind one private lock.
//!
//! ## Locking
//!
//! ```text
//! public accessor ─► lock state ─► mutate, queue notifications ─► unlock
//!                                                                   │
//!                                  observers called here ◄──────────┘
//! ```
//!
//! Every public method takes the lock at most once at a time and never
//! calls another public method while holding it. Effects applied by one
//! component to another copy the source attributes first and release that
//! lock before touching the target, so self-application and two actors
//! hitting each other never hold two component locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::ability::{AbilityHandle, AbilitySpec, GameplayAbility};
use crate::attribute::{AttributeId, AttributeSet};
use crate::calculator::CalculatorRegistry;
use crate::effect::{apply_operation, ActiveEffect, DurationType, EffectUid, GameplayEffect, ValueMode};
use crate::snapshot::{AbilitySnapshot, ActiveEffectSnapshot, AscSnapshot};
use crate::tag::{Tag, TagChange, TagContainer, TagCounts, TagSource};
use crate::targeting::{TargetContext, TargetingRegistry};
use crate::ActorId;

/// Registries shared by every component of one simulation.
#[derive(Clone, Debug)]
pub struct AbilityRuntime {
    /// Calculators for calculated modifiers.
    pub calculators: CalculatorRegistry,
    /// Targeting strategies for abilities.
    pub targeting: TargetingRegistry,
}

impl AbilityRuntime {
    /// Runtime holding the built-in calculators and strategies.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self {
            calculators: CalculatorRegistry::with_builtins(),
            targeting: TargetingRegistry::with_builtins(),
        }
    }
}

impl Default for AbilityRuntime {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Something that happened to a component.
#[derive(Clone, Debug, PartialEq)]
pub enum AscNotification {
    /// Container membership of `tag` flipped.
    TagsChanged {
        /// Tag that changed.
        tag: Tag,
        /// Whether it is now present.
        present: bool,
    },
    /// An ability was granted.
    AbilityAdded(AbilityHandle),
    /// An ability was revoked.
    AbilityRemoved(AbilityHandle),
    /// An ability activated successfully.
    AbilityActivated {
        /// Ability handle.
        handle: AbilityHandle,
        /// Activation count after this activation.
        count: u32,
    },
    /// A persistent effect was registered.
    EffectApplied(EffectUid),
    /// A persistent effect ran out.
    EffectExpired(EffectUid),
    /// A persistent effect was removed explicitly.
    EffectRemoved(EffectUid),
}

/// Subscription handle for [`AbilitySystemComponent::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&AscNotification) + Send + Sync>;

/// Outcome of applying an effect to a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectApplication {
    /// Gate failed (or the target is disposed). Nothing changed.
    Blocked,
    /// Effect applied; `uid` is set when an active effect was registered.
    Applied {
        /// Active effect id for persistent effects.
        uid: Option<EffectUid>,
    },
}

impl EffectApplication {
    /// True unless blocked.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Default)]
struct AscState {
    owner: Option<ActorId>,
    attributes: AttributeSet,
    tags: TagCounts,
    abilities: Vec<AbilitySpec>,
    active_effects: Vec<ActiveEffect>,
    next_effect_uid: u64,
    next_ability_handle: u32,
    activation_cache: Option<Vec<AbilityHandle>>,
    disposed: bool,
}

impl AscState {
    fn change_tag(&mut self, source: TagSource, tag: &Tag, add: bool, out: &mut Vec<AscNotification>) -> TagChange {
        let change = if add {
            self.tags.add(source, tag)
        } else {
            self.tags.remove(source, tag)
        };
        if change.changed {
            self.activation_cache = None;
            out.push(AscNotification::TagsChanged {
                tag: tag.clone(),
                present: add,
            });
        }
        change
    }

    fn release_effect(&mut self, effect: &GameplayEffect, out: &mut Vec<AscNotification>) {
        for tag in &effect.granted_tags {
            self.change_tag(TagSource::Effect, tag, false, out);
        }
    }

    fn spec_mut(&mut self, handle: AbilityHandle) -> Option<&mut AbilitySpec> {
        self.abilities.iter_mut().find(|s| s.handle == handle)
    }
}

/// Per-actor attribute / tag / effect / ability aggregate.
///
/// Shared as `Arc<AbilitySystemComponent>`; every method takes `&self`.
///
/// # Example
///
/// ```rust,ignore
/// let hero = Arc::new(AbilitySystemComponent::with_defaults(1));
/// hero.set(AttributeId::HEALTH, 100.0);
///
/// let strike = hero.give_ability(Arc::new(strike_ability));
/// if hero.try_activate_ability(strike, &TargetContext::target(enemy)) {
///     // effects landed, cooldown tag granted
/// }
///
/// hero.tick(1.0 / 30.0);
/// ```
pub struct AbilitySystemComponent {
    runtime: Arc<AbilityRuntime>,
    state: Mutex<AscState>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
}

impl AbilitySystemComponent {
    /// Creates a component owned by `owner` using a shared runtime.
    #[must_use]
    pub fn new(owner: ActorId, runtime: Arc<AbilityRuntime>) -> Self {
        Self {
            runtime,
            state: Mutex::new(AscState {
                owner: Some(owner),
                ..AscState::default()
            }),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    /// Creates a component with its own built-in runtime.
    #[must_use]
    pub fn with_defaults(owner: ActorId) -> Self {
        Self::new(owner, Arc::new(AbilityRuntime::with_builtins()))
    }

    /// Owning actor; `None` once disposed.
    #[must_use]
    pub fn owner(&self) -> Option<ActorId> {
        self.state.lock().owner
    }

    /// Whether [`Self::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Shared registries.
    #[must_use]
    pub fn runtime(&self) -> &Arc<AbilityRuntime> {
        &self.runtime
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers an observer. Observers run on the mutating thread after the
    /// component lock is released, in the order changes happened.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&AscNotification) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    fn notify(&self, notifications: Vec<AscNotification>) {
        if notifications.is_empty() {
            return;
        }
        let observers: Vec<Observer> = self.observers.lock().iter().map(|(_, o)| Arc::clone(o)).collect();
        for notification in &notifications {
            for observer in &observers {
                observer(notification);
            }
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Value of `id`, `0.0` if unset.
    #[must_use]
    pub fn get(&self, id: AttributeId) -> f32 {
        self.state.lock().attributes.get(id)
    }

    /// Value of `id`, `default` if unset.
    #[must_use]
    pub fn get_or(&self, id: AttributeId, default: f32) -> f32 {
        self.state.lock().attributes.get_or(id, default)
    }

    /// Overwrites `id`.
    pub fn set(&self, id: AttributeId, value: f32) {
        self.state.lock().attributes.set(id, value);
    }

    /// Adds `delta` to `id`; returns the new value.
    pub fn add(&self, id: AttributeId, delta: f32) -> f32 {
        self.state.lock().attributes.add(id, delta)
    }

    /// Percent bump of `id`; returns the bonus applied.
    pub fn add_percent(&self, id: AttributeId, magnitude: f32) -> f32 {
        self.state.lock().attributes.add_percent(id, magnitude)
    }

    /// Copy of every attribute.
    #[must_use]
    pub fn attribute_set(&self) -> AttributeSet {
        self.state.lock().attributes.clone()
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Whether `tag` is present from any source.
    #[must_use]
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.state.lock().tags.container().contains(tag)
    }

    /// Copy of the membership view.
    #[must_use]
    pub fn tags(&self) -> TagContainer {
        self.state.lock().tags.container().clone()
    }

    /// `(loose, effect)` reference counts of `tag`.
    #[must_use]
    pub fn tag_counts(&self, tag: &Tag) -> (u32, u32) {
        self.state.lock().tags.counts(tag)
    }

    /// Adds a direct reference to `tag`.
    pub fn add_loose_tag(&self, tag: &Tag) -> TagChange {
        self.change_tag(TagSource::Loose, tag, true)
    }

    /// Drops a direct reference to `tag`.
    pub fn remove_loose_tag(&self, tag: &Tag) -> TagChange {
        self.change_tag(TagSource::Loose, tag, false)
    }

    /// Adds an effect-held reference to `tag`.
    pub fn add_effect_tag(&self, tag: &Tag) -> TagChange {
        self.change_tag(TagSource::Effect, tag, true)
    }

    /// Drops an effect-held reference to `tag`.
    pub fn remove_effect_tag(&self, tag: &Tag) -> TagChange {
        self.change_tag(TagSource::Effect, tag, false)
    }

    fn change_tag(&self, source: TagSource, tag: &Tag, add: bool) -> TagChange {
        let mut notifications = Vec::new();
        let change = {
            let mut state = self.state.lock();
            state.change_tag(source, tag, add, &mut notifications)
        };
        self.notify(notifications);
        change
    }

    // =========================================================================
    // Abilities
    // =========================================================================

    /// Grants an ability and returns its handle.
    pub fn give_ability(&self, ability: Arc<GameplayAbility>) -> AbilityHandle {
        let handle = {
            let mut state = self.state.lock();
            state.next_ability_handle += 1;
            let handle = AbilityHandle(state.next_ability_handle);
            state.abilities.push(AbilitySpec {
                handle,
                ability,
                activation_count: 0,
            });
            state.activation_cache = None;
            handle
        };
        self.notify(vec![AscNotification::AbilityAdded(handle)]);
        handle
    }

    /// Revokes an ability. Returns false if the handle is unknown.
    pub fn remove_ability(&self, handle: AbilityHandle) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let before = state.abilities.len();
            state.abilities.retain(|s| s.handle != handle);
            let removed = state.abilities.len() != before;
            if removed {
                state.activation_cache = None;
            }
            removed
        };
        if removed {
            self.notify(vec![AscNotification::AbilityRemoved(handle)]);
        }
        removed
    }

    /// Copy of a granted ability.
    #[must_use]
    pub fn ability_spec(&self, handle: AbilityHandle) -> Option<AbilitySpec> {
        self.state.lock().abilities.iter().find(|s| s.handle == handle).cloned()
    }

    /// Handles of every granted ability, in grant order.
    #[must_use]
    pub fn ability_handles(&self) -> Vec<AbilityHandle> {
        self.state.lock().abilities.iter().map(|s| s.handle).collect()
    }

    /// Tag gate for `handle`. False for unknown handles.
    #[must_use]
    pub fn can_activate_ability(&self, handle: AbilityHandle) -> bool {
        let state = self.state.lock();
        state
            .abilities
            .iter()
            .find(|s| s.handle == handle)
            .is_some_and(|s| s.ability.passes_gate(state.tags.container()))
    }

    /// Handles whose gate currently passes.
    ///
    /// Cached; the cache is dropped whenever tags, abilities or effects
    /// change.
    pub fn activatable_abilities(&self) -> Vec<AbilityHandle> {
        let mut state = self.state.lock();
        if let Some(cached) = &state.activation_cache {
            return cached.clone();
        }
        let ready: Vec<AbilityHandle> = state
            .abilities
            .iter()
            .filter(|s| s.ability.passes_gate(state.tags.container()))
            .map(|s| s.handle)
            .collect();
        state.activation_cache = Some(ready.clone());
        ready
    }

    /// Gate check, target resolution, effects on the targets, then cooldown
    /// and count.
    ///
    /// Returns false when the handle is unknown, the gate fails, the
    /// component is disposed, or targeting is required and found nothing.
    pub fn try_activate_ability(self: &Arc<Self>, handle: AbilityHandle, context: &TargetContext) -> bool {
        let Some((ability, pending)) = self.begin_activation(handle, context) else {
            return false;
        };
        pending.apply();
        self.commit_activation(handle, &ability);
        true
    }

    /// Like [`Self::try_activate_ability`], but returns the target effects
    /// instead of applying them, for delayed delivery (projectiles).
    ///
    /// The returned bundle carries the caster's attributes as they were
    /// before the cooldown; cooldown and activation count are committed
    /// immediately.
    pub fn try_activate_ability_deferred(
        self: &Arc<Self>,
        handle: AbilityHandle,
        context: &TargetContext,
    ) -> Option<PendingEffects> {
        let (ability, pending) = self.begin_activation(handle, context)?;
        self.commit_activation(handle, &ability);
        Some(pending)
    }

    fn begin_activation(
        self: &Arc<Self>,
        handle: AbilityHandle,
        context: &TargetContext,
    ) -> Option<(Arc<GameplayAbility>, PendingEffects)> {
        let ability = {
            let state = self.state.lock();
            if state.disposed {
                return None;
            }
            let Some(spec) = state.abilities.iter().find(|s| s.handle == handle) else {
                debug!(%handle, "activation rejected: unknown handle");
                return None;
            };
            if !spec.ability.passes_gate(state.tags.container()) {
                debug!(%handle, ability = %spec.ability.name, "activation rejected by tag gate");
                return None;
            }
            Arc::clone(&spec.ability)
        };

        let targets = match self.runtime.targeting.get(ability.targeting) {
            Some(strategy) => strategy.resolve(self, context),
            None => {
                warn!(targeting = ?ability.targeting, ability = %ability.name, "no targeting strategy registered");
                Vec::new()
            }
        };
        if ability.requires_target && targets.is_empty() {
            debug!(%handle, ability = %ability.name, "activation aborted: no target");
            return None;
        }

        let pending = PendingEffects {
            source_owner: self.owner(),
            source: self.attribute_set(),
            targets,
            effects: ability.applied_effects.clone(),
        };
        Some((ability, pending))
    }

    fn commit_activation(&self, handle: AbilityHandle, ability: &GameplayAbility) {
        if let Some(cooldown) = &ability.cooldown_effect {
            self.apply_effect_to_self(cooldown);
        }

        let count = {
            let mut state = self.state.lock();
            state.spec_mut(handle).map(|spec| {
                spec.activation_count += 1;
                spec.activation_count
            })
        };
        if let Some(count) = count {
            self.notify(vec![AscNotification::AbilityActivated { handle, count }]);
        }
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Applies `effect` with this component as both source and target.
    pub fn apply_effect_to_self(&self, effect: &Arc<GameplayEffect>) -> EffectApplication {
        let source = self.attribute_set();
        self.receive_effect(effect, &source)
    }

    /// Applies `effect` to `target` with this component as source.
    pub fn apply_effect_to_target(&self, effect: &Arc<GameplayEffect>, target: &AbilitySystemComponent) -> EffectApplication {
        let source = self.attribute_set();
        target.receive_effect(effect, &source)
    }

    /// Target-side application with a snapshot of the source attributes.
    pub fn receive_effect(&self, effect: &Arc<GameplayEffect>, source: &AttributeSet) -> EffectApplication {
        let mut notifications = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            if state.disposed {
                return EffectApplication::Blocked;
            }
            let tags = state.tags.container();
            if !tags.has_all(&effect.required_tags) || tags.has_any(&effect.blocked_tags) {
                debug!(effect = %effect.name, owner = ?state.owner, "effect blocked by tag gate");
                return EffectApplication::Blocked;
            }

            for modifier in &effect.modifiers {
                match modifier.value_mode {
                    ValueMode::Static => {
                        apply_operation(&mut state.attributes, modifier.attribute, modifier.operation, modifier.magnitude);
                    }
                    ValueMode::Calculated => match self.runtime.calculators.get(modifier.calculator) {
                        Some(calculator) => calculator.apply(modifier, source, &mut state.attributes),
                        None => {
                            warn!(
                                effect = %effect.name,
                                calculator = ?modifier.calculator,
                                "no calculator registered, modifier skipped"
                            );
                        }
                    },
                }
            }

            for tag in &effect.granted_tags {
                state.change_tag(TagSource::Effect, tag, true, &mut notifications);
            }

            let uid = if effect.is_persistent() {
                let remaining = match effect.duration_type {
                    DurationType::HasDuration => {
                        let mut duration = effect.duration;
                        if let Some(policy) = &effect.duration_policy {
                            policy.calculate_duration(&state.attributes, &mut duration);
                        }
                        Some(duration)
                    }
                    _ => None,
                };
                state.next_effect_uid += 1;
                let uid = EffectUid(state.next_effect_uid);
                state.active_effects.push(ActiveEffect {
                    uid,
                    effect: Arc::clone(effect),
                    remaining,
                });
                notifications.push(AscNotification::EffectApplied(uid));
                trace!(effect = %effect.name, %uid, ?remaining, "active effect registered");
                Some(uid)
            } else {
                None
            };

            state.activation_cache = None;
            EffectApplication::Applied { uid }
        };
        self.notify(notifications);
        outcome
    }

    /// Removes an active effect and releases its granted tags.
    /// Returns false if `uid` is not active.
    pub fn remove_active_effect(&self, uid: EffectUid) -> bool {
        let mut notifications = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(index) = state.active_effects.iter().position(|e| e.uid == uid) else {
                return false;
            };
            let removed = state.active_effects.remove(index);
            state.release_effect(&removed.effect, &mut notifications);
            notifications.push(AscNotification::EffectRemoved(uid));
        }
        self.notify(notifications);
        true
    }

    /// Seconds left on an active effect; `Some(None)` for infinite ones.
    #[must_use]
    pub fn active_effect_remaining(&self, uid: EffectUid) -> Option<Option<f32>> {
        self.state
            .lock()
            .active_effects
            .iter()
            .find(|e| e.uid == uid)
            .map(|e| e.remaining)
    }

    /// Number of active effects.
    #[must_use]
    pub fn active_effect_count(&self) -> usize {
        self.state.lock().active_effects.len()
    }

    /// Ages active effects by `dt`; expired ones release their tags and are
    /// removed. Returns the uids that expired.
    pub fn tick(&self, dt: f32) -> Vec<EffectUid> {
        let mut notifications = Vec::new();
        let mut expired_uids = Vec::new();
        {
            let mut state = self.state.lock();
            if state.active_effects.is_empty() {
                return expired_uids;
            }

            let mut expired = Vec::new();
            state.active_effects.retain_mut(|active| {
                if active.age(dt) {
                    expired.push(active.clone());
                    false
                } else {
                    true
                }
            });

            for active in expired {
                state.release_effect(&active.effect, &mut notifications);
                notifications.push(AscNotification::EffectExpired(active.uid));
                trace!(effect = %active.effect.name, uid = %active.uid, "active effect expired");
                expired_uids.push(active.uid);
            }
            if !expired_uids.is_empty() {
                state.activation_cache = None;
            }
        }
        self.notify(notifications);
        expired_uids
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Independent copy of attributes, tags, abilities and active effects.
    #[must_use]
    pub fn build_snapshot(&self) -> AscSnapshot {
        let state = self.state.lock();
        let tags = state.tags.container();
        AscSnapshot {
            owner: state.owner,
            attributes: state.attributes.iter().collect(),
            tags: tags.iter().map(|t| t.name().to_string()).collect(),
            abilities: state
                .abilities
                .iter()
                .map(|s| AbilitySnapshot {
                    handle: s.handle.0,
                    name: s.ability.name.clone(),
                    activation_count: s.activation_count,
                    can_activate: s.ability.passes_gate(tags),
                })
                .collect(),
            effects: state
                .active_effects
                .iter()
                .map(|e| ActiveEffectSnapshot {
                    uid: e.uid.0,
                    name: e.effect.name.clone(),
                    remaining: e.remaining,
                })
                .collect(),
        }
    }

    /// Clears observers, owner, abilities and active effects.
    ///
    /// Effects applied to a disposed component are blocked and its
    /// abilities can no longer activate. Idempotent.
    pub fn dispose(&self) {
        self.observers.lock().clear();
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.owner = None;
        state.abilities.clear();
        state.active_effects.clear();
        state.tags.clear_effect_counts();
        state.activation_cache = None;
    }
}

impl std::fmt::Debug for AbilitySystemComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AbilitySystemComponent")
            .field("owner", &state.owner)
            .field("attributes", &state.attributes.len())
            .field("tags", &state.tags.container().len())
            .field("abilities", &state.abilities.len())
            .field("active_effects", &state.active_effects.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Target effects held back by a deferred activation.
#[must_use = "deferred effects do nothing until applied"]
pub struct PendingEffects {
    source_owner: Option<ActorId>,
    source: AttributeSet,
    targets: Vec<Arc<AbilitySystemComponent>>,
    effects: Vec<Arc<GameplayEffect>>,
}

impl PendingEffects {
    /// Resolved targets.
    #[must_use]
    pub fn targets(&self) -> &[Arc<AbilitySystemComponent>] {
        &self.targets
    }

    /// Caster attributes captured at activation.
    #[must_use]
    pub fn source(&self) -> &AttributeSet {
        &self.source
    }

    /// Applies every effect to every target with the captured source
    /// attributes. Returns one result per `(target, effect)` pair,
    /// target-major.
    pub fn apply(self) -> Vec<EffectApplication> {
        let source = self.source;
        let mut results = Vec::with_capacity(self.targets.len() * self.effects.len());
        for target in &self.targets {
            for effect in &self.effects {
                results.push(target.receive_effect(effect, &source));
            }
        }
        results
    }
}

impl std::fmt::Debug for PendingEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEffects")
            .field("source", &self.source_owner)
            .field("targets", &self.targets.len())
            .field("effects", &self.effects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{AttributeModifier, CalculatorType, CooldownReductionPolicy};
    use crate::targeting::TargetingType;

    fn actor(id: ActorId) -> Arc<AbilitySystemComponent> {
        Arc::new(AbilitySystemComponent::with_defaults(id))
    }

    fn recorder(asc: &AbilitySystemComponent) -> Arc<Mutex<Vec<AscNotification>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        asc.subscribe(move |n| sink.lock().push(n.clone()));
        log
    }

    #[test]
    fn test_loose_tag_notifies_on_transitions_only() {
        let asc = actor(1);
        let log = recorder(&asc);
        let tag = Tag::new("Shielded");

        assert!(asc.add_loose_tag(&tag).changed);
        assert!(!asc.add_loose_tag(&tag).changed);
        assert!(!asc.remove_loose_tag(&tag).changed);
        assert!(asc.remove_loose_tag(&tag).changed);

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], AscNotification::TagsChanged { tag: tag.clone(), present: true });
        assert_eq!(log[1], AscNotification::TagsChanged { tag, present: false });
    }

    #[test]
    fn test_duration_effect_grants_then_releases() {
        let asc = actor(1);
        let effect = Arc::new(GameplayEffect::new("Haste").with_duration(1.0).granting("Hasted"));
        let hasted = Tag::new("Hasted");

        let applied = asc.apply_effect_to_self(&effect);
        let EffectApplication::Applied { uid: Some(uid) } = applied else {
            panic!("expected active effect, got {applied:?}");
        };
        assert!(asc.has_tag(&hasted));
        assert_eq!(asc.active_effect_remaining(uid), Some(Some(1.0)));

        assert!(asc.tick(0.5).is_empty());
        assert!(asc.has_tag(&hasted));
        assert_eq!(asc.tick(0.5), vec![uid]);
        assert!(!asc.has_tag(&hasted));
        assert!(asc.tick(0.5).is_empty());
        assert_eq!(asc.tag_counts(&hasted), (0, 0));
    }

    #[test]
    fn test_instant_effect_keeps_granted_tags() {
        let asc = actor(1);
        let effect = Arc::new(GameplayEffect::new("Mark").granting("Marked"));
        assert_eq!(asc.apply_effect_to_self(&effect), EffectApplication::Applied { uid: None });
        asc.tick(100.0);
        assert!(asc.has_tag(&Tag::new("Marked")));
    }

    #[test]
    fn test_infinite_effect_removed_explicitly() {
        let asc = actor(1);
        let log = recorder(&asc);
        let effect = Arc::new(GameplayEffect::new("Aura").infinite().granting("Aura.Fire"));
        let uid = match asc.apply_effect_to_self(&effect) {
            EffectApplication::Applied { uid: Some(uid) } => uid,
            other => panic!("unexpected {other:?}"),
        };
        asc.tick(1_000.0);
        assert_eq!(asc.active_effect_remaining(uid), Some(None));

        assert!(asc.remove_active_effect(uid));
        assert!(!asc.remove_active_effect(uid));
        assert!(!asc.has_tag(&Tag::new("Aura.Fire")));
        assert!(log.lock().contains(&AscNotification::EffectRemoved(uid)));
    }

    #[test]
    fn test_loose_and_effect_sources_independent() {
        let asc = actor(1);
        let rooted = Tag::new("Rooted");
        let effect = Arc::new(GameplayEffect::new("Root").with_duration(0.5).granting("Rooted"));

        asc.add_loose_tag(&rooted);
        asc.apply_effect_to_self(&effect);
        assert_eq!(asc.tag_counts(&rooted), (1, 1));

        asc.tick(1.0);
        assert!(asc.has_tag(&rooted));
        asc.remove_loose_tag(&rooted);
        assert!(!asc.has_tag(&rooted));
    }

    #[test]
    fn test_calculated_damage_uses_source() {
        let attacker = actor(1);
        let victim = actor(2);
        attacker.set(AttributeId::ATTACK_DAMAGE, 15.0);
        victim.set(AttributeId::HEALTH, 40.0);

        let hit = Arc::new(GameplayEffect::new("Hit").with_modifier(AttributeModifier::calculated(
            AttributeId::HEALTH,
            CalculatorType::SourceDamage,
            2.0,
        )));
        assert!(attacker.apply_effect_to_target(&hit, &victim).is_applied());
        assert_eq!(victim.get(AttributeId::HEALTH), 10.0);
    }

    #[test]
    fn test_missing_calculator_skips_modifier() {
        let asc = actor(1);
        asc.set(AttributeId::HEALTH, 5.0);
        let effect = Arc::new(GameplayEffect::new("Odd").with_modifier(AttributeModifier::calculated(
            AttributeId::HEALTH,
            CalculatorType::Custom(42),
            1.0,
        )));
        assert!(asc.apply_effect_to_self(&effect).is_applied());
        assert_eq!(asc.get(AttributeId::HEALTH), 5.0);
    }

    #[test]
    fn test_duration_policy_applied_at_apply_time() {
        let asc = actor(1);
        asc.set(AttributeId::COOLDOWN_REDUCTION, 0.5);
        let effect = Arc::new(
            GameplayEffect::new("Cd")
                .with_duration(4.0)
                .granting("Cooldown.Strike")
                .with_duration_policy(Arc::new(CooldownReductionPolicy::default())),
        );
        let uid = match asc.apply_effect_to_self(&effect) {
            EffectApplication::Applied { uid: Some(uid) } => uid,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(asc.active_effect_remaining(uid), Some(Some(2.0)));
    }

    #[test]
    fn test_ability_cooldown_cycle() {
        let hero = actor(1);
        let enemy = actor(2);
        enemy.set(AttributeId::HEALTH, 30.0);

        let hit = Arc::new(GameplayEffect::new("Hit").with_modifier(AttributeModifier::add(AttributeId::HEALTH, -10.0)));
        let cooldown = Arc::new(GameplayEffect::new("StrikeCd").with_duration(1.0).granting("Cooldown.Strike"));
        let strike = Arc::new(
            GameplayAbility::new("Strike")
                .applying(hit)
                .with_cooldown(cooldown)
                .targeting(TargetingType::Explicit, true),
        );
        let handle = hero.give_ability(strike);
        let ctx = TargetContext::target(Arc::clone(&enemy));

        assert!(hero.try_activate_ability(handle, &ctx));
        assert_eq!(enemy.get(AttributeId::HEALTH), 20.0);
        assert!(!hero.can_activate_ability(handle));
        assert!(!hero.try_activate_ability(handle, &ctx));

        hero.tick(1.0);
        assert!(hero.can_activate_ability(handle));
        assert!(hero.try_activate_ability(handle, &ctx));
        assert_eq!(enemy.get(AttributeId::HEALTH), 10.0);
        assert_eq!(hero.ability_spec(handle).unwrap().activation_count, 2);
    }

    #[test]
    fn test_required_target_missing_aborts() {
        let hero = actor(1);
        let cooldown = Arc::new(GameplayEffect::new("Cd").with_duration(1.0).granting("Cooldown.Shot"));
        let shot = Arc::new(
            GameplayAbility::new("Shot")
                .with_cooldown(cooldown)
                .targeting(TargetingType::Explicit, true),
        );
        let handle = hero.give_ability(shot);

        assert!(!hero.try_activate_ability(handle, &TargetContext::none()));
        // No cooldown was consumed
        assert!(hero.can_activate_ability(handle));
        assert_eq!(hero.ability_spec(handle).unwrap().activation_count, 0);
    }

    #[test]
    fn test_deferred_effects_apply_later() {
        let hero = actor(1);
        let enemy = actor(2);
        enemy.set(AttributeId::HEALTH, 10.0);
        let hit = Arc::new(GameplayEffect::new("Arrow").with_modifier(AttributeModifier::add(AttributeId::HEALTH, -3.0)));
        let handle = hero.give_ability(Arc::new(
            GameplayAbility::new("Bow").applying(hit).targeting(TargetingType::Explicit, true),
        ));

        let pending = hero
            .try_activate_ability_deferred(handle, &TargetContext::target(Arc::clone(&enemy)))
            .unwrap();
        assert_eq!(enemy.get(AttributeId::HEALTH), 10.0);
        assert_eq!(hero.ability_spec(handle).unwrap().activation_count, 1);

        let results = pending.apply();
        assert_eq!(results, vec![EffectApplication::Applied { uid: None }]);
        assert_eq!(enemy.get(AttributeId::HEALTH), 7.0);
    }

    #[test]
    fn test_target_effects_read_attributes_from_before_cooldown() {
        let hero = actor(1);
        let enemy = actor(2);
        hero.set(AttributeId::ATTACK_DAMAGE, 10.0);
        enemy.set(AttributeId::HEALTH, 100.0);

        let hit = Arc::new(GameplayEffect::new("Hit").with_modifier(AttributeModifier::calculated(
            AttributeId::HEALTH,
            CalculatorType::SourceDamage,
            1.0,
        )));
        let exhausted = Arc::new(
            GameplayEffect::new("Exhausted")
                .with_duration(1.0)
                .with_modifier(AttributeModifier::override_with(AttributeId::ATTACK_DAMAGE, 0.0))
                .granting("Cooldown.Strike"),
        );
        let ability = Arc::new(
            GameplayAbility::new("Strike")
                .applying(hit)
                .with_cooldown(exhausted)
                .targeting(TargetingType::Explicit, true),
        );
        let strike = hero.give_ability(Arc::clone(&ability));
        let ctx = TargetContext::target(Arc::clone(&enemy));

        assert!(hero.try_activate_ability(strike, &ctx));
        assert_eq!(enemy.get(AttributeId::HEALTH), 90.0);
        assert_eq!(hero.get(AttributeId::ATTACK_DAMAGE), 0.0);

        // Deferred delivery keeps the pre-cooldown source as well.
        let archer = actor(3);
        archer.set(AttributeId::ATTACK_DAMAGE, 10.0);
        let shot = archer.give_ability(ability);
        let pending = archer.try_activate_ability_deferred(shot, &ctx).unwrap();
        assert_eq!(archer.get(AttributeId::ATTACK_DAMAGE), 0.0);
        assert_eq!(pending.source().get(AttributeId::ATTACK_DAMAGE), 10.0);
        pending.apply();
        assert_eq!(enemy.get(AttributeId::HEALTH), 80.0);
    }

    #[test]
    fn test_self_effect_lands_before_own_cooldown_tag() {
        let hero = actor(1);
        let buff = Arc::new(
            GameplayEffect::new("GuardUp")
                .with_modifier(AttributeModifier::add(AttributeId::ARMOR, 5.0))
                .blocked_by("Cooldown.Guard"),
        );
        let cooldown = Arc::new(GameplayEffect::new("GuardCd").with_duration(2.0).granting("Cooldown.Guard"));
        let guard = hero.give_ability(Arc::new(GameplayAbility::new("Guard").applying(buff).with_cooldown(cooldown)));

        assert!(hero.try_activate_ability(guard, &TargetContext::none()));
        assert_eq!(hero.get(AttributeId::ARMOR), 5.0);
        assert!(hero.has_tag(&Tag::new("Cooldown.Guard")));
        assert!(!hero.try_activate_ability(guard, &TargetContext::none()));
        assert_eq!(hero.get(AttributeId::ARMOR), 5.0);
    }

    #[test]
    fn test_activation_cache_tracks_tags() {
        let hero = actor(1);
        let handle = hero.give_ability(Arc::new(GameplayAbility::new("Dash").blocked_by("Rooted")));
        assert_eq!(hero.activatable_abilities(), vec![handle]);

        hero.add_loose_tag(&Tag::new("Rooted"));
        assert!(hero.activatable_abilities().is_empty());

        hero.remove_loose_tag(&Tag::new("Rooted"));
        assert_eq!(hero.activatable_abilities(), vec![handle]);
    }

    #[test]
    fn test_self_application_does_not_deadlock() {
        let hero = actor(1);
        hero.set(AttributeId::ATTACK_DAMAGE, 4.0);
        hero.set(AttributeId::HEALTH, 10.0);
        let recoil = Arc::new(GameplayEffect::new("Recoil").with_modifier(AttributeModifier::calculated(
            AttributeId::HEALTH,
            CalculatorType::SourceDamage,
            1.0,
        )));
        assert!(hero.apply_effect_to_target(&recoil, &hero).is_applied());
        assert_eq!(hero.get(AttributeId::HEALTH), 6.0);
    }

    #[test]
    fn test_observer_may_call_back_into_component() {
        let hero = actor(1);
        let inner = Arc::clone(&hero);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        hero.subscribe(move |n| {
            if let AscNotification::TagsChanged { tag, .. } = n {
                *sink.lock() = Some(inner.has_tag(tag));
            }
        });
        hero.add_loose_tag(&Tag::new("Burning"));
        assert_eq!(*seen.lock(), Some(true));
    }

    #[test]
    fn test_dispose_clears_everything() {
        let hero = actor(1);
        let log = recorder(&hero);
        let handle = hero.give_ability(Arc::new(GameplayAbility::new("Wave")));
        hero.apply_effect_to_self(&Arc::new(GameplayEffect::new("Buff").infinite().granting("Buffed")));
        hero.add_loose_tag(&Tag::new("Named"));
        let before = log.lock().len();

        hero.dispose();
        hero.dispose();
        assert!(hero.is_disposed());
        assert_eq!(hero.owner(), None);
        assert!(hero.ability_handles().is_empty());
        assert_eq!(hero.active_effect_count(), 0);
        assert!(!hero.has_tag(&Tag::new("Buffed")));
        assert!(hero.has_tag(&Tag::new("Named")));
        assert!(!hero.try_activate_ability(handle, &TargetContext::none()));
        assert_eq!(
            hero.apply_effect_to_self(&Arc::new(GameplayEffect::new("Late"))),
            EffectApplication::Blocked
        );

        hero.add_loose_tag(&Tag::new("AfterDispose"));
        assert_eq!(log.lock().len(), before);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let hero = actor(7);
        hero.set(AttributeId::HEALTH, 50.0);
        hero.add_loose_tag(&Tag::new("Alive"));
        let snapshot = hero.build_snapshot();

        hero.set(AttributeId::HEALTH, 0.0);
        hero.remove_loose_tag(&Tag::new("Alive"));

        assert_eq!(snapshot.owner, Some(7));
        assert_eq!(snapshot.attribute(AttributeId::HEALTH), Some(50.0));
        assert_eq!(snapshot.tags, vec!["Alive".to_string()]);
    }
}
