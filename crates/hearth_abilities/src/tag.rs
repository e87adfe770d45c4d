//! # Gameplay Tags
//!
//! Hierarchical, dot-separated identifiers (`"Cooldown.BaseAttack"`) used for
//! gating and as the side channel effects use for cooldown-like state.
//!
//! Membership is boolean per tag; the owning component backs it with two
//! reference counts so a tag held both directly and through an effect is
//! not dropped when only one source lets go.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A hierarchical gameplay tag.
///
/// Cheap to clone. Hashing uses a precomputed 64-bit FNV-1a hash of the full
/// path, which is stable across runs and platforms. Equality checks the hash
/// first and then the path, so colliding paths stay distinct.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Tag {
    name: Arc<str>,
    hash: u64,
}

impl Tag {
    /// Creates a tag from its full path.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            hash: fnv1a(name.as_bytes()),
        }
    }

    /// Full dotted path.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable hash used as the reference-count key.
    #[inline]
    #[must_use]
    pub const fn hash_value(&self) -> u64 {
        self.hash
    }

    /// True if `self` equals `parent` or lies beneath it
    /// (`"Cooldown.BaseAttack"` is within `"Cooldown"`).
    #[must_use]
    pub fn is_within(&self, parent: &Tag) -> bool {
        let (me, other) = (self.name(), parent.name());
        me == other
            || (me.len() > other.len()
                && me.starts_with(other)
                && me.as_bytes()[other.len()] == b'.')
    }

    /// Immediate parent path, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Tag> {
        self.name.rfind('.').map(|idx| Tag::new(&self.name[..idx]))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.name.to_string()
    }
}

/// Boolean tag membership view.
///
/// Keyed by tag hash; iteration order follows the hash and is therefore
/// stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagContainer {
    tags: BTreeMap<u64, Tag>,
}

impl TagContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from a list of tags.
    pub fn from_tags<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let mut container = Self::new();
        for tag in tags {
            container.insert(tag.into());
        }
        container
    }

    /// Membership test.
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains_key(&tag.hash_value())
    }

    /// True if every tag in `required` is present. Vacuously true when empty.
    #[must_use]
    pub fn has_all<'a, I: IntoIterator<Item = &'a Tag>>(&self, required: I) -> bool {
        required.into_iter().all(|t| self.contains(t))
    }

    /// True if any tag in `candidates` is present. False when empty.
    #[must_use]
    pub fn has_any<'a, I: IntoIterator<Item = &'a Tag>>(&self, candidates: I) -> bool {
        candidates.into_iter().any(|t| self.contains(t))
    }

    /// True if any present tag is `parent` or lies beneath it.
    #[must_use]
    pub fn has_any_within(&self, parent: &Tag) -> bool {
        self.tags.values().any(|t| t.is_within(parent))
    }

    /// Adds a tag. Returns true if it was not already present.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.tags.insert(tag.hash_value(), tag).is_none()
    }

    /// Removes a tag. Returns true if it was present.
    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.tags.remove(&tag.hash_value()).is_some()
    }

    /// Number of tags present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if no tag is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates present tags.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Removes every tag.
    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

/// Result of a tag count change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagChange {
    /// Whether container membership flipped.
    pub changed: bool,
    /// Combined loose + effect count after the change.
    pub total: u32,
}

/// Which reference counter a tag operation touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TagSource {
    /// Added and removed by direct calls.
    Loose,
    /// Held by applied effects.
    Effect,
}

/// Dual reference counts behind a [`TagContainer`].
///
/// Invariant: a tag is in `container` iff `loose[h] + effect[h] > 0`.
#[derive(Clone, Debug, Default)]
pub(crate) struct TagCounts {
    loose: BTreeMap<u64, u32>,
    effect: BTreeMap<u64, u32>,
    container: TagContainer,
}

impl TagCounts {
    pub(crate) fn container(&self) -> &TagContainer {
        &self.container
    }

    pub(crate) fn counts(&self, tag: &Tag) -> (u32, u32) {
        let h = tag.hash_value();
        (
            self.loose.get(&h).copied().unwrap_or(0),
            self.effect.get(&h).copied().unwrap_or(0),
        )
    }

    fn total(&self, h: u64) -> u32 {
        self.loose.get(&h).copied().unwrap_or(0) + self.effect.get(&h).copied().unwrap_or(0)
    }

    fn map_mut(&mut self, source: TagSource) -> &mut BTreeMap<u64, u32> {
        match source {
            TagSource::Loose => &mut self.loose,
            TagSource::Effect => &mut self.effect,
        }
    }

    /// Increments; membership flips only on the combined 0 -> 1 transition.
    pub(crate) fn add(&mut self, source: TagSource, tag: &Tag) -> TagChange {
        let h = tag.hash_value();
        *self.map_mut(source).entry(h).or_insert(0) += 1;

        let total = self.total(h);
        let changed = total == 1;
        if changed {
            self.container.insert(tag.clone());
        }
        TagChange { changed, total }
    }

    /// Decrements; membership flips only when the combined count hits zero.
    /// Removing from a source that holds no count is a no-op.
    pub(crate) fn remove(&mut self, source: TagSource, tag: &Tag) -> TagChange {
        let h = tag.hash_value();
        let map = self.map_mut(source);
        let held = map.get(&h).copied().unwrap_or(0);
        if held == 0 {
            return TagChange {
                changed: false,
                total: self.total(h),
            };
        }
        if held == 1 {
            map.remove(&h);
        } else {
            map.insert(h, held - 1);
        }

        let total = self.total(h);
        let changed = total == 0;
        if changed {
            self.container.remove(tag);
        }
        TagChange { changed, total }
    }

    /// Drops every effect-held count. Tags with no loose count leave the
    /// container.
    pub(crate) fn clear_effect_counts(&mut self) {
        let effect = std::mem::take(&mut self.effect);
        for h in effect.keys() {
            if self.loose.get(h).copied().unwrap_or(0) == 0 {
                self.container.tags.remove(h);
            }
        }
    }
}
