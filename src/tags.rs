//! # Key/value tags attached to services.
//!
//! Every service owns a [`TagSet`] (by default `component=<id>`). The set is
//! handed to [`Taggable`](crate::Taggable) and [`Metricable`](crate::Metricable)
//! values at construction time and travels with the [`Context`](crate::Context)
//! passed to capabilities.
//!
//! Later tags with an existing key replace the earlier value in place, so the
//! order of first insertion is preserved.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::services::Taggable;

/// A single key/value tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the tag key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the tag value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered set of tags with unique keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this set extended with `tags`.
    ///
    /// ### Example
    /// ```
    /// use appvisor::{Tag, TagSet};
    ///
    /// let set = TagSet::new()
    ///     .with_tags([Tag::new("component", "db"), Tag::new("region", "eu")])
    ///     .with_tags([Tag::new("component", "primary-db")]);
    ///
    /// assert_eq!(set.get("component"), Some("primary-db"));
    /// assert_eq!(set.to_string(), "component=primary-db,region=eu");
    /// ```
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.extend(tags);
        self
    }

    /// Inserts `tag`, replacing the value of an existing tag with the same key.
    pub fn insert(&mut self, tag: Tag) {
        match self.tags.iter_mut().find(|t| t.key == tag.key) {
            Some(existing) => existing.value = tag.value,
            None => self.tags.push(tag),
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Iterates over tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        TagSet::new().with_tags(iter)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}

/// Thread-safe tag holder, ready to embed into service values.
///
/// Implements [`Taggable`], so a value that embeds a `Tagged` and forwards its
/// `taggable` capability receives the service tags at construction time.
#[derive(Debug, Default)]
pub struct Tagged {
    tags: RwLock<TagSet>,
}

impl Tagged {
    /// Creates a holder pre-filled with `tags`.
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: RwLock::new(tags.into_iter().collect()),
        }
    }

    /// Returns a snapshot of the current tags, extended with `extra`.
    pub fn tags(&self, extra: impl IntoIterator<Item = Tag>) -> TagSet {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .with_tags(extra)
    }
}

impl Taggable for Tagged {
    fn with_tags(&self, tags: &TagSet) {
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(tags.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_value_and_keeps_position() {
        let mut set = TagSet::new().with_tags([Tag::new("a", "1"), Tag::new("b", "2")]);
        set.insert(Tag::new("a", "3"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "a=3,b=2");
    }

    #[test]
    fn tagged_accumulates_service_tags() {
        let tagged = Tagged::new([Tag::new("kind", "store")]);
        tagged.with_tags(&TagSet::new().with_tags([Tag::new("component", "db")]));

        let tags = tagged.tags([Tag::new("op", "get")]);
        assert_eq!(tags.to_string(), "kind=store,component=db,op=get");
    }
}
