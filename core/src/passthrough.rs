//! Versioned value container for "notify on every write" state fields.
//!
//! Subscribers usually skip values equal to the last one they saw. Some
//! fields carry events rather than data (a log line, a toast, a one-shot
//! command) where writing the same content twice must surface twice.
//! [`Passthrough`] tags every write with a wrapping version counter so a
//! subscriber can key off the version instead of the value.
//!
//! ```
//! use async_action_core::Passthrough;
//!
//! let mut log = Passthrough::new(String::from("ready"));
//! let before = log.clone();
//!
//! log.set(String::from("ready"));
//!
//! assert_eq!(log, before); // same content
//! assert!(!log.same_write(&before)); // but a distinct write
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// A value whose every write is observable, even when the content is unchanged
///
/// Equality compares only the wrapped value. Use [`Passthrough::same_write`]
/// (or [`Passthrough::version`]) to tell writes apart.
#[derive(Clone, Default)]
pub struct Passthrough<V> {
    value: V,
    version: u64,
}

impl<V> Passthrough<V> {
    /// Wrap an initial value at version zero
    #[must_use]
    pub const fn new(value: V) -> Self {
        Self {
            value,
            version: u64::MIN,
        }
    }

    /// The wrapped value
    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Number of writes so far, modulo `u64::MAX + 1`
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Write a new value
    ///
    /// Always counts as a write, including when `value` equals the current one.
    pub fn set(&mut self, value: V) {
        self.value = value;
        self.bump();
    }

    /// Write a new value and return the previous one
    pub fn replace(&mut self, value: V) -> V {
        let previous = std::mem::replace(&mut self.value, value);
        self.bump();
        previous
    }

    /// Mutate the value in place as a single write
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut V),
    {
        f(&mut self.value);
        self.bump();
    }

    /// Whether both containers carry the same write, regardless of content
    #[must_use]
    pub const fn same_write(&self, other: &Self) -> bool {
        self.version == other.version
    }

    /// Unwrap, discarding the version
    #[must_use]
    pub fn into_inner(self) -> V {
        self.value
    }

    const fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl<V> Deref for Passthrough<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V> From<V> for Passthrough<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V: PartialEq> PartialEq for Passthrough<V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<V: Eq> Eq for Passthrough<V> {}

impl<V: fmt::Debug> fmt::Debug for Passthrough<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passthrough")
            .field("value", &self.value)
            .field("version", &self.version)
            .finish()
    }
}

// Serialized transparently: the version only means something within one store.
impl<V: Serialize> Serialize for Passthrough<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Passthrough<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        V::deserialize(deserializer).map(Self::new)
    }
}
