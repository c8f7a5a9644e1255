use crate::{
    traits::{EntityKind, FieldValue},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
    marker::PhantomData,
};
use ulid::Ulid;

///
/// Key
///
/// Opaque surrogate primary key. Keys are ULIDs: generated, never derived
/// from entity content, and carrying no meaning an application may rely
/// on. Ordering exists purely so stores and result sets are deterministic.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Key(Ulid);

impl Key {
    /// Generate a fresh key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Build a key from raw bits. Intended for deterministic test data.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Ulid(value))
    }

    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0.0
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Ulid> for Key {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl FieldValue for Key {
    fn to_value(&self) -> Value {
        Value::Ulid(self.0)
    }
}

///
/// Id
///
/// A [`Key`] branded with the entity type it identifies. Prevents handing
/// a team key to a member lookup at compile time; erases to a bare `Key`
/// at the store boundary. Serialized transparently as its key.
///

#[repr(transparent)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct Id<E: EntityKind> {
    key: Key,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EntityKind> Id<E> {
    /// Generate a fresh id for a new entity.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_key(Key::generate())
    }

    #[must_use]
    pub const fn from_key(key: Key) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(self) -> Key {
        self.key
    }
}

// Manual impls: deriving would demand the same bounds of `E`, which is only
// a marker here.
impl<E: EntityKind> Copy for Id<E> {}

impl<E: EntityKind> Clone for Id<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: EntityKind> PartialEq for Id<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E: EntityKind> Eq for Id<E> {}

impl<E: EntityKind> PartialOrd for Id<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: EntityKind> Ord for Id<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<E: EntityKind> Hash for Id<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<E: EntityKind> Debug for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id<{}>({})", E::ENTITY_NAME, self.key)
    }
}

impl<E: EntityKind> Display for Id<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.key, f)
    }
}

impl<E: EntityKind> From<Id<E>> for Key {
    fn from(id: Id<E>) -> Self {
        id.key()
    }
}

impl<E: EntityKind> FieldValue for Id<E> {
    fn to_value(&self) -> Value {
        self.key.to_value()
    }
}

///
/// TESTS
///
