use crate::{
    error::Error,
    serialize::{deserialize, serialize},
    traits::EntityKind,
    types::Key,
};
use derive_more::{Deref, DerefMut};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
    thread::LocalKey,
};
use thiserror::Error as ThisError;

/// Max serialized bytes for a single row to keep loads bounded.
pub const MAX_ROW_BYTES: u32 = 4 * 1024 * 1024;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("store '{0}' is not registered")]
    StoreNotFound(String),
}

///
/// RawRowError
///

#[derive(Debug, ThisError)]
pub enum RawRowError {
    #[error("row exceeds max size: {len} bytes (limit {MAX_ROW_BYTES})")]
    TooLarge { len: usize },
}

///
/// RowDecodeError
///

#[derive(Debug, ThisError)]
pub enum RowDecodeError {
    #[error("row failed to deserialize: {0}")]
    Deserialize(String),
}

///
/// RawRow
///
/// One encoded entity. Rows cross the store boundary as opaque bytes;
/// nothing outside the codec inspects them.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawRow(Vec<u8>);

impl RawRow {
    pub fn try_new(bytes: Vec<u8>) -> Result<Self, RawRowError> {
        if bytes.len() > MAX_ROW_BYTES as usize {
            return Err(RawRowError::TooLarge { len: bytes.len() });
        }

        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode an entity into its row form.
    pub fn encode<E: EntityKind>(entity: &E) -> Result<Self, Error> {
        let bytes = serialize(entity)?;

        Ok(Self::try_new(bytes)?)
    }

    pub fn try_decode<E: EntityKind>(&self) -> Result<E, RowDecodeError> {
        deserialize::<E>(&self.0).map_err(|e| RowDecodeError::Deserialize(e.to_string()))
    }
}

///
/// DataKey
///
/// Store-wide row identity: entity name plus primary key. This is the key
/// the session tracks snapshots under, so it must stay unique across all
/// registered entities.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataKey {
    entity: &'static str,
    key: Key,
}

impl DataKey {
    #[must_use]
    pub fn new<E: EntityKind>(key: Key) -> Self {
        Self {
            entity: E::ENTITY_NAME,
            key,
        }
    }

    #[must_use]
    pub const fn key(&self) -> Key {
        self.key
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }
}

impl Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.entity, self.key)
    }
}

///
/// DataStore
///
/// Authoritative row storage for a single entity, in key order. Bulk
/// mutations write here directly; session snapshots never do.
///

#[derive(Debug, Default, Deref, DerefMut)]
pub struct DataStore(BTreeMap<Key, RawRow>);

impl DataStore {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }
}

///
/// StoreRegistry
///
/// Maps entity paths to their thread-local stores. Thread locality is the
/// whole concurrency story: one thread, one registry, no locks.
///

#[derive(Default)]
pub struct StoreRegistry(HashMap<&'static str, &'static LocalKey<RefCell<DataStore>>>);

impl StoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Register a thread-local store accessor under an entity path.
    pub fn register(&mut self, path: &'static str, accessor: &'static LocalKey<RefCell<DataStore>>) {
        self.0.insert(path, accessor);
    }

    fn try_get(&self, path: &str) -> Result<&'static LocalKey<RefCell<DataStore>>, StoreError> {
        self.0
            .get(path)
            .copied()
            .ok_or_else(|| StoreError::StoreNotFound(path.to_string()))
    }

    /// Borrow a store immutably by path.
    pub fn with_store<R>(
        &self,
        path: &str,
        f: impl FnOnce(&DataStore) -> R,
    ) -> Result<R, StoreError> {
        let store = self.try_get(path)?;

        Ok(store.with_borrow(|s| f(s)))
    }

    /// Borrow a store mutably by path.
    pub fn with_store_mut<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut DataStore) -> R,
    ) -> Result<R, StoreError> {
        let store = self.try_get(path)?;

        Ok(store.with_borrow_mut(|s| f(s)))
    }
}

///
/// TESTS
///
