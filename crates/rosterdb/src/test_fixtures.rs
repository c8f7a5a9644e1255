//! In-crate fixture entities and store plumbing for engine tests.
//!
//! Two tiny entities, one optional to-one relation between them, and
//! deterministic `from_u128` keys so assertions can name rows directly.

use crate::{
    db::{
        Db, DbSession,
        store::{DataStore, RawRow, StoreRegistry},
    },
    traits::{EntityKind, FieldValue, FieldValues, Path, Related},
    types::{Id, Key},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// Bin
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Bin {
    pub id: Id<Bin>,
    pub label: String,
}

impl Path for Bin {
    const PATH: &'static str = "test::bin";
}

impl EntityKind for Bin {
    const ENTITY_NAME: &'static str = "bin";
    const PRIMARY_KEY: &'static str = "id";
    const FIELDS: &'static [&'static str] = &["id", "label"];

    fn key(&self) -> Key {
        self.id.key()
    }
}

impl FieldValues for Bin {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "label" => Some(self.label.to_value()),
            _ => None,
        }
    }
}

///
/// Part
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Part {
    pub id: Id<Part>,
    pub name: Option<String>,
    pub qty: u32,
    pub bin_id: Option<Id<Bin>>,
}

impl Path for Part {
    const PATH: &'static str = "test::part";
}

impl EntityKind for Part {
    const ENTITY_NAME: &'static str = "part";
    const PRIMARY_KEY: &'static str = "id";
    const FIELDS: &'static [&'static str] = &["id", "name", "qty", "bin_id"];

    fn key(&self) -> Key {
        self.id.key()
    }
}

impl FieldValues for Part {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "name" => Some(self.name.to_value()),
            "qty" => Some(self.qty.to_value()),
            "bin_id" => Some(self.bin_id.to_value()),
            _ => None,
        }
    }
}

impl Related<Bin> for Part {
    const RELATION: &'static str = "bin";

    fn related_key(&self) -> Option<Key> {
        self.bin_id.map(Id::key)
    }
}

// ===== STORES =====

thread_local! {
    static BIN_STORE: RefCell<DataStore> = RefCell::new(DataStore::new());
    static PART_STORE: RefCell<DataStore> = RefCell::new(DataStore::new());

    static REGISTRY: StoreRegistry = {
        let mut reg = StoreRegistry::new();
        reg.register(Bin::PATH, &BIN_STORE);
        reg.register(Part::PATH, &PART_STORE);
        reg
    };
}

pub fn test_db() -> Db {
    Db::new(&REGISTRY)
}

pub fn test_session() -> DbSession {
    DbSession::new(test_db())
}

/// Empty both stores. The test harness can reuse threads, so fixtures
/// never assume a fresh thread local.
pub fn reset_stores() {
    BIN_STORE.with_borrow_mut(|s| s.clear());
    PART_STORE.with_borrow_mut(|s| s.clear());
}

// ===== SEEDING =====

pub fn bin(n: u128, label: &str) -> Bin {
    Bin {
        id: Id::from_key(Key::from_u128(n)),
        label: label.to_string(),
    }
}

/// Write a bin straight into its store, bypassing executors.
pub fn seed_bin(n: u128, label: &str) -> Id<Bin> {
    let entity = bin(n, label);
    let raw = RawRow::encode(&entity).expect("encode fixture bin");
    BIN_STORE.with_borrow_mut(|s| s.insert(entity.id.key(), raw));

    entity.id
}

/// Write a part straight into its store, bypassing executors.
pub fn seed_part(n: u128, name: Option<&str>, qty: u32, bin_id: Option<Id<Bin>>) -> Id<Part> {
    let entity = Part {
        id: Id::from_key(Key::from_u128(n)),
        name: name.map(ToString::to_string),
        qty,
        bin_id,
    };
    let raw = RawRow::encode(&entity).expect("encode fixture part");
    PART_STORE.with_borrow_mut(|s| s.insert(entity.id.key(), raw));

    entity.id
}

/// Read a part back out of the store by its numeric test key.
pub fn part_by_key(n: u128) -> Part {
    PART_STORE.with_borrow(|s| {
        s.get(&Key::from_u128(n))
            .expect("fixture part exists")
            .try_decode::<Part>()
            .expect("fixture part decodes")
    })
}
