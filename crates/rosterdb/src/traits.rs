//! The trait ladder every stored entity climbs by hand: a stable path, an
//! identity, a reflected field surface, and optionally a to-one relation.
//! There is no derive layer; fixture crates implement these directly.

use crate::{types::Key, value::Value};
use serde::{Serialize, de::DeserializeOwned};

// ===== PATH =====

///
/// Path
///
/// Globally unique, stable path under which the entity's store is
/// registered. Never derived from the Rust type name, so renames do not
/// silently re-home data.
///

pub trait Path {
    const PATH: &'static str;
}

// ===== ENTITY =====

///
/// EntityKind
///
/// A storable entity: serializable, cloneable, field-reflectable, with an
/// opaque surrogate primary key. `FIELDS` is the declared field-name set
/// that queries are validated against; `PRIMARY_KEY` names the id field.
///

pub trait EntityKind:
    Path + Clone + Serialize + DeserializeOwned + FieldValues + 'static
{
    const ENTITY_NAME: &'static str;
    const PRIMARY_KEY: &'static str;
    const FIELDS: &'static [&'static str];

    fn key(&self) -> Key;
}

// ===== RELATIONS =====

///
/// Related
///
/// Declares a to-one relation from `Self` to `R`, keyed by an optional
/// reference field. `RELATION` is the prefix joined filter paths use
/// (`"team"` makes `team.name` resolvable once the query joins `R`).
/// `related_key` returns `None` when the reference is absent.
///

pub trait Related<R: EntityKind>: EntityKind {
    const RELATION: &'static str;

    fn related_key(&self) -> Option<Key>;
}

// ===== FIELD VALUES =====

///
/// FieldValues
///
/// Reflection surface used by evaluation, sorting and projection.
/// Unknown field names return `None` (missing); declared fields that
/// currently hold nothing return `Some(Value::Null)`.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;
}

///
/// FieldValue
///
/// Conversion of one scalar into its runtime [`Value`]. The `Option<T>`
/// impl is where explicit optionality becomes `Value::Null`.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;
}

macro_rules! impl_field_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

impl_field_value_int!(i8, i16, i32, i64, u8, u16, u32);

// Presence checks carry no operand.
impl FieldValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FieldValue for ulid::Ulid {
    fn to_value(&self) -> Value {
        Value::Ulid(*self)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }
}

// ===== PROJECTION =====

///
/// ProjectFrom
///
/// Typed projection of an entity into a narrower view. One trait covers
/// field-for-field copies and renamed-field views alike.
///

pub trait ProjectFrom<E>: Sized {
    fn project(entity: &E) -> Self;
}

///
/// TESTS
///
