use crate::db::query::eval::FieldPresence;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

///
/// NullOrder
///
/// Placement of null (and absent) values under a sort key. Placement is
/// absolute: `Last` puts nulls last whether the key is ascending or
/// descending.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum NullOrder {
    #[default]
    First,
    Last,
}

///
/// SortKey
/// One field of a compound sort order.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
    pub nulls: NullOrder,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
            nulls: NullOrder::default(),
        }
    }

    #[must_use]
    pub const fn nulls(mut self, nulls: NullOrder) -> Self {
        self.nulls = nulls;
        self
    }
}

///
/// SortExpr
/// Compound sort order; keys apply left to right.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SortExpr {
    pub keys: Vec<SortKey>,
}

impl SortExpr {
    #[must_use]
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    #[must_use]
    pub fn key(mut self, key: SortKey) -> Self {
        self.keys.push(key);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

///
/// Compare two field reads under one sort key. A missing field orders
/// exactly like a present null; rows never error out of a sort.
///

pub(crate) fn compare_presence(
    a: &FieldPresence,
    b: &FieldPresence,
    key: &SortKey,
) -> Ordering {
    match (non_null(a), non_null(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match key.nulls {
            NullOrder::First => Ordering::Less,
            NullOrder::Last => Ordering::Greater,
        },
        (Some(_), None) => match key.nulls {
            NullOrder::First => Ordering::Greater,
            NullOrder::Last => Ordering::Less,
        },
        (Some(av), Some(bv)) => {
            let ord = av.cmp(bv);
            match key.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }
    }
}

const fn non_null(p: &FieldPresence) -> Option<&crate::value::Value> {
    match p {
        FieldPresence::Present(v) if !v.is_null() => Some(v),
        _ => None,
    }
}

///
/// TESTS
///
