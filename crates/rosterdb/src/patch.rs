use crate::{traits::FieldValue, value::Value};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// PatchError
///
/// Structured failures for bulk patch application.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PatchError {
    #[error("field '{field}' is not declared on {entity}")]
    UnknownField {
        entity: &'static str,
        field: String,
    },

    #[error("the primary key of {entity} cannot be patched")]
    PrimaryKey { entity: &'static str },

    #[error("patched row would no longer decode as {entity}: {message}")]
    InvalidRow {
        entity: &'static str,
        message: String,
    },
}

///
/// PatchOp
/// One field rewrite inside a bulk patch.
///

#[remain::sorted]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PatchOp {
    /// Add a signed delta to an integer field. Rows where the field is
    /// null are left untouched rather than invented.
    Incr(String, i64),

    /// Overwrite a field with a value. `Value::Null` clears an optional
    /// field.
    Set(String, Value),
}

impl PatchOp {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Incr(field, _) | Self::Set(field, _) => field,
        }
    }
}

///
/// Patch
///
/// An ordered list of field rewrites, applied to every row a bulk
/// mutation matches. Set-based by construction: a patch never sees
/// entities, only the stored rows.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Overwrite `field` with `value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl FieldValue) -> Self {
        self.ops.push(PatchOp::Set(field.into(), value.to_value()));
        self
    }

    /// Clear an optional field.
    #[must_use]
    pub fn set_null(self, field: impl Into<String>) -> Self {
        self.set(field, Value::Null)
    }

    /// Add `delta` to an integer field.
    #[must_use]
    pub fn incr(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.ops.push(PatchOp::Incr(field.into(), delta));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }
}

///
/// TESTS
///
