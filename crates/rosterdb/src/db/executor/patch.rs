use crate::{
    Error,
    db::{
        Db,
        query::{
            FilterExpr, eval,
            validate::{FieldScope, validate_filter},
        },
        store::RawRow,
    },
    obs::{ExecKind, MetricsEvent, Span, record},
    patch::{Patch, PatchError, PatchOp},
    traits::EntityKind,
    types::Key,
    value::Value,
};
use serde_cbor::Value as Cbor;
use std::marker::PhantomData;

///
/// PatchExecutor
///
/// Applies a field-level patch to every row a filter matches, editing
/// the stored rows directly rather than decoding entities and saving
/// them back. Two-phase: every patched row is computed and re-validated
/// first, then all writes happen together, so a mid-batch failure never
/// leaves a half-patched store.
///

pub(crate) struct PatchExecutor<E: EntityKind> {
    db: Db,
    debug: bool,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> PatchExecutor<E> {
    #[must_use]
    pub(crate) const fn new(db: Db, debug: bool) -> Self {
        Self {
            db,
            debug,
            _marker: PhantomData,
        }
    }

    /// Patch matching rows; returns the affected-row count. An empty
    /// patch affects nothing.
    pub(crate) fn apply(&self, filter: &FilterExpr, patch: &Patch) -> Result<u64, Error> {
        validate_filter(filter, &FieldScope::base::<E>())?;
        Self::validate_ops(patch)?;

        let mut span = Span::<E>::new(ExecKind::Patch);
        if patch.is_empty() {
            return Ok(0);
        }
        self.debug_log(format!("patch {} where {filter:?}", E::ENTITY_NAME));

        let rows: Vec<(Key, RawRow)> = self.db.with_data(|reg| {
            reg.with_store(E::PATH, |store| {
                store.iter().map(|(k, v)| (*k, v.clone())).collect()
            })
        })?;

        record(MetricsEvent::RowsScanned {
            entity_path: E::PATH,
            rows_scanned: rows.len() as u64,
        });

        let filter = filter.clone().simplify();

        // Phase 1: compute every patched row before writing any.
        let mut patched: Vec<(Key, RawRow)> = Vec::new();
        for (key, raw) in rows {
            let entity = raw.try_decode::<E>()?;
            if !eval::eval(&entity, &filter) {
                continue;
            }

            patched.push((key, apply_ops::<E>(&raw, patch)?));
        }

        // Phase 2: write.
        let count = patched.len() as u64;
        self.db.with_data(|reg| {
            reg.with_store_mut(E::PATH, |store| {
                for (key, row) in patched {
                    store.insert(key, row);
                }
            })
        })?;
        span.set_rows(count);

        Ok(count)
    }

    fn validate_ops(patch: &Patch) -> Result<(), PatchError> {
        for op in patch.ops() {
            let field = op.field();

            if field == E::PRIMARY_KEY {
                return Err(PatchError::PrimaryKey {
                    entity: E::ENTITY_NAME,
                });
            }
            if !E::FIELDS.iter().any(|f| *f == field) {
                return Err(PatchError::UnknownField {
                    entity: E::ENTITY_NAME,
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }

    fn debug_log(&self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }
}

/// Apply the ops to one stored row, editing the encoded map in place.
/// The result must still decode as `E`; a patch that breaks a row's
/// shape aborts the whole statement.
fn apply_ops<E: EntityKind>(raw: &RawRow, patch: &Patch) -> Result<RawRow, Error> {
    let decoded: Cbor = serde_cbor::from_slice(raw.as_bytes())
        .map_err(|err| Error::executor_internal(format!("row is not valid cbor: {err}")))?;

    let Cbor::Map(mut map) = decoded else {
        return Err(Error::executor_internal(format!(
            "row for {} is not a field map",
            E::ENTITY_NAME
        )));
    };

    for op in patch.ops() {
        match op {
            PatchOp::Set(field, value) => {
                map.insert(Cbor::Text(field.clone()), value_to_cbor(value));
            }
            PatchOp::Incr(field, delta) => {
                // Null and absent fields stay as they are; an increment
                // never invents a value.
                if let Some(Cbor::Integer(n)) = map.get_mut(&Cbor::Text(field.clone())) {
                    *n = n.saturating_add(i128::from(*delta));
                }
            }
        }
    }

    let bytes = serde_cbor::to_vec(&Cbor::Map(map))
        .map_err(|err| Error::executor_internal(format!("failed to re-encode row: {err}")))?;
    let row = RawRow::try_new(bytes)?;

    if let Err(err) = row.try_decode::<E>() {
        return Err(PatchError::InvalidRow {
            entity: E::ENTITY_NAME,
            message: err.to_string(),
        }
        .into());
    }

    Ok(row)
}

fn value_to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Int(i) => Cbor::Integer(i128::from(*i)),
        Value::List(items) => Cbor::Array(items.iter().map(value_to_cbor).collect()),
        Value::Null => Cbor::Null,
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Ulid(u) => Cbor::Text(u.to_string()),
    }
}

///
/// TESTS
///
