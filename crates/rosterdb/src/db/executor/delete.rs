use crate::{
    Error,
    db::{
        Db,
        executor::ExecutorError,
        query::{FilterExpr, eval, validate::{FieldScope, validate_filter}},
        store::{DataKey, RawRow},
    },
    obs::{ExecKind, MetricsEvent, Span, record},
    traits::EntityKind,
    types::{Id, Key},
};
use std::marker::PhantomData;

///
/// DeleteExecutor
///

pub(crate) struct DeleteExecutor<E: EntityKind> {
    db: Db,
    debug: bool,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> DeleteExecutor<E> {
    #[must_use]
    pub(crate) const fn new(db: Db, debug: bool) -> Self {
        Self {
            db,
            debug,
            _marker: PhantomData,
        }
    }

    /// Delete one row by id, erroring if it is absent.
    pub(crate) fn one(&self, id: Id<E>) -> Result<Key, Error> {
        let mut span = Span::<E>::new(ExecKind::Delete);

        let key = id.key();
        self.debug_log(format!("delete {}", DataKey::new::<E>(key)));

        let removed = self
            .db
            .with_data(|reg| reg.with_store_mut(E::PATH, |store| store.remove(&key)))?;

        if removed.is_none() {
            return Err(ExecutorError::KeyNotFound(DataKey::new::<E>(key)).into());
        }
        span.set_rows(1);

        Ok(key)
    }

    /// Delete one row by key, quietly reporting whether anything was there.
    pub(crate) fn by_key(&self, key: Key) -> Result<Option<Key>, Error> {
        let mut span = Span::<E>::new(ExecKind::Delete);

        let removed = self
            .db
            .with_data(|reg| reg.with_store_mut(E::PATH, |store| store.remove(&key)))?;

        match removed {
            Some(_) => {
                span.set_rows(1);
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    /// Delete every row the filter matches; returns the removed keys in
    /// primary-key order. Matching is computed fully before any removal.
    pub(crate) fn matching(&self, filter: &FilterExpr) -> Result<Vec<Key>, Error> {
        validate_filter(filter, &FieldScope::base::<E>())?;
        let mut span = Span::<E>::new(ExecKind::Delete);
        self.debug_log(format!("delete {} where {filter:?}", E::ENTITY_NAME));

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

        let mut keys = Vec::new();
        for (key, raw) in rows {
            let entity = raw.try_decode::<E>()?;
            if eval::eval(&entity, &filter) {
                keys.push(key);
            }
        }

        self.db.with_data(|reg| {
            reg.with_store_mut(E::PATH, |store| {
                for key in &keys {
                    store.remove(key);
                }
            })
        })?;
        span.set_rows(keys.len() as u64);

        Ok(keys)
    }

    fn debug_log(&self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }
}

///
/// TESTS
///
