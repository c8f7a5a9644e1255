use crate::{
    Error,
    db::{
        Db,
        executor::ExecutorError,
        store::{DataKey, RawRow},
    },
    obs::{ExecKind, Span},
    traits::EntityKind,
};
use std::marker::PhantomData;

///
/// SaveMode
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SaveMode {
    /// Fail if the key is already present.
    Insert,

    /// Write unconditionally, inserting if missing.
    Replace,

    /// Fail if the key is absent.
    Update,
}

///
/// SaveExecutor
///

pub(crate) struct SaveExecutor<E: EntityKind> {
    db: Db,
    debug: bool,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> SaveExecutor<E> {
    #[must_use]
    pub(crate) const fn new(db: Db, debug: bool) -> Self {
        Self {
            db,
            debug,
            _marker: PhantomData,
        }
    }

    // ===== SINGLE-ENTITY SAVES =====

    /// Insert a brand-new entity (errors if the key already exists).
    pub(crate) fn insert(&self, entity: E) -> Result<E, Error> {
        self.save_entity(SaveMode::Insert, entity)
    }

    /// Update an existing entity (errors if it does not exist).
    pub(crate) fn update(&self, entity: E) -> Result<E, Error> {
        self.save_entity(SaveMode::Update, entity)
    }

    /// Replace an entity, inserting if missing.
    pub(crate) fn replace(&self, entity: E) -> Result<E, Error> {
        self.save_entity(SaveMode::Replace, entity)
    }

    // ===== BATCH SAVES =====

    // Batch semantics: fail-fast and non-atomic; partial successes remain.

    pub(crate) fn insert_many(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<Vec<E>, Error> {
        let iter = entities.into_iter();
        let mut out = Vec::with_capacity(iter.size_hint().0);

        for entity in iter {
            out.push(self.insert(entity)?);
        }

        Ok(out)
    }

    pub(crate) fn update_many(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<Vec<E>, Error> {
        let iter = entities.into_iter();
        let mut out = Vec::with_capacity(iter.size_hint().0);

        for entity in iter {
            out.push(self.update(entity)?);
        }

        Ok(out)
    }

    pub(crate) fn replace_many(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<Vec<E>, Error> {
        let iter = entities.into_iter();
        let mut out = Vec::with_capacity(iter.size_hint().0);

        for entity in iter {
            out.push(self.replace(entity)?);
        }

        Ok(out)
    }

    // ===== EXECUTION =====

    fn save_entity(&self, mode: SaveMode, entity: E) -> Result<E, Error> {
        let mut span = Span::<E>::new(ExecKind::Save);

        let key = entity.key();
        let data_key = DataKey::new::<E>(key);
        self.debug_log(format!("{mode:?} {data_key}"));

        // Encode before the existence check so an oversized row never
        // half-completes a mode decision.
        let row = RawRow::encode(&entity)?;

        let exists = self
            .db
            .with_data(|reg| reg.with_store(E::PATH, |store| store.contains_key(&key)))?;

        match (mode, exists) {
            (SaveMode::Insert, true) => return Err(ExecutorError::KeyExists(data_key).into()),
            (SaveMode::Update, false) => return Err(ExecutorError::KeyNotFound(data_key).into()),
            _ => {}
        }

        self.db
            .with_data(|reg| reg.with_store_mut(E::PATH, |store| store.insert(key, row)))?;
        span.set_rows(1);

        Ok(entity)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_fixtures::{Bin, bin, reset_stores, test_db},
        traits::Path,
        types::Key,
    };

    fn executor() -> SaveExecutor<Bin> {
        SaveExecutor::new(test_db(), false)
    }

    #[test]
    fn insert_then_insert_same_key_conflicts() {
        reset_stores();
        let entity = bin(1, "spares");

        executor().insert(entity.clone()).unwrap();
        let err = executor().insert(entity).unwrap_err();

        assert!(err.is_conflict());
    }

    #[test]
    fn update_requires_an_existing_row() {
        reset_stores();
        let entity = bin(1, "spares");

        let err = executor().update(entity.clone()).unwrap_err();
        assert!(err.is_not_found());

        executor().insert(entity.clone()).unwrap();
        executor().update(entity).unwrap();
    }

    #[test]
    fn replace_upserts() {
        reset_stores();

        executor().replace(bin(1, "spares")).unwrap();
        executor().replace(bin(1, "bolts")).unwrap();

        let stored = test_db()
            .with_data(|reg| {
                reg.with_store(Bin::PATH, |store| {
                    store.get(&Key::from_u128(1)).cloned().unwrap()
                })
            })
            .unwrap();

        assert_eq!(stored.try_decode::<Bin>().unwrap().label, "bolts");
    }

    #[test]
    fn insert_many_is_fail_fast() {
        reset_stores();
        executor().insert(bin(2, "taken")).unwrap();

        let batch = vec![bin(1, "a"), bin(2, "dup"), bin(3, "c")];
        let err = executor().insert_many(batch).unwrap_err();
        assert!(err.is_conflict());

        // The first entity landed before the conflict; the third never ran.
        let count = test_db()
            .with_data(|reg| reg.with_store(Bin::PATH, |store| store.len()))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn update_many_stops_at_the_first_missing_row() {
        reset_stores();
        executor().insert(bin(1, "spares")).unwrap();

        let batch = vec![bin(1, "renamed"), bin(9, "ghost"), bin(1, "never")];
        let err = executor().update_many(batch).unwrap_err();
        assert!(err.is_not_found());

        let stored = test_db()
            .with_data(|reg| {
                reg.with_store(Bin::PATH, |store| {
                    store.get(&Key::from_u128(1)).cloned().unwrap()
                })
            })
            .unwrap();
        assert_eq!(stored.try_decode::<Bin>().unwrap().label, "renamed");
    }

    #[test]
    fn replace_many_upserts_every_entity() {
        reset_stores();
        executor().insert(bin(1, "spares")).unwrap();

        let saved = executor()
            .replace_many(vec![bin(1, "bolts"), bin(2, "new")])
            .unwrap();
        assert_eq!(saved.len(), 2);

        let count = test_db()
            .with_data(|reg| reg.with_store(Bin::PATH, |store| store.len()))
            .unwrap();
        assert_eq!(count, 2);
    }
}
