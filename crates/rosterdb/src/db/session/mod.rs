//! Session layer: the second tier of state.
//!
//! A session wraps a `Db` handle with an identity map of encoded row
//! snapshots (`tracked`) and a queue of staged writes (`pending`).
//! Reads through the session prefer tracked snapshots; writes stage
//! until `flush`. Bulk statements go around both, which is the whole
//! point of their documented staleness hazard.

mod load;

pub use load::{SessionGroupQuery, SessionLoadQuery};

use crate::{
    Error,
    db::{
        Db,
        executor::{DeleteExecutor, LoadExecutor, PatchExecutor, SaveExecutor},
        query::FilterExpr,
        store::{DataKey, RawRow},
    },
    obs::{MetricsEvent, record},
    patch::Patch,
    traits::EntityKind,
    types::{Id, Key},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
};

///
/// PendingWrite
///
/// One staged write. The closure owns its entity and re-runs cleanly,
/// so a failed flush leaves the entry queued instead of half-consumed.
///

struct PendingWrite {
    data_key: DataKey,
    op: &'static str,
    apply: Box<dyn Fn(Db, bool) -> Result<(), Error>>,
}

///
/// DbSession
///
/// Unit-of-work facade over a `Db`.
///
/// Two rules govern every operation:
/// - a key that is tracked reads from its snapshot, not the store,
///   until `clear`;
/// - bulk statements (`patch_where`, `delete_where`) mutate the store
///   directly and never refresh tracked snapshots. Reads after a bulk
///   statement return pre-mutation state unless the session is cleared
///   first. The safe sequence is bulk, `flush`, `clear`, re-read.
///

pub struct DbSession {
    db: Db,
    debug: bool,
    tracked: RefCell<BTreeMap<DataKey, RawRow>>,
    pending: RefCell<VecDeque<PendingWrite>>,
}

impl DbSession {
    #[must_use]
    pub const fn new(db: Db) -> Self {
        Self {
            db,
            debug: false,
            tracked: RefCell::new(BTreeMap::new()),
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Enable `[debug]` executor logging for this session.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub(crate) const fn db(&self) -> Db {
        self.db
    }

    // ===== READS =====

    /// Start a fluent load bound to this session.
    #[must_use]
    pub fn load<E: EntityKind>(&self) -> SessionLoadQuery<'_, E> {
        SessionLoadQuery::new(self, LoadExecutor::new(self.db, self.debug))
    }

    /// Identity-map read: a tracked snapshot wins over the store. On a
    /// tracked miss, staged writes flush first so the store read cannot
    /// run behind the session's own queue.
    pub fn find<E: EntityKind>(&self, id: Id<E>) -> Result<Option<E>, Error> {
        let data_key = DataKey::new::<E>(id.key());

        let snapshot = self.tracked.borrow().get(&data_key).cloned();
        if let Some(raw) = snapshot {
            return Ok(Some(decode_tracked(&data_key, &raw)?));
        }

        self.flush()?;

        let raw = self
            .db
            .with_data(|reg| reg.with_store(E::PATH, |store| store.get(&id.key()).cloned()))?;

        match raw {
            Some(raw) => {
                let entity = raw.try_decode::<E>()?;
                self.tracked.borrow_mut().insert(data_key, raw);
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    /// Whether a snapshot for this key is currently tracked.
    #[must_use]
    pub fn is_loaded<E: EntityKind>(&self, id: Id<E>) -> bool {
        self.tracked
            .borrow()
            .contains_key(&DataKey::new::<E>(id.key()))
    }

    // ===== STAGED WRITES =====

    /// Stage an insert. The snapshot is visible immediately; the key
    /// collision check happens at flush.
    pub fn insert<E: EntityKind>(&self, entity: E) -> Result<(), Error> {
        self.stage_save("insert", entity, SaveExecutor::insert)
    }

    pub fn insert_many<E: EntityKind>(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<(), Error> {
        for entity in entities {
            self.insert(entity)?;
        }

        Ok(())
    }

    /// Stage an upsert.
    pub fn replace<E: EntityKind>(&self, entity: E) -> Result<(), Error> {
        self.stage_save("replace", entity, SaveExecutor::replace)
    }

    /// Stage an update. The missing-row check happens at flush.
    pub fn update<E: EntityKind>(&self, entity: E) -> Result<(), Error> {
        self.stage_save("update", entity, SaveExecutor::update)
    }

    /// Stage a delete. The tracked snapshot disappears immediately; the
    /// store row goes when the session flushes. Deleting an absent row
    /// is a no-op at flush, as in SQL.
    pub fn delete<E: EntityKind>(&self, id: Id<E>) {
        let data_key = DataKey::new::<E>(id.key());
        self.tracked.borrow_mut().remove(&data_key);

        self.pending.borrow_mut().push_back(PendingWrite {
            data_key,
            op: "delete",
            apply: Box::new(move |db, debug| {
                DeleteExecutor::<E>::new(db, debug)
                    .by_key(id.key())
                    .map(|_| ())
            }),
        });
    }

    /// Adopt an entity's current state as the tracked snapshot without
    /// staging a write.
    pub fn track<E: EntityKind>(&self, entity: &E) -> Result<(), Error> {
        let data_key = DataKey::new::<E>(entity.key());
        let raw = RawRow::encode(entity)?;
        self.tracked.borrow_mut().insert(data_key, raw);

        Ok(())
    }

    fn stage_save<E: EntityKind>(
        &self,
        op: &'static str,
        entity: E,
        apply: fn(&SaveExecutor<E>, E) -> Result<E, Error>,
    ) -> Result<(), Error> {
        let data_key = DataKey::new::<E>(entity.key());
        let raw = RawRow::encode(&entity)?;
        self.tracked.borrow_mut().insert(data_key, raw);

        self.pending.borrow_mut().push_back(PendingWrite {
            data_key,
            op,
            apply: Box::new(move |db, debug| {
                apply(&SaveExecutor::new(db, debug), entity.clone()).map(|_| ())
            }),
        });

        Ok(())
    }

    // ===== FLUSH & CLEAR =====

    /// Apply staged writes to the store in staging order. The first
    /// failure aborts the flush: already-applied writes stay applied,
    /// the failing write and everything behind it stay queued. `clear`
    /// is the way to abandon them.
    pub fn flush(&self) -> Result<u64, Error> {
        let mut applied: u64 = 0;

        loop {
            // Pop only after success so a failed write stays queued.
            let result = {
                let pending = self.pending.borrow();
                let Some(write) = pending.front() else {
                    break;
                };
                self.debug_log(format!("flush {} {}", write.op, write.data_key));
                (write.apply)(self.db, self.debug)
            };
            result?;

            self.pending.borrow_mut().pop_front();
            applied += 1;
        }

        if applied > 0 {
            record(MetricsEvent::SessionFlush { writes: applied });
        }

        Ok(applied)
    }

    /// Drop every tracked snapshot and every staged write. Unflushed
    /// writes are silently discarded.
    pub fn clear(&self) {
        self.tracked.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        record(MetricsEvent::SessionClear);
    }

    /// Number of staged writes waiting for `flush`.
    #[must_use]
    pub fn pending_writes(&self) -> u64 {
        self.pending.borrow().len() as u64
    }

    // ===== BULK STATEMENTS =====

    /// Bulk update: flush staged writes, then patch matching store rows
    /// directly. Tracked snapshots are NOT refreshed; rows read before
    /// this call keep their pre-patch values until `clear`.
    pub fn patch_where<E: EntityKind>(
        &self,
        filter: FilterExpr,
        patch: &Patch,
    ) -> Result<u64, Error> {
        self.flush()?;

        PatchExecutor::<E>::new(self.db, self.debug).apply(&filter, patch)
    }

    /// Bulk delete: flush staged writes, then remove matching store rows
    /// directly. Tracked snapshots of deleted rows survive until `clear`.
    pub fn delete_where<E: EntityKind>(&self, filter: FilterExpr) -> Result<u64, Error> {
        self.flush()?;

        let keys = DeleteExecutor::<E>::new(self.db, self.debug).matching(&filter)?;

        Ok(keys.len() as u64)
    }

    // ===== INTERNALS =====

    pub(crate) fn tracked_raw(&self, data_key: &DataKey) -> Option<RawRow> {
        self.tracked.borrow().get(data_key).cloned()
    }

    pub(crate) fn track_raw(&self, data_key: DataKey, raw: RawRow) {
        self.tracked.borrow_mut().insert(data_key, raw);
    }

    /// Track a row only if the key has no snapshot yet; an existing
    /// snapshot keeps overlay priority.
    pub(crate) fn track_raw_if_absent(&self, data_key: DataKey, raw: RawRow) {
        self.tracked.borrow_mut().entry(data_key).or_insert(raw);
    }

    /// Overlay entity rows with tracked snapshots: a tracked key returns
    /// its snapshot (stale or not), an untracked key is tracked as read.
    pub(crate) fn absorb<E: EntityKind>(
        &self,
        rows: Vec<(Key, E)>,
    ) -> Result<Vec<(Key, E)>, Error> {
        let mut out = Vec::with_capacity(rows.len());

        for (key, entity) in rows {
            let data_key = DataKey::new::<E>(key);

            match self.tracked_raw(&data_key) {
                Some(raw) => out.push((key, decode_tracked(&data_key, &raw)?)),
                None => {
                    self.track_raw(data_key, RawRow::encode(&entity)?);
                    out.push((key, entity));
                }
            }
        }

        Ok(out)
    }

    fn debug_log(&self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }
}

fn decode_tracked<E: EntityKind>(data_key: &DataKey, raw: &RawRow) -> Result<E, Error> {
    raw.try_decode::<E>().map_err(|err| {
        Error::session_internal(format!("tracked row no longer decodes: {data_key} ({err})"))
    })
}

///
/// TESTS
///
