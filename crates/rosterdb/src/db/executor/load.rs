use crate::{
    Error,
    db::{
        Db,
        query::{
            FilterExpr, LoadQuery, SortExpr,
            eval::{self, JoinedRow, Row},
            sort::compare_presence,
            validate::{FieldScope, JoinScope, validate_load},
        },
        response::Response,
        store::RawRow,
    },
    obs::{ExecKind, MetricsEvent, Span, record},
    traits::{EntityKind, FieldValues, Related},
    types::Key,
};
use std::cmp::Ordering;

///
/// JoinSpec
///
/// Runtime description of one to-one join. The resolver looks up the
/// related row by the reference key at evaluation time; an absent
/// reference or a dangling key resolves to `None`, which makes every
/// `relation.field` path read as missing.
///

pub(crate) struct JoinSpec<E: EntityKind> {
    pub relation: &'static str,
    pub entity_name: &'static str,
    pub fields: &'static [&'static str],
    resolve: ResolveFn<E>,
}

type ResolveFn<E> = Box<dyn Fn(Db, &E) -> Result<Option<Box<dyn FieldValues>>, Error>>;

impl<E: EntityKind> JoinSpec<E> {
    pub(crate) fn new<R: EntityKind>() -> Self
    where
        E: Related<R>,
    {
        Self {
            relation: <E as Related<R>>::RELATION,
            entity_name: R::ENTITY_NAME,
            fields: R::FIELDS,
            resolve: Box::new(|db, entity| {
                let Some(key) = <E as Related<R>>::related_key(entity) else {
                    return Ok(None);
                };

                let raw = db.with_data(|reg| {
                    reg.with_store(R::PATH, |store| store.get(&key).cloned())
                })?;

                match raw {
                    Some(raw) => {
                        let related = raw.try_decode::<R>()?;
                        Ok(Some(Box::new(related) as Box<dyn FieldValues>))
                    }
                    None => Ok(None),
                }
            }),
        }
    }

    pub(crate) const fn scope(&self) -> JoinScope {
        JoinScope {
            relation: self.relation,
            entity: self.entity_name,
            fields: self.fields,
        }
    }
}

///
/// MatchedRow
///
/// One decoded row that passed the filter, together with its resolved
/// relation (if the executor carries a join). Kept separate from
/// `Response` so terminals can still read joined paths after windowing.
///

pub(crate) struct MatchedRow<E: EntityKind> {
    pub key: Key,
    pub entity: E,
    pub related: Option<Box<dyn FieldValues>>,
}

impl<E: EntityKind> MatchedRow<E> {
    pub(crate) fn row<'a>(&'a self, join: Option<&'a JoinSpec<E>>) -> JoinedRow<'a> {
        JoinedRow {
            base: &self.entity,
            relation: join.map(|j| j.relation),
            related: self.related.as_deref(),
        }
    }
}

///
/// LoadExecutor
///

pub(crate) struct LoadExecutor<E: EntityKind> {
    db: Db,
    debug: bool,
    join: Option<JoinSpec<E>>,
}

impl<E: EntityKind> LoadExecutor<E> {
    #[must_use]
    pub(crate) const fn new(db: Db, debug: bool) -> Self {
        Self {
            db,
            debug,
            join: None,
        }
    }

    /// Attach a to-one join, making `relation.field` paths resolvable.
    #[must_use]
    pub(crate) fn join<R: EntityKind>(mut self) -> Self
    where
        E: Related<R>,
    {
        self.join = Some(JoinSpec::new::<R>());
        self
    }

    pub(crate) const fn join_spec(&self) -> Option<&JoinSpec<E>> {
        self.join.as_ref()
    }

    pub(crate) fn field_scope(&self) -> FieldScope {
        let scope = FieldScope::base::<E>();

        match &self.join {
            Some(join) => scope.join(join.scope()),
            None => scope,
        }
    }

    // ===== EXECUTION =====

    /// Full-scan match: validate, snapshot the store, decode and filter.
    /// Rows come back in primary-key order (store order) before sorting.
    pub(crate) fn matched(&self, query: &LoadQuery) -> Result<Vec<MatchedRow<E>>, Error> {
        validate_load(query, &self.field_scope())?;
        self.debug_log(format!("load {}: {query:?}", E::ENTITY_NAME));

        // Snapshot the rows so no store borrow is held while the join
        // resolver borrows a second store.
        let rows: Vec<(Key, RawRow)> = self.db.with_data(|reg| {
            reg.with_store(E::PATH, |store| {
                store.iter().map(|(k, v)| (*k, v.clone())).collect()
            })
        })?;

        record(MetricsEvent::RowsScanned {
            entity_path: E::PATH,
            rows_scanned: rows.len() as u64,
        });

        let filter = query.filter.clone().map(FilterExpr::simplify);

        let mut matched = Vec::new();
        for (key, raw) in rows {
            let entity = raw.try_decode::<E>()?;
            let related = match &self.join {
                Some(join) => (join.resolve)(self.db, &entity)?,
                None => None,
            };

            let keep = match &filter {
                Some(expr) => {
                    let row = JoinedRow {
                        base: &entity,
                        relation: self.join.as_ref().map(|j| j.relation),
                        related: related.as_deref(),
                    };
                    eval::eval(&row, expr)
                }
                None => true,
            };

            if keep {
                matched.push(MatchedRow {
                    key,
                    entity,
                    related,
                });
            }
        }

        Ok(matched)
    }

    /// Match, sort and window. Returns the pre-window total alongside the
    /// windowed rows so paged terminals report it without a second scan.
    pub(crate) fn execute_rows(
        &self,
        query: &LoadQuery,
    ) -> Result<(u64, Vec<MatchedRow<E>>), Error> {
        let mut span = Span::<E>::new(ExecKind::Load);

        let mut rows = self.matched(query)?;
        let total = rows.len() as u64;

        self.sort_rows(&mut rows, &query.sort);
        let rows = query.page.window(rows);
        span.set_rows(rows.len() as u64);

        Ok((total, rows))
    }

    pub(crate) fn execute(&self, query: &LoadQuery) -> Result<Response<E>, Error> {
        let (_, rows) = self.execute_rows(query)?;

        Ok(Response(
            rows.into_iter().map(|row| (row.key, row.entity)).collect(),
        ))
    }

    /// Stable multi-key sort; ties fall back to primary-key order so the
    /// result is deterministic regardless of sort-key collisions.
    fn sort_rows(&self, rows: &mut [MatchedRow<E>], sort: &SortExpr) {
        if sort.is_empty() {
            return;
        }

        rows.sort_by(|a, b| {
            for key in &sort.keys {
                let av = a.row(self.join.as_ref()).field(&key.field);
                let bv = b.row(self.join.as_ref()).field(&key.field);

                let ord = compare_presence(&av, &bv, key);
                if ord != Ordering::Equal {
                    return ord;
                }
            }

            a.key.cmp(&b.key)
        });
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
