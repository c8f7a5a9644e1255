use crate::{
    Error,
    db::{
        Db,
        executor::{LoadExecutor, MatchedRow},
        query::{
            Direction, FilterExpr, LoadQuery, NullOrder,
            eval::{FieldPresence, Row as _},
        },
        response::{Paged, Response},
        session::DbSession,
        store::{DataKey, RawRow},
    },
    obs::{ExecKind, Span},
    traits::{EntityKind, Related},
    types::Key,
    value::Value,
};
use std::collections::BTreeMap;

type FetchFn<E> = Box<dyn Fn(Db, &E) -> Result<Option<(DataKey, RawRow)>, Error>>;

///
/// SessionLoadQuery
///
/// Fluent load bound to a session. Builders refine the query; terminals
/// flush staged writes, execute, and (for entity results) pass rows
/// through the session's tracked overlay. Scalar and aggregate
/// terminals read the store truth and leave tracking alone.
///

pub struct SessionLoadQuery<'a, E: EntityKind> {
    session: &'a DbSession,
    executor: LoadExecutor<E>,
    query: LoadQuery,
    fetch: Option<FetchFn<E>>,
}

impl<'a, E: EntityKind> SessionLoadQuery<'a, E> {
    pub(crate) fn new(session: &'a DbSession, executor: LoadExecutor<E>) -> Self {
        Self {
            session,
            executor,
            query: LoadQuery::new(),
            fetch: None,
        }
    }

    // ===== BUILDERS =====

    /// And a filter into the query.
    #[must_use]
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.query = self.query.filter(expr);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.query = self.query.sort(field, direction);
        self
    }

    #[must_use]
    pub fn sort_with(
        mut self,
        field: impl Into<String>,
        direction: Direction,
        nulls: NullOrder,
    ) -> Self {
        self.query = self.query.sort_with(field, direction, nulls);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    /// Join the `R` relation so `relation.field` paths resolve in
    /// filters, sorts and projections.
    #[must_use]
    pub fn join<R: EntityKind>(mut self) -> Self
    where
        E: Related<R>,
    {
        self.executor = self.executor.join::<R>();
        self
    }

    /// Fetch join: entity terminals also materialize each row's related
    /// `R` into the session's tracked state. Without this, related rows
    /// stay untracked.
    #[must_use]
    pub fn fetch_related<R: EntityKind>(mut self) -> Self
    where
        E: Related<R>,
    {
        self.fetch = Some(Box::new(|db, entity| {
            let Some(key) = <E as Related<R>>::related_key(entity) else {
                return Ok(None);
            };

            let raw = db
                .with_data(|reg| reg.with_store(R::PATH, |store| store.get(&key).cloned()))?;

            Ok(raw.map(|raw| (DataKey::new::<R>(key), raw)))
        }));
        self
    }

    /// Switch to grouped terminals keyed by `path`.
    #[must_use]
    pub fn group_by(self, path: impl Into<String>) -> SessionGroupQuery<'a, E> {
        SessionGroupQuery {
            inner: self,
            group_path: path.into(),
        }
    }

    // ===== ENTITY TERMINALS =====

    /// Fetch all matching rows through the tracked overlay.
    pub fn all(self) -> Result<Response<E>, Error> {
        self.session.flush()?;

        let response = self.executor.execute(&self.query)?;
        let rows = self.materialize(response.0)?;

        Ok(Response(rows))
    }

    /// Fetch exactly one row; zero or many is an error.
    pub fn one(self) -> Result<E, Error> {
        self.all()?.entity()
    }

    /// Fetch at most one row; many is an error.
    pub fn one_opt(self) -> Result<Option<E>, Error> {
        self.all()?.try_entity()
    }

    /// Fetch the first row of the ordered result, if any.
    pub fn first(self) -> Result<Option<E>, Error> {
        Ok(self.limit(1).all()?.first_entity())
    }

    /// Fetch one window plus the total matched count.
    pub fn paged(self) -> Result<Paged<E>, Error> {
        self.session.flush()?;

        let (total, rows) = self.executor.execute_rows(&self.query)?;
        let rows = rows.into_iter().map(|row| (row.key, row.entity)).collect();
        let rows = self.materialize(rows)?;

        Ok(Paged {
            offset: self.query.page.offset,
            limit: self.query.page.limit,
            total,
            response: Response(rows),
        })
    }

    // ===== SCALAR TERMINALS =====

    // Scalar reads reflect the store, not the overlay: they are not
    // entity loads and nothing gets tracked.

    /// Project one path over the effective result window.
    pub fn values_by(self, path: impl AsRef<str>) -> Result<Vec<Value>, Error> {
        let path = path.as_ref();
        self.executor.field_scope().resolve(path)?;
        self.session.flush()?;

        let (_, rows) = self.executor.execute_rows(&self.query)?;
        let join = self.executor.join_spec();

        Ok(rows
            .iter()
            .map(|row| presence_value(row.row(join).field(path)))
            .collect())
    }

    /// Project one path, de-duplicated, preserving first occurrence.
    pub fn distinct_values_by(self, path: impl AsRef<str>) -> Result<Vec<Value>, Error> {
        let values = self.values_by(path)?;

        let mut out: Vec<Value> = Vec::new();
        for value in values {
            if !out.contains(&value) {
                out.push(value);
            }
        }

        Ok(out)
    }

    /// Project several paths per row, in path order.
    pub fn tuples_by(self, paths: &[&str]) -> Result<Vec<Vec<Value>>, Error> {
        for path in paths {
            self.executor.field_scope().resolve(path)?;
        }
        self.session.flush()?;

        let (_, rows) = self.executor.execute_rows(&self.query)?;
        let join = self.executor.join_spec();

        Ok(rows
            .iter()
            .map(|row| {
                let joined = row.row(join);
                paths
                    .iter()
                    .map(|path| presence_value(joined.field(path)))
                    .collect()
            })
            .collect())
    }

    // ===== AGGREGATE TERMINALS =====

    // Aggregates fold the matched set: ordering and windowing do not
    // change a sum. Null and missing values are skipped, as in SQL.

    pub fn count(self) -> Result<u64, Error> {
        Ok(self.aggregate_rows()?.len() as u64)
    }

    pub fn exists(self) -> Result<bool, Error> {
        Ok(!self.aggregate_rows()?.is_empty())
    }

    /// Sum of an integer path; 0 when nothing is addable.
    pub fn sum_by(self, path: impl AsRef<str>) -> Result<i64, Error> {
        let path = path.as_ref();
        self.executor.field_scope().resolve(path)?;

        let rows = self.aggregate_rows()?;
        let join = self.executor.join_spec();

        let mut sum: i64 = 0;
        for row in &rows {
            if let FieldPresence::Present(value) = row.row(join).field(path)
                && let Some(n) = value.as_int()
            {
                sum = sum.saturating_add(n);
            }
        }

        Ok(sum)
    }

    /// Mean of an integer path; `None` when nothing is addable.
    pub fn avg_by(self, path: impl AsRef<str>) -> Result<Option<f64>, Error> {
        let path = path.as_ref();
        self.executor.field_scope().resolve(path)?;

        let rows = self.aggregate_rows()?;
        let join = self.executor.join_spec();

        let mut sum: i64 = 0;
        let mut n: u64 = 0;
        for row in &rows {
            if let FieldPresence::Present(value) = row.row(join).field(path)
                && let Some(v) = value.as_int()
            {
                sum = sum.saturating_add(v);
                n += 1;
            }
        }

        if n == 0 {
            return Ok(None);
        }

        Ok(Some(sum as f64 / n as f64))
    }

    /// Smallest non-null value of a path, under `Value` ordering.
    pub fn min_by(self, path: impl AsRef<str>) -> Result<Option<Value>, Error> {
        let path = path.as_ref();
        self.executor.field_scope().resolve(path)?;

        let rows = self.aggregate_rows()?;
        let join = self.executor.join_spec();

        let mut best: Option<Value> = None;
        for row in &rows {
            if let FieldPresence::Present(value) = row.row(join).field(path)
                && !value.is_null()
                && best.as_ref().is_none_or(|b| value < *b)
            {
                best = Some(value);
            }
        }

        Ok(best)
    }

    /// Largest non-null value of a path, under `Value` ordering.
    pub fn max_by(self, path: impl AsRef<str>) -> Result<Option<Value>, Error> {
        let path = path.as_ref();
        self.executor.field_scope().resolve(path)?;

        let rows = self.aggregate_rows()?;
        let join = self.executor.join_spec();

        let mut best: Option<Value> = None;
        for row in &rows {
            if let FieldPresence::Present(value) = row.row(join).field(path)
                && !value.is_null()
                && best.as_ref().is_none_or(|b| value > *b)
            {
                best = Some(value);
            }
        }

        Ok(best)
    }

    // ===== INTERNALS =====

    fn aggregate_rows(&self) -> Result<Vec<MatchedRow<E>>, Error> {
        self.session.flush()?;

        let mut span = Span::<E>::new(ExecKind::Aggregate);
        let rows = self.executor.matched(&self.query)?;
        span.set_rows(rows.len() as u64);

        Ok(rows)
    }

    fn materialize(&self, rows: Vec<(Key, E)>) -> Result<Vec<(Key, E)>, Error> {
        let rows = self.session.absorb(rows)?;

        if let Some(fetch) = &self.fetch {
            for (_, entity) in &rows {
                if let Some((data_key, raw)) = fetch(self.session.db(), entity)? {
                    // An existing snapshot keeps overlay priority.
                    self.session.track_raw_if_absent(data_key, raw);
                }
            }
        }

        Ok(rows)
    }
}

///
/// SessionGroupQuery
///
/// Grouped aggregate terminals. Groups are keyed by a path's value
/// (missing and null group together under `Value::Null`) and come back
/// ordered by group key.
///

pub struct SessionGroupQuery<'a, E: EntityKind> {
    inner: SessionLoadQuery<'a, E>,
    group_path: String,
}

impl<E: EntityKind> SessionGroupQuery<'_, E> {
    pub fn count(self) -> Result<Vec<(Value, u64)>, Error> {
        let groups = self.grouped_rows()?;

        Ok(groups
            .into_iter()
            .map(|(key, rows)| (key, rows.len() as u64))
            .collect())
    }

    pub fn sum_by(self, path: impl AsRef<str>) -> Result<Vec<(Value, i64)>, Error> {
        let path = path.as_ref();
        self.inner.executor.field_scope().resolve(path)?;

        let groups = self.grouped_rows()?;
        let join = self.inner.executor.join_spec();

        Ok(groups
            .into_iter()
            .map(|(key, rows)| {
                let mut sum: i64 = 0;
                for row in &rows {
                    if let FieldPresence::Present(value) = row.row(join).field(path)
                        && let Some(n) = value.as_int()
                    {
                        sum = sum.saturating_add(n);
                    }
                }
                (key, sum)
            })
            .collect())
    }

    /// Per-group mean. Groups with nothing addable are omitted, as SQL
    /// AVG over all nulls yields NULL.
    pub fn avg_by(self, path: impl AsRef<str>) -> Result<Vec<(Value, f64)>, Error> {
        let path = path.as_ref();
        self.inner.executor.field_scope().resolve(path)?;

        let groups = self.grouped_rows()?;
        let join = self.inner.executor.join_spec();

        Ok(groups
            .into_iter()
            .filter_map(|(key, rows)| {
                let mut sum: i64 = 0;
                let mut n: u64 = 0;
                for row in &rows {
                    if let FieldPresence::Present(value) = row.row(join).field(path)
                        && let Some(v) = value.as_int()
                    {
                        sum = sum.saturating_add(v);
                        n += 1;
                    }
                }

                if n == 0 {
                    None
                } else {
                    Some((key, sum as f64 / n as f64))
                }
            })
            .collect())
    }

    /// Per-group minimum; groups with no non-null values are omitted.
    pub fn min_by(self, path: impl AsRef<str>) -> Result<Vec<(Value, Value)>, Error> {
        self.extremum_by(path.as_ref(), |candidate, best| candidate < best)
    }

    /// Per-group maximum; groups with no non-null values are omitted.
    pub fn max_by(self, path: impl AsRef<str>) -> Result<Vec<(Value, Value)>, Error> {
        self.extremum_by(path.as_ref(), |candidate, best| candidate > best)
    }

    fn extremum_by(
        self,
        path: &str,
        better: impl Fn(&Value, &Value) -> bool,
    ) -> Result<Vec<(Value, Value)>, Error> {
        self.inner.executor.field_scope().resolve(path)?;

        let groups = self.grouped_rows()?;
        let join = self.inner.executor.join_spec();

        Ok(groups
            .into_iter()
            .filter_map(|(key, rows)| {
                let mut best: Option<Value> = None;
                for row in &rows {
                    if let FieldPresence::Present(value) = row.row(join).field(path)
                        && !value.is_null()
                        && best.as_ref().is_none_or(|b| better(&value, b))
                    {
                        best = Some(value);
                    }
                }

                best.map(|value| (key, value))
            })
            .collect())
    }

    fn grouped_rows(&self) -> Result<Vec<(Value, Vec<MatchedRow<E>>)>, Error> {
        self.inner
            .executor
            .field_scope()
            .resolve(&self.group_path)?;
        self.inner.session.flush()?;

        let mut span = Span::<E>::new(ExecKind::Aggregate);
        let rows = self.inner.executor.matched(&self.inner.query)?;
        span.set_rows(rows.len() as u64);

        let join = self.inner.executor.join_spec();
        let mut groups: BTreeMap<Value, Vec<MatchedRow<E>>> = BTreeMap::new();
        for row in rows {
            let group_key = presence_value(row.row(join).field(&self.group_path));
            groups.entry(group_key).or_default().push(row);
        }

        Ok(groups.into_iter().collect())
    }
}

fn presence_value(presence: FieldPresence) -> Value {
    match presence {
        FieldPresence::Present(value) => value,
        FieldPresence::Missing => Value::Null,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{Bin, Part, reset_stores, seed_bin, seed_part, test_session};

    #[test]
    fn loads_pass_through_tracking() {
        reset_stores();
        let session = test_session();
        let id = seed_part(1, Some("axle"), 4, None);

        let res = session.load::<Part>().all().unwrap();
        assert_eq!(res.count(), 1);
        assert!(session.is_loaded::<Part>(id));
    }

    #[test]
    fn tracked_snapshots_overlay_later_loads() {
        reset_stores();
        let session = test_session();
        let id = seed_part(1, Some("axle"), 4, None);

        // First read snapshots the row.
        session.load::<Part>().all().unwrap();

        // Mutate the store behind the session.
        crate::db::executor::PatchExecutor::<Part>::new(session.db(), false)
            .apply(
                &FilterExpr::True,
                &crate::patch::Patch::new().set("qty", 99),
            )
            .unwrap();

        // The session still reads its snapshot...
        let stale = session.find::<Part>(id).unwrap().unwrap();
        assert_eq!(stale.qty, 4);
        let via_load = session.load::<Part>().all().unwrap();
        assert_eq!(via_load.0[0].1.qty, 4);

        // ...until it clears.
        session.clear();
        let fresh = session.find::<Part>(id).unwrap().unwrap();
        assert_eq!(fresh.qty, 99);
    }

    #[test]
    fn one_is_strict_in_both_directions() {
        reset_stores();
        let session = test_session();

        let err = session.load::<Part>().one().unwrap_err();
        assert!(err.is_not_found());

        seed_part(1, Some("axle"), 1, None);
        seed_part(2, Some("bolt"), 2, None);

        let err = session.load::<Part>().one().unwrap_err();
        assert!(err.is_not_unique());

        let entity = session
            .load::<Part>()
            .filter(FilterExpr::eq("name", "axle"))
            .one()
            .unwrap();
        assert_eq!(entity.qty, 1);
    }

    #[test]
    fn first_takes_the_head_of_the_order() {
        reset_stores();
        let session = test_session();
        seed_part(1, Some("axle"), 5, None);
        seed_part(2, Some("bolt"), 9, None);

        let first = session
            .load::<Part>()
            .sort("qty", Direction::Desc)
            .first()
            .unwrap()
            .unwrap();

        assert_eq!(first.name.as_deref(), Some("bolt"));
        assert!(session.load::<Part>().filter(FilterExpr::False).first().unwrap().is_none());
    }

    #[test]
    fn paged_reports_the_prewindow_total() {
        reset_stores();
        let session = test_session();
        for (n, qty) in [(1, 1), (2, 2), (3, 3), (4, 4)] {
            seed_part(n, Some("p"), qty, None);
        }

        let paged = session
            .load::<Part>()
            .sort("qty", Direction::Asc)
            .offset(1)
            .limit(2)
            .paged()
            .unwrap();

        assert_eq!(paged.total, 4);
        assert_eq!(paged.offset, 1);
        assert_eq!(paged.limit, Some(2));
        assert_eq!(paged.response.count(), 2);
        assert_eq!(paged.response.0[0].1.qty, 2);
    }

    #[test]
    fn scalar_terminals_do_not_track() {
        reset_stores();
        let session = test_session();
        let id = seed_part(1, Some("axle"), 4, None);

        let values = session.load::<Part>().values_by("name").unwrap();
        assert_eq!(values, vec![Value::Text("axle".into())]);
        assert!(!session.is_loaded::<Part>(id));
    }

    #[test]
    fn values_by_reads_joined_paths() {
        reset_stores();
        let session = test_session();
        let bin = seed_bin(10, "spares");
        seed_part(1, Some("axle"), 1, Some(bin));
        seed_part(2, Some("bolt"), 2, None);

        let labels = session
            .load::<Part>()
            .join::<Bin>()
            .values_by("bin.label")
            .unwrap();

        assert_eq!(
            labels,
            vec![Value::Text("spares".into()), Value::Null]
        );
    }

    #[test]
    fn distinct_preserves_first_occurrence() {
        reset_stores();
        let session = test_session();
        seed_part(1, Some("axle"), 7, None);
        seed_part(2, Some("bolt"), 7, None);
        seed_part(3, Some("gear"), 5, None);

        let values = session.load::<Part>().distinct_values_by("qty").unwrap();
        assert_eq!(values, vec![Value::Int(7), Value::Int(5)]);
    }

    #[test]
    fn tuples_follow_path_order() {
        reset_stores();
        let session = test_session();
        seed_part(1, Some("axle"), 7, None);

        let tuples = session
            .load::<Part>()
            .tuples_by(&["qty", "name"])
            .unwrap();

        assert_eq!(
            tuples,
            vec![vec![Value::Int(7), Value::Text("axle".into())]]
        );
    }

    #[test]
    fn aggregates_skip_missing_and_null() {
        reset_stores();
        let session = test_session();
        seed_part(1, Some("axle"), 10, None);
        seed_part(2, None, 20, None);

        assert_eq!(session.load::<Part>().count().unwrap(), 2);
        assert!(session.load::<Part>().exists().unwrap());
        assert_eq!(session.load::<Part>().sum_by("qty").unwrap(), 30);
        assert_eq!(session.load::<Part>().avg_by("qty").unwrap(), Some(15.0));
        assert_eq!(
            session.load::<Part>().min_by("qty").unwrap(),
            Some(Value::Int(10))
        );
        assert_eq!(
            session.load::<Part>().max_by("qty").unwrap(),
            Some(Value::Int(20))
        );

        // Null names do not contribute to extremes.
        assert_eq!(
            session.load::<Part>().min_by("name").unwrap(),
            Some(Value::Text("axle".into()))
        );
    }

    #[test]
    fn empty_aggregates_have_identities() {
        reset_stores();
        let session = test_session();

        assert_eq!(session.load::<Part>().count().unwrap(), 0);
        assert!(!session.load::<Part>().exists().unwrap());
        assert_eq!(session.load::<Part>().sum_by("qty").unwrap(), 0);
        assert_eq!(session.load::<Part>().avg_by("qty").unwrap(), None);
        assert_eq!(session.load::<Part>().min_by("qty").unwrap(), None);
    }

    #[test]
    fn group_terminals_key_by_value() {
        reset_stores();
        let session = test_session();
        let bin_a = seed_bin(10, "alpha");
        let bin_b = seed_bin(11, "beta");
        seed_part(1, Some("p1"), 10, Some(bin_a));
        seed_part(2, Some("p2"), 20, Some(bin_a));
        seed_part(3, Some("p3"), 30, Some(bin_b));

        let counts = session
            .load::<Part>()
            .join::<Bin>()
            .group_by("bin.label")
            .count()
            .unwrap();
        assert_eq!(
            counts,
            vec![
                (Value::Text("alpha".into()), 2),
                (Value::Text("beta".into()), 1),
            ]
        );

        let avgs = session
            .load::<Part>()
            .join::<Bin>()
            .group_by("bin.label")
            .avg_by("qty")
            .unwrap();
        assert_eq!(
            avgs,
            vec![
                (Value::Text("alpha".into()), 15.0),
                (Value::Text("beta".into()), 30.0),
            ]
        );
    }

    #[test]
    fn ungrouped_rows_group_under_null() {
        reset_stores();
        let session = test_session();
        let bin_a = seed_bin(10, "alpha");
        seed_part(1, Some("p1"), 10, Some(bin_a));
        seed_part(2, Some("p2"), 20, None);

        let counts = session
            .load::<Part>()
            .join::<Bin>()
            .group_by("bin.label")
            .count()
            .unwrap();

        // Null group sorts first under value ordering.
        assert_eq!(
            counts,
            vec![(Value::Null, 1), (Value::Text("alpha".into()), 1)]
        );
    }

    #[test]
    fn fetch_related_materializes_related_rows() {
        reset_stores();
        let session = test_session();
        let bin = seed_bin(10, "spares");
        seed_part(1, Some("axle"), 1, Some(bin));

        session.load::<Part>().join::<Bin>().all().unwrap();
        assert!(!session.is_loaded::<Bin>(bin));

        session
            .load::<Part>()
            .join::<Bin>()
            .fetch_related::<Bin>()
            .all()
            .unwrap();
        assert!(session.is_loaded::<Bin>(bin));
    }

    #[test]
    fn terminals_flush_staged_writes_first() {
        reset_stores();
        let session = test_session();
        let bin = crate::test_fixtures::bin(1, "spares");

        session.insert(bin).unwrap();
        assert_eq!(session.load::<Bin>().count().unwrap(), 1);
        assert_eq!(session.pending_writes(), 0);
    }
}
