use crate::db::query::{
    filter::FilterExpr,
    page::PageExpr,
    sort::{Direction, NullOrder, SortExpr, SortKey},
};
use serde::{Deserialize, Serialize};

///
/// LoadQuery
///
/// Declarative description of one load: what to match, how to order it,
/// which window to return. Executors interpret it; sessions build it
/// through the fluent layer. Repeated filters conjoin, repeated sort
/// calls append keys.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct LoadQuery {
    pub filter: Option<FilterExpr>,
    pub sort: SortExpr,
    pub page: PageExpr,
}

impl LoadQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// And a filter into the query.
    #[must_use]
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Append a sort key with default null placement.
    #[must_use]
    pub fn sort(self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort_key(SortKey::new(field, direction))
    }

    /// Append a sort key with explicit null placement.
    #[must_use]
    pub fn sort_with(
        self,
        field: impl Into<String>,
        direction: Direction,
        nulls: NullOrder,
    ) -> Self {
        self.sort_key(SortKey::new(field, direction).nulls(nulls))
    }

    #[must_use]
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.sort.keys.push(key);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.page.offset = offset;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.page.limit = Some(limit);
        self
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_filters_conjoin() {
        let query = LoadQuery::new()
            .filter(FilterExpr::eq("a", 1))
            .filter(FilterExpr::gt("b", 2));

        match query.filter {
            Some(FilterExpr::And(children)) => assert_eq!(children.len(), 2),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn sort_keys_accumulate_in_call_order() {
        let query = LoadQuery::new()
            .sort("age", Direction::Desc)
            .sort_with("username", Direction::Asc, NullOrder::Last);

        assert_eq!(query.sort.keys.len(), 2);
        assert_eq!(query.sort.keys[0].field, "age");
        assert_eq!(query.sort.keys[1].nulls, NullOrder::Last);
    }

    #[test]
    fn window_fields_are_plain_setters() {
        let query = LoadQuery::new().offset(3).limit(10);

        assert_eq!(query.page.offset, 3);
        assert_eq!(query.page.limit, Some(10));
    }
}
