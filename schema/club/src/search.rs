use crate::{member::Member, team::Team};
use rosterdb::db::{DbSession, SessionLoadQuery, query::FilterExpr};
use serde::{Deserialize, Serialize};

///
/// MemberSearch
///
/// Optional search condition over members. Every field is independently
/// optional; `filter()` conjoins only the present ones, in declaration
/// order, and degenerates to the match-all identity when none are set.
///
/// Matching is exact and case-sensitive. Callers who want otherwise
/// reach for the `*_ci` clause constructors themselves.
///
/// An empty condition matches the whole table. Pair it with paging
/// unless the member set is known to be small.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MemberSearch {
    pub username: Option<String>,
    pub team_name: Option<String>,
    pub age_goe: Option<u32>,
    pub age_loe: Option<u32>,
}

impl MemberSearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    #[must_use]
    pub const fn age_goe(mut self, age: u32) -> Self {
        self.age_goe = Some(age);
        self
    }

    #[must_use]
    pub const fn age_loe(mut self, age: u32) -> Self {
        self.age_loe = Some(age);
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.team_name.is_none()
            && self.age_goe.is_none()
            && self.age_loe.is_none()
    }

    /// Conjunction of the present fields, in declaration order. Absent
    /// fields contribute nothing; with every field absent this is
    /// `True`, never a missing expression.
    #[must_use]
    pub fn filter(&self) -> FilterExpr {
        FilterExpr::True
            .and_option(
                self.username
                    .as_deref()
                    .map(|username| FilterExpr::eq("username", username)),
            )
            .and_option(
                self.team_name
                    .as_deref()
                    .map(|team_name| FilterExpr::eq("team.name", team_name)),
            )
            .and_option(self.age_goe.map(|age| FilterExpr::gte("age", age)))
            .and_option(self.age_loe.map(|age| FilterExpr::lte("age", age)))
            .simplify()
    }

    /// A team-joined member load with this condition applied. The join
    /// is structural, present whether or not `team_name` is set, so one
    /// query shape serves every condition.
    #[must_use]
    pub fn query<'a>(&self, session: &'a DbSession) -> SessionLoadQuery<'a, Member> {
        session.load::<Member>().join::<Team>().filter(self.filter())
    }
}
