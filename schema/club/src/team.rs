use crate::member::Member;
use rosterdb::{
    Error,
    db::{DbSession, query::FilterExpr},
    traits::{EntityKind, FieldValue, FieldValues, Path},
    types::{Id, Key},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// Team
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Team {
    pub id: Id<Team>,
    pub name: String,
}

impl Team {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::generate(),
            name: name.into(),
        }
    }
}

impl Path for Team {
    const PATH: &'static str = "club::team";
}

impl EntityKind for Team {
    const ENTITY_NAME: &'static str = "team";
    const PRIMARY_KEY: &'static str = "id";
    const FIELDS: &'static [&'static str] = &["id", "name"];

    fn key(&self) -> Key {
        self.id.key()
    }
}

impl FieldValues for Team {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "name" => Some(self.name.to_value()),
            _ => None,
        }
    }
}

/// The members currently referencing a team. The team row itself never
/// stores this list; the non-owning side of the relation is derived by
/// query.
pub fn members_of(session: &DbSession, team: Id<Team>) -> Result<Vec<Member>, Error> {
    Ok(session
        .load::<Member>()
        .filter(FilterExpr::eq("team_id", team))
        .all()?
        .entities())
}
