use crate::team::Team;
use rosterdb::{
    traits::{EntityKind, FieldValue, FieldValues, Path, ProjectFrom, Related},
    types::{Id, Key},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// Member
///
/// The owning side of the member/team relation: the reference lives on
/// the member row. Username and team are both genuinely optional, which
/// is what the null-ordering and missing-path suites lean on.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Member {
    pub id: Id<Member>,
    pub username: Option<String>,
    pub age: u32,
    pub team_id: Option<Id<Team>>,
}

impl Member {
    #[must_use]
    pub fn new(username: impl Into<String>, age: u32) -> Self {
        Self {
            id: Id::generate(),
            username: Some(username.into()),
            age,
            team_id: None,
        }
    }

    /// Anonymous member: no username, no team.
    #[must_use]
    pub fn anonymous(age: u32) -> Self {
        Self {
            id: Id::generate(),
            username: None,
            age,
            team_id: None,
        }
    }

    #[must_use]
    pub fn in_team(mut self, team: Id<Team>) -> Self {
        self.team_id = Some(team);
        self
    }
}

impl Path for Member {
    const PATH: &'static str = "club::member";
}

impl EntityKind for Member {
    const ENTITY_NAME: &'static str = "member";
    const PRIMARY_KEY: &'static str = "id";
    const FIELDS: &'static [&'static str] = &["id", "username", "age", "team_id"];

    fn key(&self) -> Key {
        self.id.key()
    }
}

impl FieldValues for Member {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "username" => Some(self.username.to_value()),
            "age" => Some(self.age.to_value()),
            "team_id" => Some(self.team_id.to_value()),
            _ => None,
        }
    }
}

impl Related<Team> for Member {
    const RELATION: &'static str = "team";

    fn related_key(&self) -> Option<Key> {
        self.team_id.map(Id::key)
    }
}

// ===== PROJECTIONS =====

///
/// MemberSummary
/// A narrower read-side view of a member, field names unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MemberSummary {
    pub username: Option<String>,
    pub age: u32,
}

impl ProjectFrom<Member> for MemberSummary {
    fn project(entity: &Member) -> Self {
        Self {
            username: entity.username.clone(),
            age: entity.age,
        }
    }
}

///
/// UserView
/// The same data under presentation names; `username` surfaces as `name`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UserView {
    pub name: Option<String>,
    pub age: u32,
}

impl ProjectFrom<Member> for UserView {
    fn project(entity: &Member) -> Self {
        Self {
            name: entity.username.clone(),
            age: entity.age,
        }
    }
}
