use crate::{member::Member, team::Team};
use rosterdb::{
    Error,
    db::DbSession,
    types::{Id, Key},
};

///
/// ClubSeed
/// Handles to the canonical dataset: two teams, four members.
///

pub struct ClubSeed {
    pub team_a: Id<Team>,
    pub team_b: Id<Team>,
    pub members: [Id<Member>; 4],
}

/// Seed the canonical club: teamA and teamB, then member1 (10, teamA),
/// member2 (20, teamA), member3 (30, teamB), member4 (40, teamB).
///
/// Keys are deterministic so suites can name rows directly, and member
/// key order matches member number. The seed flushes and clears, so the
/// caller's session starts with populated stores and nothing tracked.
pub fn seed_club(session: &DbSession) -> Result<ClubSeed, Error> {
    let team_a = team(0xA, "teamA");
    let team_b = team(0xB, "teamB");
    session.insert(team_a.clone())?;
    session.insert(team_b.clone())?;

    let members = [
        member(1, "member1", 10, team_a.id),
        member(2, "member2", 20, team_a.id),
        member(3, "member3", 30, team_b.id),
        member(4, "member4", 40, team_b.id),
    ];
    let member_ids = [members[0].id, members[1].id, members[2].id, members[3].id];
    session.insert_many(members)?;

    session.flush()?;
    session.clear();

    Ok(ClubSeed {
        team_a: team_a.id,
        team_b: team_b.id,
        members: member_ids,
    })
}

fn team(n: u128, name: &str) -> Team {
    Team {
        id: Id::from_key(Key::from_u128(n)),
        name: name.to_string(),
    }
}

fn member(n: u128, username: &str, age: u32, team: Id<Team>) -> Member {
    Member {
        id: Id::from_key(Key::from_u128(n)),
        username: Some(username.to_string()),
        age,
        team_id: Some(team),
    }
}
