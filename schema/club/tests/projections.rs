//! Scalar reads and typed projections: values, distinct values, tuples,
//! and narrowed views of loaded rows.

use rosterdb::prelude::*;
use rosterdb_club_fixtures::{
    ClubSeed, Member, MemberSummary, Team, UserView, club_session, reset_club, seed_club,
};

fn seeded() -> (DbSession, ClubSeed) {
    reset_club();
    let session = club_session();
    let seed = seed_club(&session).expect("seed club");

    (session, seed)
}

#[test]
fn values_follow_the_declared_sort() {
    let (session, _) = seeded();

    let names = session
        .load::<Member>()
        .sort("age", Direction::Desc)
        .values_by("username")
        .unwrap();

    assert_eq!(
        names,
        [
            Value::Text("member4".to_string()),
            Value::Text("member3".to_string()),
            Value::Text("member2".to_string()),
            Value::Text("member1".to_string()),
        ]
    );
}

#[test]
fn distinct_keeps_the_first_occurrence() {
    let (session, _) = seeded();

    // A second ten-year-old.
    session.insert(Member::new("member5", 10)).unwrap();
    session.flush().unwrap();

    let ages = session
        .load::<Member>()
        .sort("age", Direction::Asc)
        .distinct_values_by("age")
        .unwrap();

    assert_eq!(
        ages,
        [
            Value::Int(10),
            Value::Int(20),
            Value::Int(30),
            Value::Int(40),
        ]
    );
}

#[test]
fn tuples_follow_the_requested_path_order() {
    let (session, _) = seeded();

    let rows = session
        .load::<Member>()
        .sort("age", Direction::Asc)
        .limit(2)
        .tuples_by(&["username", "age"])
        .unwrap();

    assert_eq!(
        rows,
        [
            vec![Value::Text("member1".to_string()), Value::Int(10)],
            vec![Value::Text("member2".to_string()), Value::Int(20)],
        ]
    );
}

#[test]
fn tuples_reach_through_joins() {
    let (session, _) = seeded();

    let rows = session
        .load::<Member>()
        .join::<Team>()
        .filter(FilterExpr::eq("username", "member3"))
        .tuples_by(&["username", "team.name"])
        .unwrap();

    assert_eq!(
        rows,
        [vec![
            Value::Text("member3".to_string()),
            Value::Text("teamB".to_string()),
        ]]
    );
}

#[test]
fn missing_values_surface_as_null() {
    let (session, _) = seeded();

    session.insert(Member::anonymous(50)).unwrap();
    session.flush().unwrap();

    let names = session
        .load::<Member>()
        .sort("age", Direction::Asc)
        .values_by("username")
        .unwrap();

    assert_eq!(names.len(), 5);
    assert_eq!(names[4], Value::Null);
}

#[test]
fn summaries_project_the_loaded_rows() {
    let (session, _) = seeded();

    let response = session
        .load::<Member>()
        .sort("age", Direction::Asc)
        .all()
        .unwrap();
    let summaries: Vec<MemberSummary> = response.project();

    assert_eq!(summaries.len(), 4);
    assert_eq!(
        summaries[0],
        MemberSummary {
            username: Some("member1".to_string()),
            age: 10,
        }
    );
}

#[test]
fn views_rename_through_serde() {
    let (session, _) = seeded();

    let response = session
        .load::<Member>()
        .filter(FilterExpr::eq("username", "member1"))
        .all()
        .unwrap();
    let views: Vec<UserView> = response.project();

    let json = serde_json::to_value(&views[0]).unwrap();
    assert_eq!(json, serde_json::json!({ "name": "member1", "age": 10 }));
}

#[test]
fn case_insensitive_lookup_is_an_explicit_variant() {
    let (session, _) = seeded();

    let canonical = session
        .load::<Member>()
        .filter(FilterExpr::eq("username", "MEMBER1"))
        .count()
        .unwrap();
    assert_eq!(canonical, 0);

    let folded = session
        .load::<Member>()
        .filter(FilterExpr::eq_ci("username", "MEMBER1"))
        .one()
        .unwrap();
    assert_eq!(folded.age, 10);
}
