//! Bulk statements and the tracked-snapshot staleness they leave
//! behind. Bulk writes go straight to the store; rows read before the
//! statement keep their pre-mutation values until the session clears.

use rosterdb::prelude::*;
use rosterdb_club_fixtures::{ClubSeed, Member, club_session, reset_club, seed_club};

fn seeded() -> (DbSession, ClubSeed) {
    reset_club();
    let session = club_session();
    let seed = seed_club(&session).expect("seed club");

    (session, seed)
}

#[test]
fn bulk_patch_reports_affected_rows() {
    let (session, _) = seeded();

    let patched = session
        .patch_where::<Member>(
            FilterExpr::lt("age", 28),
            &Patch::new().set("username", "retired"),
        )
        .unwrap();

    assert_eq!(patched, 2);
}

#[test]
fn tracked_reads_stay_stale_until_clear() {
    let (session, seed) = seeded();

    // Reading first is what arms the hazard.
    let before = session.find::<Member>(seed.members[0]).unwrap().unwrap();
    assert_eq!(before.username.as_deref(), Some("member1"));

    session
        .patch_where::<Member>(
            FilterExpr::lt("age", 28),
            &Patch::new().set("username", "retired"),
        )
        .unwrap();

    // The snapshot wins over the mutated store row.
    let stale = session.find::<Member>(seed.members[0]).unwrap().unwrap();
    assert_eq!(stale.username.as_deref(), Some("member1"));

    session.clear();

    let fresh = session.find::<Member>(seed.members[0]).unwrap().unwrap();
    assert_eq!(fresh.username.as_deref(), Some("retired"));
}

#[test]
fn loads_overlay_stale_snapshots_too() {
    let (session, _) = seeded();

    // Track all four rows.
    session.load::<Member>().all().unwrap();

    session
        .patch_where::<Member>(
            FilterExpr::lt("age", 28),
            &Patch::new().set("username", "retired"),
        )
        .unwrap();

    let names: Vec<Option<String>> = session
        .load::<Member>()
        .filter(FilterExpr::lt("age", 28))
        .all()
        .unwrap()
        .entities()
        .into_iter()
        .map(|m| m.username)
        .collect();
    assert_eq!(
        names,
        [Some("member1".to_string()), Some("member2".to_string())]
    );

    session.clear();

    let names: Vec<Option<String>> = session
        .load::<Member>()
        .filter(FilterExpr::lt("age", 28))
        .all()
        .unwrap()
        .entities()
        .into_iter()
        .map(|m| m.username)
        .collect();
    assert_eq!(
        names,
        [Some("retired".to_string()), Some("retired".to_string())]
    );
}

#[test]
fn scalar_reads_see_the_store_immediately() {
    let (session, _) = seeded();

    session.load::<Member>().all().unwrap();
    session
        .patch_where::<Member>(FilterExpr::True, &Patch::new().incr("age", 1))
        .unwrap();

    // No discard needed: scalar terminals bypass tracked snapshots.
    assert_eq!(session.load::<Member>().sum_by("age").unwrap(), 104);
}

#[test]
fn bulk_increment_follows_the_safe_sequence() {
    let (session, seed) = seeded();

    let patched = session
        .patch_where::<Member>(FilterExpr::True, &Patch::new().incr("age", 1))
        .unwrap();
    assert_eq!(patched, 4);

    session.clear();

    let ages: Vec<u32> = session
        .load::<Member>()
        .sort("age", Direction::Asc)
        .all()
        .unwrap()
        .entities()
        .iter()
        .map(|m| m.age)
        .collect();
    assert_eq!(ages, [11, 21, 31, 41]);

    let first = session.find::<Member>(seed.members[0]).unwrap().unwrap();
    assert_eq!(first.age, 11);
}

#[test]
fn bulk_patch_can_null_a_field() {
    let (session, seed) = seeded();

    session
        .patch_where::<Member>(
            FilterExpr::eq("username", "member2"),
            &Patch::new().set_null("username"),
        )
        .unwrap();
    session.clear();

    let cleared = session.find::<Member>(seed.members[1]).unwrap().unwrap();
    assert!(cleared.username.is_none());
}

#[test]
fn bulk_delete_counts_rows_and_keeps_snapshots() {
    let (session, seed) = seeded();

    let before = session.find::<Member>(seed.members[3]).unwrap().unwrap();
    assert_eq!(before.age, 40);

    let deleted = session
        .delete_where::<Member>(FilterExpr::gt("age", 18))
        .unwrap();
    assert_eq!(deleted, 3);

    // The store is down to one row, but the snapshot still answers.
    assert_eq!(session.load::<Member>().count().unwrap(), 1);
    assert!(session.is_loaded::<Member>(seed.members[3]));
    let stale = session.find::<Member>(seed.members[3]).unwrap().unwrap();
    assert_eq!(stale.age, 40);

    session.clear();
    assert!(session.find::<Member>(seed.members[3]).unwrap().is_none());
}

#[test]
fn empty_patches_and_missing_matches_touch_nothing() {
    let (session, _) = seeded();

    let patched = session
        .patch_where::<Member>(FilterExpr::True, &Patch::new())
        .unwrap();
    assert_eq!(patched, 0);

    let deleted = session
        .delete_where::<Member>(FilterExpr::gt("age", 99))
        .unwrap();
    assert_eq!(deleted, 0);
}

#[test]
fn staged_writes_flush_before_the_bulk_statement() {
    let (session, _) = seeded();

    let rookie = Member::new("rookie", 15);
    let rookie_id = rookie.id;
    session.insert(rookie).unwrap();
    assert_eq!(session.pending_writes(), 1);

    // The staged insert lands first, so the new row is patched too.
    let patched = session
        .patch_where::<Member>(FilterExpr::lt("age", 28), &Patch::new().incr("age", 1))
        .unwrap();
    assert_eq!(patched, 3);
    assert_eq!(session.pending_writes(), 0);

    session.clear();
    let rookie = session.find::<Member>(rookie_id).unwrap().unwrap();
    assert_eq!(rookie.age, 16);
}
