//! Store wiring for the club schema.

use crate::{member::Member, team::Team};
use rosterdb::{
    db::{
        Db, DbSession,
        store::{DataStore, StoreRegistry},
    },
    traits::Path,
};
use std::cell::RefCell;

thread_local! {
    static TEAM_STORE: RefCell<DataStore> = RefCell::new(DataStore::new());
    static MEMBER_STORE: RefCell<DataStore> = RefCell::new(DataStore::new());

    static REGISTRY: StoreRegistry = {
        let mut reg = StoreRegistry::new();
        reg.register(Team::PATH, &TEAM_STORE);
        reg.register(Member::PATH, &MEMBER_STORE);
        reg
    };
}

#[must_use]
pub fn club_db() -> Db {
    Db::new(&REGISTRY)
}

#[must_use]
pub fn club_session() -> DbSession {
    DbSession::new(club_db())
}

/// Empty both stores. The test harness can reuse threads, so suites
/// call this before seeding instead of assuming a fresh thread local.
pub fn reset_club() {
    TEAM_STORE.with_borrow_mut(|s| s.clear());
    MEMBER_STORE.with_borrow_mut(|s| s.clear());
}
