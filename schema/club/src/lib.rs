//! Member/Team fixtures for the rosterdb end-to-end suites.
//!
//! A two-entity club schema with an optional to-one relation from
//! member to team, a composable `MemberSearch` condition, store wiring,
//! and one canonical seed dataset the integration suites share.

pub mod db;
pub mod member;
pub mod search;
pub mod seed;
pub mod team;

pub use db::{club_db, club_session, reset_club};
pub use member::{Member, MemberSummary, UserView};
pub use search::MemberSearch;
pub use seed::{ClubSeed, seed_club};
pub use team::{Team, members_of};
