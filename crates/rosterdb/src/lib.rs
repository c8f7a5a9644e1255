//! RosterDB runtime: entity traits, the filter algebra, executors, and the
//! session layer that fronts them.
//!
//! Two tiers of state, one rule each:
//! - thread-local [`db::store::DataStore`]s hold the authoritative rows;
//! - a [`db::DbSession`] overlays tracked snapshots and staged writes on
//!   top, and only its bulk statements go around that overlay.

// public exports are one module level down
pub mod db;
pub mod error;
pub mod obs;
pub mod patch;
pub mod serialize;
pub mod traits;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, stores, or serializers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            Db, DbSession, Paged, Response,
            query::{Cmp, Direction, FilterExpr, LoadQuery, NullOrder},
            store::{DataStore, StoreRegistry},
        },
        error::{Error, ErrorKind},
        patch::Patch,
        traits::{EntityKind, FieldValue as _, FieldValues, Path, ProjectFrom, Related},
        types::{Id, Key},
        value::Value,
    };
    pub use serde::{Deserialize, Serialize};
}
