pub mod executor;
pub mod query;
pub mod response;
pub mod session;
pub mod store;

pub use response::{Paged, Response, ResponseError, Row};
pub use session::{DbSession, SessionGroupQuery, SessionLoadQuery};

use crate::db::store::StoreRegistry;
use std::thread::LocalKey;

///
/// Db
///
/// A handle to a registry of thread-local stores. `Db` is the entry
/// point executors read and write through; sessions wrap one `Db` and
/// layer snapshot tracking on top of it.
///

pub struct Db {
    data: &'static LocalKey<StoreRegistry>,
}

impl Db {
    #[must_use]
    pub const fn new(data: &'static LocalKey<StoreRegistry>) -> Self {
        Self { data }
    }

    /// Run a closure with read access to the store registry.
    pub fn with_data<R>(&self, f: impl FnOnce(&StoreRegistry) -> R) -> R {
        self.data.with(|reg| f(reg))
    }
}

// Manual Copy + Clone implementations.
// Safe because Db only contains a &'static LocalKey handle,
// duplicating it does not duplicate the stores.
impl Copy for Db {}

impl Clone for Db {
    fn clone(&self) -> Self {
        *self
    }
}
