//! Store-level executors.
//!
//! Executors read and write the thread-local stores directly and know
//! nothing about session tracking. Every executor call is one metrics
//! span; every row write is visible to the next read, which is exactly
//! the property sessions exploit (and bulk statements weaponize).

mod delete;
mod load;
mod patch;
mod save;

pub(crate) use delete::DeleteExecutor;
pub(crate) use load::{JoinSpec, LoadExecutor, MatchedRow};
pub(crate) use patch::PatchExecutor;
pub(crate) use save::SaveExecutor;

use crate::{
    Error,
    db::store::DataKey,
    error::{ErrorKind, ErrorOrigin, QueryErrorKind},
};
use thiserror::Error as ThisError;

///
/// ExecutorError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub(crate) enum ExecutorError {
    #[error("data key exists: {0}")]
    KeyExists(DataKey),

    #[error("data key not found: {0}")]
    KeyNotFound(DataKey),
}

impl From<ExecutorError> for Error {
    fn from(err: ExecutorError) -> Self {
        let kind = match &err {
            ExecutorError::KeyExists(_) => ErrorKind::Query(QueryErrorKind::Conflict),
            ExecutorError::KeyNotFound(_) => ErrorKind::Query(QueryErrorKind::NotFound),
        };

        Self::new(kind, ErrorOrigin::Executor, err.to_string())
    }
}

///
/// TESTS
///
