use crate::{
    db::{
        query::QueryError,
        response::ResponseError,
        store::{RawRowError, RowDecodeError, StoreError},
    },
    patch::PatchError,
    serialize::SerializeError,
};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error type with a stable kind + origin taxonomy. Module errors
/// are folded into this shape at the crate boundary; callers branch on
/// `kind` (or the predicate helpers) and log `message`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Internal failure attributed to session-owned state.
    pub(crate) fn session_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Session, message)
    }

    /// Internal failure inside an executor.
    pub(crate) fn executor_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Executor, message)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Query(QueryErrorKind::Conflict))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::Query(QueryErrorKind::NotFound))
    }

    #[must_use]
    pub const fn is_not_unique(&self) -> bool {
        matches!(self.kind, ErrorKind::Query(QueryErrorKind::NotUnique))
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self.kind, ErrorKind::Query(QueryErrorKind::Invalid))
    }
}

impl From<SerializeError> for Error {
    fn from(err: SerializeError) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Serialize, err.to_string())
    }
}

impl From<RowDecodeError> for Error {
    fn from(err: RowDecodeError) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Serialize, err.to_string())
    }
}

impl From<RawRowError> for Error {
    fn from(err: RawRowError) -> Self {
        Self::new(ErrorKind::Store, ErrorOrigin::Store, err.to_string())
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::new(ErrorKind::Store, ErrorOrigin::Store, err.to_string())
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::UnknownField { .. } | QueryError::UnjoinedPath { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::Invalid),
                ErrorOrigin::Query,
                err.to_string(),
            ),

            QueryError::UnorderedPagination => Self::new(
                ErrorKind::Query(QueryErrorKind::UnorderedPagination),
                ErrorOrigin::Query,
                err.to_string(),
            ),
        }
    }
}

impl From<ResponseError> for Error {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::NotFound { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::NotFound),
                ErrorOrigin::Response,
                err.to_string(),
            ),

            ResponseError::NotUnique { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::NotUnique),
                ErrorOrigin::Response,
                err.to_string(),
            ),
        }
    }
}

impl From<PatchError> for Error {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::UnknownField { .. } | PatchError::InvalidRow { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::Invalid),
                ErrorOrigin::Executor,
                err.to_string(),
            ),

            PatchError::PrimaryKey { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::Unsupported),
                ErrorOrigin::Executor,
                err.to_string(),
            ),
        }
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The caller cannot remediate this.
    Internal,

    Query(QueryErrorKind),
    Store,
}

///
/// QueryErrorKind
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryErrorKind {
    /// A write collided with an existing row (insert on a taken key).
    Conflict,

    /// Query shape is invalid (unknown fields, unjoined paths, bad patches).
    Invalid,

    /// Valid query, but no rows matched where one was required.
    NotFound,

    /// Query expected one row but matched many.
    NotUnique,

    /// Offset pagination requires ordering but none was provided.
    UnorderedPagination,

    /// The query is valid but requests an unsupported operation.
    Unsupported,
}

///
/// ErrorOrigin
/// Which layer produced the error.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorOrigin {
    Executor,
    Query,
    Response,
    Serialize,
    Session,
    Store,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_keep_their_kind() {
        let err: Error = QueryError::UnorderedPagination.into();

        assert_eq!(
            err.kind,
            ErrorKind::Query(QueryErrorKind::UnorderedPagination)
        );
        assert_eq!(err.origin, ErrorOrigin::Query);
    }

    #[test]
    fn unknown_field_is_invalid() {
        let err: Error = QueryError::UnknownField {
            entity: "bin",
            field: "nope".into(),
        }
        .into();

        assert!(err.is_invalid());
        assert!(!err.is_not_found());
    }

    #[test]
    fn response_errors_map_to_query_kinds() {
        let err: Error = ResponseError::NotFound { entity: "bin" }.into();
        assert!(err.is_not_found());
        assert_eq!(err.origin, ErrorOrigin::Response);

        let err: Error = ResponseError::NotUnique {
            entity: "bin",
            count: 3,
        }
        .into();
        assert!(err.is_not_unique());
    }

    #[test]
    fn store_errors_are_store_kind() {
        let err: Error = StoreError::StoreNotFound("x".into()).into();
        assert_eq!(err.kind, ErrorKind::Store);
        assert_eq!(err.origin, ErrorOrigin::Store);
    }

    #[test]
    fn patching_the_primary_key_is_unsupported() {
        let err: Error = PatchError::PrimaryKey { entity: "bin" }.into();
        assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Unsupported));
    }

    #[test]
    fn message_is_the_display_form() {
        let err = Error::new(ErrorKind::Internal, ErrorOrigin::Session, "boom");
        assert_eq!(err.to_string(), "boom");
    }
}
