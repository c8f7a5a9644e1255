use crate::{
    error::Error,
    traits::{EntityKind, ProjectFrom},
    types::Key,
};
use derive_more::IntoIterator;
use thiserror::Error as ThisError;

///
/// Row
///

pub type Row<E> = (Key, E);

///
/// ResponseError
/// Errors related to interpreting a materialized response.
///

#[derive(Debug, ThisError)]
pub enum ResponseError {
    #[error("expected exactly one row, found 0 (entity {entity})")]
    NotFound { entity: &'static str },

    #[error("expected exactly one row, found {count} (entity {entity})")]
    NotUnique { entity: &'static str, count: u64 },
}

///
/// Response
/// Materialized query result: ordered `(Key, Entity)` pairs.
///

#[derive(Debug, IntoIterator)]
pub struct Response<E: EntityKind>(#[into_iterator(owned, ref)] pub Vec<Row<E>>);

impl<E: EntityKind> Response<E> {
    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    pub fn row(self) -> Result<Row<E>, Error> {
        let count = self.count();
        match self.0.into_iter().next() {
            Some(row) if count == 1 => Ok(row),
            Some(_) => Err(ResponseError::NotUnique {
                entity: E::ENTITY_NAME,
                count,
            }
            .into()),
            None => Err(ResponseError::NotFound {
                entity: E::ENTITY_NAME,
            }
            .into()),
        }
    }

    pub fn try_row(self) -> Result<Option<Row<E>>, Error> {
        let count = self.count();
        if count > 1 {
            return Err(ResponseError::NotUnique {
                entity: E::ENTITY_NAME,
                count,
            }
            .into());
        }

        Ok(self.0.into_iter().next())
    }

    #[must_use]
    pub fn rows(self) -> Vec<Row<E>> {
        self.0
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn entity(self) -> Result<E, Error> {
        self.row().map(|(_, e)| e)
    }

    pub fn try_entity(self) -> Result<Option<E>, Error> {
        Ok(self.try_row()?.map(|(_, e)| e))
    }

    #[must_use]
    pub fn entities(self) -> Vec<E> {
        self.0.into_iter().map(|(_, e)| e).collect()
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.0.iter().map(|(k, _)| *k).collect()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Project every row into a narrower view type.
    #[must_use]
    pub fn project<P: ProjectFrom<E>>(&self) -> Vec<P> {
        self.0.iter().map(|(_, e)| P::project(e)).collect()
    }

    // ------------------------------------------------------------------
    // Explicitly non-strict access (escape hatches)
    // ------------------------------------------------------------------

    /// NOTE: Bypasses cardinality checks. Prefer strict APIs unless intentional.
    #[must_use]
    pub fn first(self) -> Option<Row<E>> {
        self.0.into_iter().next()
    }

    #[must_use]
    pub fn first_entity(self) -> Option<E> {
        self.first().map(|(_, e)| e)
    }
}

///
/// Paged
/// One window of a result set, with the window parameters echoed back and
/// the total match count from before windowing.
///

#[derive(Debug)]
pub struct Paged<E: EntityKind> {
    pub offset: u64,
    pub limit: Option<u64>,
    pub total: u64,
    pub response: Response<E>,
}

///
/// TESTS
///
