//! Query primitives: the filter algebra, sort and page specifications,
//! the declarative [`LoadQuery`], pre-execution validation, and the
//! runtime evaluator the executors share.

pub mod eval;
pub mod filter;
pub mod load;
pub mod page;
pub mod sort;
pub(crate) mod validate;

pub use filter::{Cmp, FilterClause, FilterExpr, FilterExprOpt};
pub use load::LoadQuery;
pub use page::PageExpr;
pub use sort::{Direction, NullOrder, SortExpr, SortKey};

use thiserror::Error as ThisError;

///
/// QueryError
///
/// Rejections raised while validating a query, before any row is read.
/// Evaluation itself never errors; everything that could go wrong at
/// runtime is caught here instead.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("unknown field '{field}' on {entity}")]
    UnknownField {
        entity: &'static str,
        field: String,
    },

    #[error("path '{path}' requires a joined relation")]
    UnjoinedPath { path: String },

    #[error("offset pagination requires an explicit sort order")]
    UnorderedPagination,
}
