use crate::{
    db::query::{QueryError, filter::FilterExpr, load::LoadQuery},
    traits::EntityKind,
};

///
/// JoinScope
/// Field surface contributed by one joined relation.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct JoinScope {
    pub relation: &'static str,
    pub entity: &'static str,
    pub fields: &'static [&'static str],
}

///
/// FieldScope
///
/// The set of paths a query is allowed to name: the base entity's
/// declared fields, plus `relation.field` paths once a join is present.
/// Validation happens against this scope before any row is read, so
/// evaluation can stay total.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldScope {
    base_entity: &'static str,
    base_fields: &'static [&'static str],
    joined: Option<JoinScope>,
}

impl FieldScope {
    pub(crate) fn base<E: EntityKind>() -> Self {
        Self {
            base_entity: E::ENTITY_NAME,
            base_fields: E::FIELDS,
            joined: None,
        }
    }

    pub(crate) const fn join(mut self, scope: JoinScope) -> Self {
        self.joined = Some(scope);
        self
    }

    /// Resolve one path or say precisely why it does not resolve.
    pub(crate) fn resolve(&self, path: &str) -> Result<(), QueryError> {
        if let Some((prefix, rest)) = path.split_once('.') {
            return match self.joined {
                Some(join) if join.relation == prefix => {
                    if join.fields.iter().any(|f| *f == rest) {
                        Ok(())
                    } else {
                        Err(QueryError::UnknownField {
                            entity: join.entity,
                            field: rest.to_string(),
                        })
                    }
                }
                _ => Err(QueryError::UnjoinedPath {
                    path: path.to_string(),
                }),
            };
        }

        if self.base_fields.iter().any(|f| *f == path) {
            Ok(())
        } else {
            Err(QueryError::UnknownField {
                entity: self.base_entity,
                field: path.to_string(),
            })
        }
    }
}

///
/// Validate every clause of a bare filter expression against a scope.
/// Delete and patch statements use this directly; they carry no sort or
/// page to check.
///

pub(crate) fn validate_filter(filter: &FilterExpr, scope: &FieldScope) -> Result<(), QueryError> {
    let mut first_err: Option<QueryError> = None;
    filter.for_each_clause(&mut |clause| {
        if first_err.is_none()
            && let Err(err) = scope.resolve(&clause.field)
        {
            first_err = Some(err);
        }
    });

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

///
/// Validate a load query against a field scope.
///
/// Checks, in order:
/// - every filter clause names a resolvable path;
/// - every sort key names a resolvable path;
/// - a non-zero offset comes with at least one sort key. Offsets over an
///   unspecified order would page through nondeterministic windows.
///

pub(crate) fn validate_load(query: &LoadQuery, scope: &FieldScope) -> Result<(), QueryError> {
    if let Some(filter) = &query.filter {
        validate_filter(filter, scope)?;
    }

    for key in &query.sort.keys {
        scope.resolve(&key.field)?;
    }

    if query.page.offset > 0 && query.sort.is_empty() {
        return Err(QueryError::UnorderedPagination);
    }

    Ok(())
}

///
/// TESTS
///
