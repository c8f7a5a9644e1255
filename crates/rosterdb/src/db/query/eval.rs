use crate::{
    db::query::filter::{Cmp, FilterClause, FilterExpr},
    traits::FieldValues,
    value::Value,
};
use std::cmp::Ordering;

///
/// FieldPresence
///
/// Result of attempting to read a field from a row during evaluation.
/// This distinguishes between a missing field and a present field whose
/// value may be `Null`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum FieldPresence {
    /// Field exists and has a value (including `Value::Null`).
    Present(Value),
    /// Field is not present on the row.
    Missing,
}

///
/// Row
///
/// Abstraction over a row-like value that can expose fields by name.
/// This decouples filter evaluation from concrete entity types.
///

pub(crate) trait Row {
    fn field(&self, name: &str) -> FieldPresence;
}

///
/// Default `Row` implementation for any type that exposes
/// `FieldValues`, which is the standard runtime entity interface.
///

impl<T: FieldValues> Row for T {
    fn field(&self, name: &str) -> FieldPresence {
        match self.get_value(name) {
            Some(value) => FieldPresence::Present(value),
            None => FieldPresence::Missing,
        }
    }
}

///
/// JoinedRow
///
/// A base row widened with one optional to-one relation. Paths prefixed
/// with the relation name resolve against the related row; everything
/// else resolves against the base. An unresolved relation (absent
/// reference or dangling key) makes every relation path `Missing`, which
/// is what gives joined filters inner-join semantics without a dedicated
/// join node.
///

pub(crate) struct JoinedRow<'a> {
    pub base: &'a dyn FieldValues,
    pub relation: Option<&'static str>,
    pub related: Option<&'a dyn FieldValues>,
}

impl Row for JoinedRow<'_> {
    fn field(&self, name: &str) -> FieldPresence {
        if let Some(relation) = self.relation
            && let Some(rest) = name.strip_prefix(relation)
            && let Some(field) = rest.strip_prefix('.')
        {
            return match self.related {
                Some(related) => match related.get_value(field) {
                    Some(value) => FieldPresence::Present(value),
                    None => FieldPresence::Missing,
                },
                None => FieldPresence::Missing,
            };
        }

        match self.base.get_value(name) {
            Some(value) => FieldPresence::Present(value),
            None => FieldPresence::Missing,
        }
    }
}

///
/// Evaluate a filter expression against a single row.
///
/// Pure runtime evaluation: no schema access, no validation. Evaluation
/// is total; it never errors and never panics. A missing field fails
/// every comparison, including `IsNone`. A present `Null` satisfies
/// `IsNone` only. A comparison that is not defined for the value pair
/// (type mismatch, null operand) is simply `false`.
///
/// CONTRACT: internal-only; expressions must be validated before
/// evaluation so that `false` here always means "no match", never
/// "typo'd field name".
///
#[must_use]
pub(crate) fn eval<R: Row + ?Sized>(row: &R, expr: &FilterExpr) -> bool {
    match expr {
        FilterExpr::True => true,
        FilterExpr::False => false,

        FilterExpr::And(children) => children.iter().all(|child| eval(row, child)),
        FilterExpr::Or(children) => children.iter().any(|child| eval(row, child)),
        FilterExpr::Not(inner) => !eval(row, inner),

        FilterExpr::Clause(clause) => eval_clause(row, clause),
    }
}

fn eval_clause<R: Row + ?Sized>(row: &R, clause: &FilterClause) -> bool {
    let FilterClause { field, cmp, value } = clause;

    // Presence checks see the raw tri-state; everything else needs a
    // present, non-null actual.
    match cmp {
        Cmp::IsNone => matches!(row.field(field), FieldPresence::Present(Value::Null)),
        Cmp::IsSome => matches!(row.field(field), FieldPresence::Present(v) if !v.is_null()),
        _ => {
            let FieldPresence::Present(actual) = row.field(field) else {
                return false;
            };
            if actual.is_null() {
                return false;
            }

            eval_compare(*cmp, &actual, value)
        }
    }
}

///
/// Evaluate one comparison against a present, non-null actual.
///
/// NOTE: comparison helpers return None when a comparison is invalid;
/// eval treats that as false.
///
fn eval_compare(cmp: Cmp, actual: &Value, value: &Value) -> bool {
    match cmp {
        Cmp::Eq => compare_eq(actual, value).unwrap_or(false),
        Cmp::Ne => compare_eq(actual, value).is_some_and(|v| !v),

        Cmp::EqCi => compare_eq_ci(actual, value).unwrap_or(false),
        Cmp::NeCi => compare_eq_ci(actual, value).is_some_and(|v| !v),

        Cmp::Lt => compare_order(actual, value).is_some_and(Ordering::is_lt),
        Cmp::Lte => compare_order(actual, value).is_some_and(Ordering::is_le),
        Cmp::Gt => compare_order(actual, value).is_some_and(Ordering::is_gt),
        Cmp::Gte => compare_order(actual, value).is_some_and(Ordering::is_ge),

        Cmp::In => in_list(actual, value).unwrap_or(false),
        Cmp::NotIn => in_list(actual, value).is_some_and(|matched| !matched),

        Cmp::Contains => contains(actual, value, TextMode::Cs),
        Cmp::ContainsCi => contains(actual, value, TextMode::Ci),

        Cmp::StartsWith => compare_text(actual, value, |a, b| a.starts_with(b)).unwrap_or(false),
        Cmp::EndsWith => compare_text(actual, value, |a, b| a.ends_with(b)).unwrap_or(false),

        // Presence checks never reach the null guard above.
        Cmp::IsNone | Cmp::IsSome => false,
    }
}

#[derive(Clone, Copy)]
enum TextMode {
    Cs,
    Ci,
}

///
/// Strict equality: defined only for two non-null values of the same
/// variant. `Null` never equals anything, so `Ne` against null is also
/// not a match.
///
fn compare_eq(actual: &Value, expected: &Value) -> Option<bool> {
    if actual.is_null() || expected.is_null() {
        return None;
    }
    if std::mem::discriminant(actual) != std::mem::discriminant(expected) {
        return None;
    }

    Some(actual == expected)
}

/// Case-insensitive equality, defined for text pairs only.
fn compare_eq_ci(actual: &Value, expected: &Value) -> Option<bool> {
    match (actual, expected) {
        (Value::Text(a), Value::Text(b)) => Some(a.to_lowercase() == b.to_lowercase()),
        _ => None,
    }
}

///
/// Ordering: defined for same-variant scalar pairs. Lists do not order
/// under a clause even though `Value` itself is totally ordered for
/// sorting.
///
fn compare_order(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Bool(_), Value::Bool(_))
        | (Value::Int(_), Value::Int(_))
        | (Value::Text(_), Value::Text(_))
        | (Value::Ulid(_), Value::Ulid(_)) => Some(actual.cmp(expected)),
        _ => None,
    }
}

/// Text predicate defined for text pairs only.
fn compare_text(actual: &Value, expected: &Value, f: impl Fn(&str, &str) -> bool) -> Option<bool> {
    match (actual, expected) {
        (Value::Text(a), Value::Text(b)) => Some(f(a, b)),
        _ => None,
    }
}

///
/// Check whether a value equals any element in a list. `None` when the
/// operand is not a list or no element was comparable at all.
///
fn in_list(actual: &Value, list: &Value) -> Option<bool> {
    let Value::List(items) = list else {
        return None;
    };

    let mut saw_valid = false;
    for item in items {
        match compare_eq(actual, item) {
            Some(true) => return Some(true),
            Some(false) => saw_valid = true,
            None => {}
        }
    }

    saw_valid.then_some(false)
}

///
/// `Contains`: substring when the actual is text, membership when the
/// actual is a list. `Ci` only changes the text comparisons.
///
fn contains(actual: &Value, needle: &Value, mode: TextMode) -> bool {
    match actual {
        Value::Text(haystack) => {
            let Value::Text(needle) = needle else {
                return false;
            };
            match mode {
                TextMode::Cs => haystack.contains(needle),
                TextMode::Ci => haystack.to_lowercase().contains(&needle.to_lowercase()),
            }
        }
        Value::List(items) => items.iter().any(|item| match mode {
            TextMode::Cs => compare_eq(item, needle).unwrap_or(false),
            TextMode::Ci => compare_eq_ci(item, needle)
                .or_else(|| compare_eq(item, needle))
                .unwrap_or(false),
        }),
        _ => false,
    }
}

///
/// TESTS
///


#[cfg(test)]
mod property {
    use super::*;
    use crate::db::query::filter::Cmp;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[derive(Clone, Debug)]
    struct TestRow {
        fields: BTreeMap<String, Value>,
    }

    impl FieldValues for TestRow {
        fn get_value(&self, field: &str) -> Option<Value> {
            self.fields.get(field).cloned()
        }
    }

    // "ghost" stays absent from every row so missing-field totality is
    // part of the generated space.
    const FIELDS: [&str; 4] = ["name", "qty", "active", "ghost"];

    fn arb_field() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(FIELDS[0].to_string()),
            Just(FIELDS[1].to_string()),
            Just(FIELDS[2].to_string()),
            Just(FIELDS[3].to_string()),
        ]
    }

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Int),
            any::<bool>().prop_map(Value::Bool),
            "[a-zA-Z0-9_]{0,8}".prop_map(Value::Text),
            Just(Value::Null),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            arb_scalar(),
            prop::collection::vec(arb_scalar(), 0..4).prop_map(Value::List),
        ]
    }

    fn arb_cmp() -> impl Strategy<Value = Cmp> {
        prop_oneof![
            Just(Cmp::Eq),
            Just(Cmp::Ne),
            Just(Cmp::EqCi),
            Just(Cmp::NeCi),
            Just(Cmp::Lt),
            Just(Cmp::Lte),
            Just(Cmp::Gt),
            Just(Cmp::Gte),
            Just(Cmp::In),
            Just(Cmp::NotIn),
            Just(Cmp::Contains),
            Just(Cmp::ContainsCi),
            Just(Cmp::StartsWith),
            Just(Cmp::EndsWith),
            Just(Cmp::IsNone),
            Just(Cmp::IsSome),
        ]
    }

    fn arb_expr() -> impl Strategy<Value = FilterExpr> {
        let leaf = prop_oneof![
            Just(FilterExpr::True),
            Just(FilterExpr::False),
            (arb_field(), arb_cmp(), arb_value())
                .prop_map(|(field, cmp, value)| FilterExpr::clause(field, cmp, value)),
        ];

        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(FilterExpr::And),
                prop::collection::vec(inner.clone(), 0..4).prop_map(FilterExpr::Or),
                inner.prop_map(|e| FilterExpr::Not(Box::new(e))),
            ]
        })
    }

    fn arb_row() -> impl Strategy<Value = TestRow> {
        prop::collection::vec(
            prop_oneof![Just(None), arb_value().prop_map(Some)],
            FIELDS.len(),
        )
        .prop_map(|values| {
            let mut fields = BTreeMap::new();
            for (name, value) in FIELDS.iter().zip(values) {
                if let Some(value) = value {
                    fields.insert((*name).to_string(), value);
                }
            }
            TestRow { fields }
        })
    }

    proptest! {
        #[test]
        fn simplify_is_meaning_preserving(expr in arb_expr(), row in arb_row()) {
            let simplified = expr.clone().simplify();
            prop_assert_eq!(eval(&row, &expr), eval(&row, &simplified));
        }

        #[test]
        fn conjunction_is_order_independent(
            children in prop::collection::vec(arb_expr(), 0..5),
            row in arb_row(),
        ) {
            let mut reversed = children.clone();
            reversed.reverse();

            prop_assert_eq!(
                eval(&row, &FilterExpr::And(children.clone())),
                eval(&row, &FilterExpr::And(reversed.clone()))
            );
            prop_assert_eq!(
                eval(&row, &FilterExpr::Or(children)),
                eval(&row, &FilterExpr::Or(reversed))
            );
        }

        #[test]
        fn missing_fields_fail_every_comparison(cmp in arb_cmp(), value in arb_value()) {
            let row = TestRow { fields: BTreeMap::new() };
            let expr = FilterExpr::clause("ghost", cmp, value);

            prop_assert!(!eval(&row, &expr));
        }
    }
}
