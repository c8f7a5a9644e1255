use serde::{Deserialize, Serialize};

///
/// PageExpr
///
/// Offset/limit window applied after filtering and sorting. `offset`
/// counts skipped rows; `limit` of `None` means unbounded.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageExpr {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl PageExpr {
    #[must_use]
    pub const fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// Whether this window actually constrains anything.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Apply the window to an already-sorted row set.
    pub(crate) fn window<T>(&self, rows: Vec<T>) -> Vec<T> {
        let mut iter = rows.into_iter().skip(usize::try_from(self.offset).unwrap_or(usize::MAX));

        match self.limit {
            Some(limit) => iter
                .by_ref()
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => iter.collect(),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_unbounded() {
        let page = PageExpr::default();
        assert!(page.is_unbounded());
        assert_eq!(page.window(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn offset_skips_and_limit_caps() {
        let page = PageExpr::new(1, Some(2));
        assert_eq!(page.window(vec![1, 2, 3, 4]), vec![2, 3]);
    }

    #[test]
    fn offset_past_the_end_is_empty() {
        let page = PageExpr::new(10, None);
        assert_eq!(page.window(vec![1, 2, 3]), Vec::<i32>::new());
    }

    #[test]
    fn limit_zero_is_empty() {
        let page = PageExpr::new(0, Some(0));
        assert_eq!(page.window(vec![1, 2, 3]), Vec::<i32>::new());
    }
}
