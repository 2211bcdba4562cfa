use serde::Serialize;

pub const PER_PAGE: i64 = 20;

/// Highest page whose offset still fits an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / PER_PAGE;

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

/// Clamps a requested 1-based page number.
pub fn page_number(requested: Option<i64>) -> i64 {
    requested.filter(|page| *page >= 1).unwrap_or(1).min(MAX_PAGE)
}

pub fn offset(page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(PER_PAGE)
}

pub fn total_pages(total: i64) -> i64 {
    ((total + PER_PAGE - 1) / PER_PAGE).max(1)
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, total: i64) -> Page<T> {
        Page {
            items,
            page,
            total_pages: total_pages(total),
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_start_at_one() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(-3)), 1);
        assert_eq!(page_number(Some(4)), 4);
    }

    #[test]
    fn offsets_step_by_page_size() {
        assert_eq!(offset(1), 0);
        assert_eq!(offset(3), 40);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        assert_eq!(page_number(Some(i64::MAX)), MAX_PAGE);
        assert_eq!(offset(page_number(Some(i64::MAX))), (MAX_PAGE - 1) * PER_PAGE);
        assert!(offset(i64::MAX) > 0);
    }

    #[test]
    fn total_pages_rounds_up_and_never_hits_zero() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(20), 1);
        assert_eq!(total_pages(21), 2);
        assert_eq!(total_pages(95), 5);
    }
}
