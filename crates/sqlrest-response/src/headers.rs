//! `Content-Range` composition (§4.5, §6, §8 property 8).

use std::fmt;

/// `Content-Range` header value: `<unit> <start>-<end>/<total or *>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRange {
    pub start: i64,
    pub end: i64,
    pub total: Option<i64>,
    pub unit: String,
}

impl ContentRange {
    pub fn new(start: i64, end: i64, total: Option<i64>) -> Self {
        Self {
            start,
            end,
            total,
            unit: "items".to_string(),
        }
    }

    /// Compose the range for one page of results (§8 property 8): non-empty
    /// results get `offset-(offset+len-1)/total`; an empty result set
    /// collapses to `offset-offset/0` regardless of whatever `total` the
    /// caller passed in, since there is nothing in range to report.
    pub fn from_pagination(offset: i64, limit: Option<i64>, result_len: i64, total: Option<i64>) -> Self {
        if result_len == 0 {
            return Self::new(offset, offset, Some(0));
        }
        let end = match limit {
            Some(l) => (offset + l - 1).min(offset + result_len - 1).max(offset),
            None => offset + result_len - 1,
        };
        Self::new(offset, end, total)
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{} {}-{}/{}", self.unit, self.start, self.end, total),
            None => write!(f, "{} {}-{}/*", self.unit, self.start, self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_known_total() {
        let range = ContentRange::new(0, 9, Some(100));
        assert_eq!(range.to_string(), "items 0-9/100");
    }

    #[test]
    fn displays_with_unknown_total() {
        let range = ContentRange::new(10, 19, None);
        assert_eq!(range.to_string(), "items 10-19/*");
    }

    #[test]
    fn pagination_first_page() {
        let range = ContentRange::from_pagination(0, Some(10), 10, Some(100));
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 9);
    }

    #[test]
    fn pagination_partial_last_page() {
        let range = ContentRange::from_pagination(90, Some(10), 5, Some(95));
        assert_eq!(range.start, 90);
        assert_eq!(range.end, 94);
    }

    #[test]
    fn empty_result_collapses_to_zero_total() {
        let range = ContentRange::from_pagination(20, Some(10), 0, Some(100));
        assert_eq!(range.to_string(), "items 20-20/0");
    }
}
