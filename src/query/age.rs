//! Patient age ranges
//!
//! Each unit of an [`AgeQuery`] holds either a single value (`"5"`) or a
//! range (`"5-10"`). Units are converted to days and summed into one
//! inclusive `[min, max]` range.

use serde::{Deserialize, Serialize};

use crate::models::AgeQuery;

/// Inclusive range of patient ages, in days
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min_days: u32,
    pub max_days: u32,
}

impl AgeRange {
    /// `None` when no unit carried a usable value
    pub fn from_query(query: &AgeQuery) -> Option<AgeRange> {
        let units = [
            (query.years.as_deref(), 365),
            (query.months.as_deref(), 30),
            (query.weeks.as_deref(), 7),
            (query.days.as_deref(), 1),
        ];

        let mut range: Option<(u64, u64)> = None;
        for (value, multiplier) in units {
            let Some((low, high)) = value.and_then(parse_part) else {
                continue;
            };
            let (min, max) = range.get_or_insert((0, 0));
            *min = min.saturating_add(low.saturating_mul(multiplier));
            *max = max.saturating_add(high.saturating_mul(multiplier));
        }

        range.map(|(min, max)| {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            AgeRange {
                min_days: clamp(min),
                max_days: clamp(max),
            }
        })
    }

    pub fn contains(&self, days: u32) -> bool {
        days >= self.min_days && days <= self.max_days
    }
}

/// `"a"` → (a, a); `"a-b"` → (a, b); `"a-junk"` → (a, a). A lower bound
/// that is not a number drops the whole part.
fn parse_part(text: &str) -> Option<(u64, u64)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut pieces = text.split('-');
    let low: u64 = pieces.next()?.trim().parse().ok()?;
    let high = pieces
        .next()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(low);
    Some((low, high))
}

fn clamp(days: u64) -> u32 {
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min_days: u32, max_days: u32) -> Option<AgeRange> {
        Some(AgeRange { min_days, max_days })
    }

    #[test]
    fn test_single_years() {
        assert_eq!(AgeRange::from_query(&AgeQuery::years("5")), range(1825, 1825));
    }

    #[test]
    fn test_year_range() {
        assert_eq!(AgeRange::from_query(&AgeQuery::years("5-10")), range(1825, 3650));
    }

    #[test]
    fn test_units_are_summed() {
        let query = AgeQuery::years("1").with_months("2-3").with_days("4");
        assert_eq!(
            AgeRange::from_query(&query),
            range(365 + 60 + 4, 365 + 90 + 4)
        );
    }

    #[test]
    fn test_malformed_parts() {
        // junk upper bound collapses to the lower bound
        assert_eq!(AgeRange::from_query(&AgeQuery::years("5-x")), range(1825, 1825));
        assert_eq!(AgeRange::from_query(&AgeQuery::years("5-")), range(1825, 1825));
        // junk lower bound drops the part
        assert_eq!(AgeRange::from_query(&AgeQuery::years("x-5")), None);
        assert_eq!(AgeRange::from_query(&AgeQuery::years("-5")), None);
        assert_eq!(
            AgeRange::from_query(&AgeQuery::years("abc").with_weeks("2")),
            range(14, 14)
        );
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(AgeRange::from_query(&AgeQuery::default()), None);
        assert_eq!(AgeRange::from_query(&AgeQuery::years("  ")), None);
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        assert_eq!(AgeRange::from_query(&AgeQuery::years("10-5")), range(1825, 3650));
    }

    #[test]
    fn test_huge_values_saturate() {
        assert_eq!(
            AgeRange::from_query(&AgeQuery::years("100000000000000000")),
            range(u32::MAX, u32::MAX)
        );
        assert_eq!(
            AgeRange::from_query(&AgeQuery::years("1-18446744073709551615").with_days("2")),
            range(367, u32::MAX)
        );
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = AgeRange {
            min_days: 10,
            max_days: 20,
        };
        assert!(r.contains(10));
        assert!(r.contains(20));
        assert!(!r.contains(9));
        assert!(!r.contains(21));
    }
}
