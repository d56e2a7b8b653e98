use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::MigrationId;

/// Total order over migration identifiers.
///
/// Every "earlier/later" decision in the catalogue and the sequencer goes
/// through this trait.
pub trait MigrationOrdering: Send + Sync + fmt::Debug {
    fn compare(&self, a: &MigrationId, b: &MigrationId) -> Ordering;
}

/// Plain byte-wise string comparison.
///
/// Identifiers must be zero-padded (or otherwise lexicographically monotonic)
/// for this to match chronological order: `10_x` sorts before `9_x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicographic;

impl MigrationOrdering for Lexicographic {
    fn compare(&self, a: &MigrationId, b: &MigrationId) -> Ordering {
        a.as_str().cmp(b.as_str())
    }
}

/// Compares the leading run of ASCII digits numerically, then the remainder
/// lexicographically.
///
/// `9_x` sorts before `10_x`. When either identifier has no numeric prefix the
/// whole strings are compared lexicographically.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericPrefix;

impl NumericPrefix {
    fn split(id: &str) -> (&str, &str) {
        let end = id
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(id.len());
        id.split_at(end)
    }

    fn compare_digits(a: &str, b: &str) -> Ordering {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

impl MigrationOrdering for NumericPrefix {
    fn compare(&self, a: &MigrationId, b: &MigrationId) -> Ordering {
        let (a_num, a_rest) = Self::split(a.as_str());
        let (b_num, b_rest) = Self::split(b.as_str());

        if a_num.is_empty() || b_num.is_empty() {
            return a.as_str().cmp(b.as_str());
        }

        Self::compare_digits(a_num, b_num)
            .then_with(|| a_rest.cmp(b_rest))
            // `001_x` and `1_x` are distinct identifiers; keep the order total.
            .then_with(|| a.as_str().cmp(b.as_str()))
    }
}

/// Configurable choice of ordering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    #[default]
    Lexicographic,
    NumericPrefix,
}

impl OrderingKind {
    pub fn comparator(self) -> Arc<dyn MigrationOrdering> {
        match self {
            OrderingKind::Lexicographic => Arc::new(Lexicographic),
            OrderingKind::NumericPrefix => Arc::new(NumericPrefix),
        }
    }
}

impl std::str::FromStr for OrderingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexicographic" => Ok(OrderingKind::Lexicographic),
            "numeric_prefix" | "numeric-prefix" => Ok(OrderingKind::NumericPrefix),
            other => Err(format!("unknown ordering scheme: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MigrationId {
        MigrationId::new(s)
    }

    #[test]
    fn test_lexicographic_is_plain_string_order() {
        let ord = Lexicographic;
        assert_eq!(ord.compare(&id("001_init"), &id("002_add")), Ordering::Less);
        assert_eq!(ord.compare(&id("10_late"), &id("9_early")), Ordering::Less);
        assert_eq!(ord.compare(&id("abc"), &id("abc")), Ordering::Equal);
    }

    #[test]
    fn test_numeric_prefix_compares_numbers() {
        let ord = NumericPrefix;
        assert_eq!(ord.compare(&id("9_early"), &id("10_late")), Ordering::Less);
        assert_eq!(ord.compare(&id("010_a"), &id("10_a")), Ordering::Less);
        assert_eq!(ord.compare(&id("2_b"), &id("2_a")), Ordering::Greater);
    }

    #[test]
    fn test_numeric_prefix_falls_back_without_digits() {
        let ord = NumericPrefix;
        assert_eq!(ord.compare(&id("alpha"), &id("beta")), Ordering::Less);
        assert_eq!(ord.compare(&id("1_a"), &id("alpha")), Ordering::Less);
    }

    #[test]
    fn test_numeric_prefix_handles_huge_timestamps() {
        let ord = NumericPrefix;
        assert_eq!(
            ord.compare(&id("20240101000000_a"), &id("99999999999999999999999_b")),
            Ordering::Less
        );
    }

    #[test]
    fn test_ordering_kind_parse() {
        assert_eq!(
            "numeric_prefix".parse::<OrderingKind>().unwrap(),
            OrderingKind::NumericPrefix
        );
        assert!("semver".parse::<OrderingKind>().is_err());
    }
}
