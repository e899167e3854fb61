use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar month of a record
///
/// The derived ordering follows declaration order, so sorting by `Month`
/// always yields Jan, Feb, ..., Dec and never the lexicographic order of the
/// abbreviations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

const FULL_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

impl Month {
    /// All months in calendar order
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Zero-based position in the calendar (Jan = 0)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Month from its 1-based calendar number
    pub fn from_number(number: i64) -> Option<Self> {
        if (1..=12).contains(&number) {
            Self::from_index((number - 1) as usize)
        } else {
            None
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// Category order handed to the charting layer for the month axis
    pub fn category_order() -> Vec<String> {
        Self::ALL.iter().map(|m| m.abbrev().to_string()).collect()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMonth(pub String);

impl fmt::Display for UnknownMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown month '{}'", self.0)
    }
}

impl std::error::Error for UnknownMonth {}

impl FromStr for Month {
    type Err = UnknownMonth;

    /// Accepts "Jan", "jan", "January" and calendar numbers "1".."12"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        if let Ok(number) = lower.parse::<i64>() {
            return Month::from_number(number).ok_or_else(|| UnknownMonth(s.to_string()));
        }

        Month::ALL
            .iter()
            .zip(FULL_NAMES.iter())
            .find(|(month, full)| lower == month.abbrev().to_lowercase() || lower == **full)
            .map(|(month, _)| *month)
            .ok_or_else(|| UnknownMonth(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_abbreviations_full_names_and_numbers() {
        assert_eq!("Jan".parse::<Month>(), Ok(Month::Jan));
        assert_eq!("sep".parse::<Month>(), Ok(Month::Sep));
        assert_eq!(" December ".parse::<Month>(), Ok(Month::Dec));
        assert_eq!("3".parse::<Month>(), Ok(Month::Mar));
        assert!("13".parse::<Month>().is_err());
        assert!("Smarch".parse::<Month>().is_err());
    }

    #[test]
    fn ordering_is_calendar_not_lexicographic() {
        let mut months = vec![Month::Oct, Month::Apr, Month::Aug, Month::Jan, Month::Dec];
        months.sort();
        assert_eq!(
            months,
            vec![Month::Jan, Month::Apr, Month::Aug, Month::Oct, Month::Dec]
        );

        let mut names: Vec<&str> = months.iter().map(|m| m.abbrev()).collect();
        names.sort();
        assert_ne!(names[0], "Jan", "lexicographic order would put Apr first");
    }

    #[test]
    fn category_order_lists_twelve_months() {
        let order = Month::category_order();
        assert_eq!(order.len(), 12);
        assert_eq!(order.first().map(String::as_str), Some("Jan"));
        assert_eq!(order.last().map(String::as_str), Some("Dec"));
    }
}
