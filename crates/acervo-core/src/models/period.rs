use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Business reference period (competência), written `MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferencePeriod {
    year: i32,
    month: u32,
}

impl ReferencePeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidInput(format!(
                "Invalid reference period month: {}",
                month
            )));
        }
        if !(1900..=9999).contains(&year) {
            return Err(AppError::InvalidInput(format!(
                "Invalid reference period year: {}",
                year
            )));
        }
        Ok(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl From<NaiveDate> for ReferencePeriod {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Display for ReferencePeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Accepts `MM/YYYY` (as shown to users) and `YYYY-MM` (as some endpoints send it).
impl FromStr for ReferencePeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AppError::InvalidInput(format!("Invalid reference period: '{}'", s));

        let (month, year) = if let Some((month, year)) = s.split_once('/') {
            (month, year)
        } else if let Some((year, month)) = s.split_once('-') {
            (month, year)
        } else {
            return Err(invalid());
        };

        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        ReferencePeriod::new(month, year)
    }
}

impl Serialize for ReferencePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReferencePeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_notations() {
        let a: ReferencePeriod = "11/2025".parse().unwrap();
        let b: ReferencePeriod = "2025-11".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "11/2025");
        assert_eq!("3/2024".parse::<ReferencePeriod>().unwrap().to_string(), "03/2024");
    }

    #[test]
    fn rejects_garbage() {
        assert!("13/2025".parse::<ReferencePeriod>().is_err());
        assert!("novembro".parse::<ReferencePeriod>().is_err());
        assert!("11/25x".parse::<ReferencePeriod>().is_err());
    }

    #[test]
    fn contains_dates_of_the_same_month() {
        let period: ReferencePeriod = "02/2024".parse().unwrap();
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn serde_uses_display_form() {
        let period: ReferencePeriod = "2025-01".parse().unwrap();
        assert_eq!(serde_json::to_value(period).unwrap(), "01/2025");
        let back: ReferencePeriod = serde_json::from_value(serde_json::json!("01/2025")).unwrap();
        assert_eq!(back, period);
    }
}
