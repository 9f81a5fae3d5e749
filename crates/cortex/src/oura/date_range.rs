use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::OuraError;

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Optional date window and pagination cursor for a collection endpoint.
///
/// Ordering of `start_date` and `end_date` is left to the vendor to enforce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub next_token: Option<String>,
}

impl DateRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date<S: Into<String>>(mut self, date: S) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date<S: Into<String>>(mut self, date: S) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn with_next_token<S: Into<String>>(mut self, token: S) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// Check that every supplied date is a real calendar day in `YYYY-MM-DD` form
    pub fn validate(&self) -> Result<(), OuraError> {
        for date in [&self.start_date, &self.end_date].into_iter().flatten() {
            if !is_valid_date(date) {
                return Err(OuraError::InvalidDate(date.clone()));
            }
        }
        Ok(())
    }

    /// Query parameters in the order the vendor documents them, absent values left out
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("next_token", &self.next_token),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

pub fn is_valid_date(date: &str) -> bool {
    DATE_RE.is_match(date) && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}
