//! Attribute filters applied to ranked candidates.
//!
//! Every predicate is tri-state. `Indeterminate` means the candidate lacks the
//! data to decide (the attribute column was missing from its source row) and
//! is treated like `Pass`: a partially described movie is kept rather than
//! silently dropped.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::semantic::index::MovieMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Pass,
    Fail,
    Indeterminate,
}

impl FilterOutcome {
    pub fn accepts(self) -> bool {
        !matches!(self, FilterOutcome::Fail)
    }
}

/// Optional constraints for free-text search. Empty strings mean no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.year_min.is_none()
            && self.year_max.is_none()
            && constraint(&self.country).is_none()
            && constraint(&self.genre).is_none()
            && constraint(&self.director).is_none()
            && constraint(&self.cast).is_none()
    }

    /// Evaluate all predicates in order: year, country, genre, director, cast.
    /// Stops at the first `Fail`.
    pub fn evaluate(&self, meta: &MovieMeta) -> FilterOutcome {
        let checks = [
            self.check_year(meta),
            check_contains(&self.country, &meta.country),
            check_contains(&self.genre, &meta.genre),
            check_contains(&self.director, &meta.director),
            check_contains(&self.cast, &meta.cast),
        ];

        let mut outcome = FilterOutcome::Pass;
        for check in checks {
            match check {
                FilterOutcome::Fail => return FilterOutcome::Fail,
                FilterOutcome::Indeterminate => outcome = FilterOutcome::Indeterminate,
                FilterOutcome::Pass => {}
            }
        }
        outcome
    }

    pub fn accepts(&self, meta: &MovieMeta) -> bool {
        self.evaluate(meta).accepts()
    }

    fn check_year(&self, meta: &MovieMeta) -> FilterOutcome {
        if self.year_min.is_none() && self.year_max.is_none() {
            return FilterOutcome::Pass;
        }

        let Some(raw) = meta.year.as_deref() else {
            return FilterOutcome::Indeterminate;
        };

        let year = extract_year(raw).unwrap_or(0);
        if self.year_min.is_some_and(|min| year < min) || self.year_max.is_some_and(|max| year > max) {
            FilterOutcome::Fail
        } else {
            FilterOutcome::Pass
        }
    }
}

/// First run of four digits in `raw`, e.g. "1994(USA) / 1995" -> 1994.
pub fn extract_year(raw: &str) -> Option<i32> {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let re = YEAR.get_or_init(|| Regex::new(r"\d{4}").expect("year pattern is valid"));
    re.find(raw).and_then(|m| m.as_str().parse().ok())
}

fn constraint(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
}

fn check_contains(filter: &Option<String>, value: &Option<String>) -> FilterOutcome {
    let Some(needle) = constraint(filter) else {
        return FilterOutcome::Pass;
    };
    match value {
        None => FilterOutcome::Indeterminate,
        Some(haystack) if haystack.contains(needle) => FilterOutcome::Pass,
        Some(_) => FilterOutcome::Fail,
    }
}
