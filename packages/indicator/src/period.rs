//! Period code parsing.
//!
//! Accepted forms, tried in order and case-insensitively:
//!
//! * `2024M03` / `2024M3` (month 1-12)
//! * `2024-03-15`, optionally followed by a time part
//! * `2024Q2`, `2024-Q2`, `2024 Q2`

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike as _, NaiveDate};
use regex::Regex;
use statmap_indicator_models::{Period, PeriodSummary};

static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{4})M(\d{1,2})$").expect("valid regex"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[Tt ].*)?$").expect("valid regex"));

static QUARTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{4})\D?Q([1-4])$").expect("valid regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

/// Parses a raw period code.
///
/// Returns `None` for anything that is not a month, date or quarter code,
/// including out-of-range months and invalid calendar dates.
#[must_use]
pub fn parse_period(raw: &str) -> Option<Period> {
    let raw = raw.trim();

    if let Some(caps) = MONTH_RE.captures(raw) {
        let year = caps[1].parse().ok()?;
        let month: u8 = caps[2].parse().ok()?;
        return (1..=12).contains(&month).then(|| Period::month(year, month));
    }

    if let Some(caps) = DATE_RE.captures(raw) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        let month = u8::try_from(date.month()).ok()?;
        return Some(Period::month(date.year(), month));
    }

    if let Some(caps) = QUARTER_RE.captures(raw) {
        let year = caps[1].parse().ok()?;
        let quarter = caps[2].parse().ok()?;
        return Some(Period::quarter(year, quarter));
    }

    None
}

/// Latest period among `raw`; unparseable codes are ignored.
#[must_use]
pub fn compute_latest_period<S: AsRef<str>>(raw: &[S]) -> Option<Period> {
    raw.iter().filter_map(|s| parse_period(s.as_ref())).max()
}

/// Raw code of the latest period among `raw`.
///
/// When several codes parse to the same period the first one wins.
#[must_use]
pub fn latest_raw_period<S: AsRef<str>>(raw: &[S]) -> Option<&str> {
    let mut best: Option<(Period, &str)> = None;

    for code in raw {
        let code = code.as_ref();
        let Some(period) = parse_period(code) else {
            continue;
        };
        if best.is_none_or(|(current, _)| period > current) {
            best = Some((period, code));
        }
    }

    best.map(|(_, code)| code)
}

/// Distinct years among `raw`, newest first.
///
/// Plain four-digit year codes count as well, so year-keyed datasets
/// produce a year list even though their keys are not periods.
#[must_use]
pub fn list_years<S: AsRef<str>>(raw: &[S]) -> Vec<i32> {
    let years: BTreeSet<i32> = raw
        .iter()
        .filter_map(|s| {
            let s = s.as_ref().trim();
            parse_period(s)
                .map(|p| p.year)
                .or_else(|| YEAR_RE.is_match(s).then(|| s.parse().ok()).flatten())
        })
        .collect();

    years.into_iter().rev().collect()
}

/// Bundles the period codes of a dataset with their latest code and years.
#[must_use]
pub fn summarize_periods(periods: Vec<String>) -> PeriodSummary {
    let latest = latest_raw_period(&periods)
        .map(ToString::to_string)
        .or_else(|| {
            // Year-keyed datasets: fall back to the newest plain year.
            list_years(&periods).first().map(ToString::to_string)
        });
    let years = list_years(&periods);

    PeriodSummary {
        periods,
        latest,
        years,
    }
}
