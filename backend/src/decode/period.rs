//! TIME_PERIOD normalization.
//!
//! SDMX period labels come in many shapes ("2023 January", "2023-01",
//! "2023-Q2", "2023-W05", ...). They are all re-emitted as a calendar month
//! `YYYY-MM`; anything finer than a month is dropped.

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DecodeError, DecodeResult};

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})(?:[-/.]\d{1,2})?(?:[T ].*)?$").expect("valid regex")
});
static PX_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})M(\d{1,2})$").expect("valid regex"));
static QUARTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-?Q([1-4])$").expect("valid regex"));
static SEMESTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-?[SH]([12])$").expect("valid regex"));
static WEEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-?W(\d{1,2})$").expect("valid regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(?:-A1?)?$").expect("valid regex"));
static YEAR_MONTH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[\s,-]+([A-Za-z]+)\.?$").expect("valid regex"));
static MONTH_NAME_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\.?[\s,-]+(?:\d{1,2},?\s+)?(\d{4})$").expect("valid regex"));
static DAY_MONTH_NAME_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}\s+([A-Za-z]+)\.?\s+(\d{4})$").expect("valid regex"));

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Normalize a period label to `YYYY-MM`.
pub fn normalize_period(label: &str) -> DecodeResult<String> {
    let text = label.trim();
    let fail = || DecodeError::TimePeriod(label.to_string());

    let (year, month) = if let Some(c) = NUMERIC_DATE.captures(text).or_else(|| PX_MONTH.captures(text)) {
        (parse_num(&c[1]), parse_num(&c[2]))
    } else if let Some(c) = QUARTER.captures(text) {
        (parse_num(&c[1]), (parse_num(&c[2]) - 1) * 3 + 1)
    } else if let Some(c) = SEMESTER.captures(text) {
        (parse_num(&c[1]), (parse_num(&c[2]) - 1) * 6 + 1)
    } else if let Some(c) = WEEK.captures(text) {
        let monday = NaiveDate::from_isoywd_opt(parse_num(&c[1]) as i32, parse_num(&c[2]), Weekday::Mon)
            .ok_or_else(fail)?;
        (monday.year() as u32, monday.month())
    } else if let Some(c) = YEAR.captures(text) {
        (parse_num(&c[1]), 1)
    } else if let Some(c) = YEAR_MONTH_NAME.captures(text) {
        (parse_num(&c[1]), month_from_name(&c[2]).ok_or_else(fail)?)
    } else if let Some(c) = MONTH_NAME_YEAR.captures(text) {
        (parse_num(&c[2]), month_from_name(&c[1]).ok_or_else(fail)?)
    } else if let Some(c) = DAY_MONTH_NAME_YEAR.captures(text) {
        (parse_num(&c[2]), month_from_name(&c[1]).ok_or_else(fail)?)
    } else {
        return Err(fail());
    };

    NaiveDate::from_ymd_opt(year as i32, month, 1)
        .map(|d| d.format("%Y-%m").to_string())
        .ok_or_else(fail)
}

fn parse_num(digits: &str) -> u32 {
    // Captures are all short digit runs.
    digits.parse().unwrap_or(0)
}

/// Month number from an English month name or its abbreviation.
fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower) || (lower.len() > m.len() && lower.starts_with(m)))
        .map(|i| i as u32 + 1)
}
