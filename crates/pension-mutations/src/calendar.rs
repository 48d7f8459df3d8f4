//! Date helpers shared by the handlers that touch service time and eligibility.
//!
//! "Years of service" and "age eligibility" intentionally use different
//! arithmetic: service time is a continuous `days / 365.25` figure, while age
//! eligibility counts whole calendar years with a month/day cutoff.

use chrono::{Datelike, NaiveDate};

fn parse(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Whole calendar years between `birth_date` and `as_of`, with a month/day
/// cutoff (a birthday that hasn't occurred yet this year doesn't count).
/// Returns `0` if either date fails to parse.
pub fn calendar_years(birth_date: &str, as_of: &str) -> i64 {
    let (Some(birth), Some(as_of)) = (parse(birth_date), parse(as_of)) else {
        return 0;
    };
    let mut years = as_of.year() as i64 - birth.year() as i64;
    if (as_of.month(), as_of.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Service years between `start_date` and `as_of`, floored at zero. Returns
/// `0.0` if either date fails to parse.
pub fn service_years(start_date: &str, as_of: &str) -> f64 {
    let (Some(start), Some(as_of)) = (parse(start_date), parse(as_of)) else {
        return 0.0;
    };
    let days = as_of.signed_duration_since(start).num_days();
    (days as f64 / 365.25).max(0.0)
}
