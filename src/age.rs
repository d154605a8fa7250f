use chrono::{Datelike, NaiveDate};

/// Age at which a guardian is no longer required.
pub const MAJORITY_AGE: i32 = 18;

/// Parses a birth date as produced by a date input (`YYYY-MM-DD`).
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Whole years between `birth` and `today`.
///
/// The year difference is decremented when today's month/day falls before the
/// birthday's month/day.
pub fn compute_age(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

pub fn is_minor(age: i32) -> bool {
    age < MAJORITY_AGE
}
