//! Unit age from DOT date codes.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::inventory::InventoryRow;

/// Resolves a DOT year. Two-digit years at or below the current two-digit
/// year map to 20xx, the rest to 19xx.
pub fn resolve_dot_year(year: u32, today: NaiveDate) -> Option<i32> {
    let year = i32::try_from(year).ok()?;
    if year >= 1000 {
        return Some(year);
    }
    if year >= 100 {
        return None;
    }
    let pivot = today.year().rem_euclid(100);
    if year <= pivot {
        Some(2000 + year)
    } else {
        Some(1900 + year)
    }
}

/// Monday of the DOT manufacture week, if the code is valid.
pub fn manufacture_date(week: u32, year: u32, today: NaiveDate) -> Option<NaiveDate> {
    if week == 0 {
        return None;
    }
    let year = resolve_dot_year(year, today)?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// Age of every unit in the row, in whole days, never negative.
pub fn row_age_days(row: &InventoryRow, today: NaiveDate) -> i64 {
    let dot_date = match (row.dot_week, row.dot_year) {
        (Some(week), Some(year)) => manufacture_date(week, year, today),
        _ => None,
    };
    let origin = dot_date.unwrap_or_else(|| row.created_at.date_naive());
    (today - origin).num_days().max(0)
}
