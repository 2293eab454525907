use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Every calendar day from `start` to `end` inclusive, ascending.
/// An inverted range yields an empty sequence rather than an error: the
/// callers' date pickers normally prevent it, but nothing here may panic.
pub fn expand_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;

    while current <= end {
        days.push(current);
        current += Duration::days(1);
    }

    days
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Saturdays and Sundays within the range, ascending.
pub fn find_weekends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    expand_range(start, end)
        .into_iter()
        .filter(|day| is_weekend(*day))
        .collect()
}
