use chrono::{Datelike, Duration, IsoWeek, NaiveDate, Weekday};

/// First day of the month containing `anchor`.
pub fn month_start(anchor: NaiveDate) -> NaiveDate {
    anchor.with_day(1).unwrap_or(anchor)
}

/// Whether `date` falls in the same month as `anchor`.
pub fn in_month(date: NaiveDate, anchor: NaiveDate) -> bool {
    date.year() == anchor.year() && date.month() == anchor.month()
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Ordered Monday-Friday dates of the month containing `anchor`.
///
/// No holiday awareness.
pub fn business_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = month_start(anchor);
    while in_month(current, anchor) {
        if is_business_day(current) {
            days.push(current);
        }
        current += Duration::days(1);
    }
    days
}

/// Parses `YYYY-MM`, or any `YYYY-MM-DD` date, into the first day of that month.
pub fn parse_month(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
        .map(month_start)
}

/// Monday-first week a day belongs to, used by the weekly rules.
pub fn week_of(date: NaiveDate) -> IsoWeek {
    date.iso_week()
}
