use chrono::NaiveDate;

/// Format a percentage rounded to a whole number.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::format_percent;
///
/// assert_eq!(format_percent(75.0), "75%");
/// assert_eq!(format_percent(66.666), "67%");
/// assert_eq!(format_percent(0.0), "0%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{}%", value.round() as i64)
}

/// Format a date for display, e.g. `"Mar 1, 2024"`.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::format_display_date;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// assert_eq!(format_display_date(date), "Mar 1, 2024");
/// ```
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Format the last date a student attended, `"Never"` when there is none.
pub fn format_last_present(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "Never".to_string(), format_display_date)
}

/// Format the search result count shown above the student table.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::format_filter_count;
///
/// assert_eq!(format_filter_count(3, 5), "3 of 5");
/// ```
pub fn format_filter_count(shown: usize, total: usize) -> String {
    format!("{} of {}", shown, total)
}

/// Format a day count with the right plural.
pub fn format_days(count: u32) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", count)
    }
}
