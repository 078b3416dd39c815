// Display labels derived from form dates and times

use chrono::{Days, NaiveDate, NaiveTime, Timelike};

/// `2:30 pm` style clock reading
pub fn format_time_12h(time: NaiveTime) -> String {
    let hour = time.hour();
    let suffix = if hour >= 12 { "pm" } else { "am" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, time.minute(), suffix)
}

/// `Today`, `Tomorrow`, or `Sun, Jun 1`
pub fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.checked_add_days(Days::new(1)) == Some(date) {
        "Tomorrow".to_string()
    } else {
        date.format("%a, %b %-d").to_string()
    }
}

/// Pickup window shown on post cards, e.g. `Today 2:30 pm - 4:00 pm`
pub fn pickup_window(date: NaiveDate, start: NaiveTime, end: NaiveTime, today: NaiveDate) -> String {
    format!(
        "{} {} - {}",
        relative_day(date, today),
        format_time_12h(start),
        format_time_12h(end)
    )
}

/// Deal expiration label: `Today` or `Sun, Jun 1, 2025`
pub fn deal_expiration(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else {
        date.format("%a, %b %-d, %Y").to_string()
    }
}

/// Card preview text, cut at 100 characters
pub fn summary(text: &str) -> String {
    const LIMIT: usize = 100;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
