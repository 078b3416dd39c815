// Expiry Clock - time-to-expiry facts for listings
//
// Every operation takes `now` explicitly; nothing here reads the wall clock.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Listings inside this many seconds of their end are in the final window
pub const FINAL_WINDOW_SECS: i64 = 10 * 60;

/// Upper bound (inclusive) for the "expires within the hour" filter
pub const WITHIN_HOUR_SECS: i64 = 60 * 60;

/// Stored `endDateTime` value
///
/// Records written by this crate always hold an ISO-8601 string, but older
/// records may carry an epoch timestamp in milliseconds. Anything else is kept
/// as-is and treated as "never expires".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndDateTime {
    Epoch(i64),
    Fractional(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<DateTime<Utc>> for EndDateTime {
    fn from(instant: DateTime<Utc>) -> Self {
        EndDateTime::Text(to_iso_string(instant))
    }
}

/// Serialize an instant the way stored records expect (`2025-06-01T14:30:00.000Z`)
pub fn to_iso_string(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Anything that can name the end of a listing
pub trait EndInstant {
    /// Resolve to an absolute instant, `None` when absent or unparseable
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>>;
}

impl EndInstant for DateTime<Utc> {
    fn resolve(&self, _clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl EndInstant for DateTime<FixedOffset> {
    fn resolve(&self, _clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        Some(self.with_timezone(&Utc))
    }
}

impl EndInstant for i64 {
    fn resolve(&self, _clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(*self)
    }
}

impl EndInstant for str {
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        clock.parse_instant(self)
    }
}

impl EndInstant for String {
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        clock.parse_instant(self)
    }
}

impl EndInstant for EndDateTime {
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        match self {
            EndDateTime::Epoch(millis) => millis.resolve(clock),
            EndDateTime::Fractional(millis) if millis.is_finite() => {
                (millis.floor() as i64).resolve(clock)
            }
            EndDateTime::Text(text) => text.resolve(clock),
            EndDateTime::Fractional(_) | EndDateTime::Other(_) => None,
        }
    }
}

impl<T: EndInstant> EndInstant for Option<T> {
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(|end| end.resolve(clock))
    }
}

impl<T: EndInstant + ?Sized> EndInstant for &T {
    fn resolve(&self, clock: &ExpiryClock) -> Option<DateTime<Utc>> {
        (**self).resolve(clock)
    }
}

/// Remaining time until a listing ends. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRemaining {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
    pub is_expired: bool,
}

impl TimeRemaining {
    /// The all-zero record used for ended or open-ended listings
    pub const EXPIRED: TimeRemaining = TimeRemaining {
        hours: 0,
        minutes: 0,
        seconds: 0,
        total_seconds: 0,
        is_expired: true,
    };

    /// Time left from `now` until `end`
    pub fn between(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let diff_ms = end.signed_duration_since(now).num_milliseconds();
        if diff_ms <= 0 {
            return Self::EXPIRED;
        }

        let total_seconds = diff_ms / 1000;
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
            total_seconds,
            is_expired: false,
        }
    }

    /// Human-readable form: `2h 30m`, `15m 30s`, `45s` or `Expired`
    ///
    /// Once hours are shown the seconds are dropped.
    pub fn format(&self) -> String {
        if self.is_expired {
            "Expired".to_string()
        } else if self.hours > 0 {
            format!("{}h {}m", self.hours, self.minutes)
        } else if self.minutes > 0 {
            format!("{}m {}s", self.minutes, self.seconds)
        } else {
            format!("{}s", self.seconds)
        }
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Visual urgency of a live countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Final,
    Expired,
}

/// Time zone the clock interprets wall-clock inputs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

/// Pure time-to-expiry computations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpiryClock {
    zone: Zone,
}

impl ExpiryClock {
    /// Clock for the system's local time zone
    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    /// Clock pinned to a fixed UTC offset
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Combine a calendar date and a wall-clock time into an instant
    pub fn compute_end_instant(
        &self,
        pickup_date: Option<NaiveDate>,
        end_time: Option<NaiveTime>,
    ) -> Option<DateTime<Utc>> {
        let naive = pickup_date?.and_time(end_time?);
        self.from_wall_clock(naive)
    }

    /// Form-input variant of [`compute_end_instant`](Self::compute_end_instant)
    ///
    /// Accepts `YYYY-MM-DD` and `HH:MM` (or `HH:MM:SS`); blank or malformed
    /// inputs yield `None`.
    pub fn compute_end_instant_str(
        &self,
        pickup_date: Option<&str>,
        end_time: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        let date = pickup_date.and_then(parse_date);
        let time = end_time.and_then(parse_time);
        self.compute_end_instant(date, time)
    }

    pub fn end_instant<E: EndInstant + ?Sized>(&self, end: &E) -> Option<DateTime<Utc>> {
        end.resolve(self)
    }

    /// Open-ended listings never expire. A listing is live while `now < end`.
    pub fn is_expired<E: EndInstant + ?Sized>(&self, end: &E, now: DateTime<Utc>) -> bool {
        match self.end_instant(end) {
            Some(end) => now >= end,
            None => false,
        }
    }

    pub fn remaining<E: EndInstant + ?Sized>(&self, end: &E, now: DateTime<Utc>) -> TimeRemaining {
        match self.end_instant(end) {
            Some(end) => TimeRemaining::between(end, now),
            None => TimeRemaining::EXPIRED,
        }
    }

    pub fn is_in_final_window<E: EndInstant + ?Sized>(&self, end: &E, now: DateTime<Utc>) -> bool {
        let remaining = self.remaining(end, now);
        !remaining.is_expired && remaining.total_seconds < FINAL_WINDOW_SECS
    }

    pub fn expires_within_hour<E: EndInstant + ?Sized>(&self, end: &E, now: DateTime<Utc>) -> bool {
        let remaining = self.remaining(end, now);
        !remaining.is_expired && remaining.total_seconds <= WITHIN_HOUR_SECS
    }

    /// Same local calendar day, regardless of how much time is left
    pub fn expires_same_calendar_day<E: EndInstant + ?Sized>(
        &self,
        end: &E,
        now: DateTime<Utc>,
    ) -> bool {
        match self.end_instant(end) {
            Some(end) => self.calendar_date(end) == self.calendar_date(now),
            None => false,
        }
    }

    pub fn urgency<E: EndInstant + ?Sized>(&self, end: &E, now: DateTime<Utc>) -> Urgency {
        let remaining = self.remaining(end, now);
        if remaining.is_expired {
            Urgency::Expired
        } else if remaining.total_seconds < FINAL_WINDOW_SECS {
            Urgency::Final
        } else {
            Urgency::Normal
        }
    }

    /// Local calendar date of an instant
    pub fn calendar_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.wall_clock(instant).date()
    }

    /// Local wall-clock reading of an instant
    pub fn wall_clock(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self.zone {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => instant.with_timezone(&offset).naive_local(),
        }
    }

    /// Local wall-clock reading to instant. Ambiguous readings (DST fold)
    /// take the earlier instant; readings inside a DST gap have no instant.
    pub fn from_wall_clock(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.zone {
            Zone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Zone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Parse a stored timestamp string
    ///
    /// Zoned ISO-8601 strings are absolute, zone-less date-times are read as
    /// local wall-clock time and a bare date is UTC midnight.
    pub fn parse_instant(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }

        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                return self.from_wall_clock(naive);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }

        debug!(value = %text, "Unparseable endDateTime, treating listing as open-ended");
        None
    }
}

/// Parse a `YYYY-MM-DD` form date
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Parse an `HH:MM` or `HH:MM:SS` form time
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .ok()
}
