// Listing search and time-based filters

use crate::domain::error::DomainError;
use crate::domain::expiry::ExpiryClock;
use crate::domain::listing::Listing;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Time-based narrowing of the active listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    Any,
    ExpiringWithinHour,
    ExpiringToday,
    FinalWindow,
}

impl FromStr for TimeFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(TimeFilter::Any),
            "hour" | "within-hour" => Ok(TimeFilter::ExpiringWithinHour),
            "today" => Ok(TimeFilter::ExpiringToday),
            "final" | "final-window" => Ok(TimeFilter::FinalWindow),
            other => Err(DomainError::ValidationError(format!(
                "unknown time filter '{}' (expected any, hour, today or final)",
                other
            ))),
        }
    }
}

/// Search box text plus a time filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub search: Option<String>,
    pub time: TimeFilter,
}

impl ListingFilter {
    pub fn new(search: Option<String>, time: TimeFilter) -> Self {
        Self { search, time }
    }

    pub fn matches<L: Listing>(&self, listing: &L, clock: &ExpiryClock, now: DateTime<Utc>) -> bool {
        self.matches_search(listing) && self.matches_time(listing, clock, now)
    }

    fn matches_search<L: Listing>(&self, listing: &L) -> bool {
        let term = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => term.to_lowercase(),
            _ => return true,
        };
        listing
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_time<L: Listing>(&self, listing: &L, clock: &ExpiryClock, now: DateTime<Utc>) -> bool {
        let end = listing.end_date_time();
        match self.time {
            TimeFilter::Any => true,
            TimeFilter::ExpiringWithinHour => clock.expires_within_hour(&end, now),
            TimeFilter::ExpiringToday => clock.expires_same_calendar_day(&end, now),
            TimeFilter::FinalWindow => clock.is_in_final_window(&end, now),
        }
    }
}
