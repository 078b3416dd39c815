// Listing Domain Model (posts and deals)

use crate::domain::error::{FieldErrors, Result};
use crate::domain::expiry::{parse_date, parse_time, to_iso_string, EndDateTime, ExpiryClock};
use crate::domain::image::data_url_mime;
use crate::domain::labels;
use chrono::{DateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Listing ID (integer, unique within its storage key)
pub type ListingId = i64;

/// Storage key holding the JSON array of posts
pub const POSTS_KEY: &str = "grabgrub_posts";

/// Storage key holding the JSON array of deals
pub const DEALS_KEY: &str = "grabgrub_deals";

/// Shared behaviour of everything stored as a listing array
pub trait Listing: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const STORAGE_KEY: &'static str;
    /// Short noun used in logs and messages
    const KIND: &'static str;

    fn id(&self) -> ListingId;
    fn creator_id(&self) -> Option<&str>;
    fn title(&self) -> &str;
    fn end_date_time(&self) -> Option<&EndDateTime>;

    /// Text fields the search box matches against
    fn search_fields(&self) -> Vec<&str>;

    /// Card preview text
    fn summary(&self) -> String;

    /// Only the signed-in creator may delete a listing
    fn can_delete(&self, requester: Option<&str>) -> bool {
        match (requester, self.creator_id()) {
            (Some(requester), Some(creator)) => requester == creator,
            _ => false,
        }
    }
}

/// User input for a new listing
pub trait ListingDraft: Send {
    type Listing: Listing;

    /// All field problems at once, empty when the draft is acceptable
    fn validate(&self) -> FieldErrors;

    /// Build the stored record. Fails with the validation errors.
    fn into_listing(
        self,
        id: ListingId,
        creator_id: Option<String>,
        clock: &ExpiryClock,
        now: DateTime<Utc>,
    ) -> Result<Self::Listing>;
}

fn require(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

fn check_images(errors: &mut FieldErrors, images: &[String]) {
    let bad = images
        .iter()
        .filter(|url| !data_url_mime(url).is_some_and(|mime| mime.starts_with("image/")))
        .count();
    if bad > 0 {
        errors.add("images", format!("{} attachment(s) are not inline images", bad));
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Surplus food post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: ListingId,
    pub creator_id: Option<String>,
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub pickup_date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub pickup_window: String,
    #[serde(default)]
    pub end_date_time: Option<EndDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Listing for Post {
    const STORAGE_KEY: &'static str = POSTS_KEY;
    const KIND: &'static str = "post";

    fn id(&self) -> ListingId {
        self.id
    }

    fn creator_id(&self) -> Option<&str> {
        self.creator_id.as_deref()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn end_date_time(&self) -> Option<&EndDateTime> {
        self.end_date_time.as_ref()
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.location.as_str(), self.note.as_str()]
    }

    fn summary(&self) -> String {
        labels::summary(&self.note)
    }
}

/// Form input for a new post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub location: String,
    pub pickup_date: String,
    pub start_time: String,
    pub end_time: String,
    pub note: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ListingDraft for PostDraft {
    type Listing = Post;

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Title is required");
        require(&mut errors, "location", &self.location, "Location is required");
        require(&mut errors, "note", &self.note, "Note is required");

        if self.pickup_date.trim().is_empty() {
            errors.add("pickupDate", "Pickup date is required");
        } else if parse_date(&self.pickup_date).is_none() {
            errors.add("pickupDate", "Pickup date must be YYYY-MM-DD");
        }

        let start = parse_form_time(&mut errors, "startTime", "Start time", &self.start_time);
        let end = parse_form_time(&mut errors, "endTime", "End time", &self.end_time);
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                errors.add("endTime", "End time must be after start time");
            }
        }

        check_images(&mut errors, &self.images);
        errors
    }

    fn into_listing(
        self,
        id: ListingId,
        creator_id: Option<String>,
        clock: &ExpiryClock,
        now: DateTime<Utc>,
    ) -> Result<Post> {
        self.validate().into_result()?;

        // Validation guarantees these parse
        let (Some(date), Some(start), Some(end)) = (
            parse_date(&self.pickup_date),
            parse_time(&self.start_time),
            parse_time(&self.end_time),
        ) else {
            return Err(crate::domain::DomainError::ValidationError(
                "pickup window did not parse".to_string(),
            ));
        };

        let pickup_window = labels::pickup_window(date, start, end, clock.calendar_date(now));
        let end_date_time = clock
            .compute_end_instant(Some(date), Some(end))
            .map(EndDateTime::from);

        Ok(Post {
            id,
            creator_id,
            title: self.title.trim().to_string(),
            location: self.location.trim().to_string(),
            pickup_date: self.pickup_date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            note: self.note.trim().to_string(),
            images: self.images,
            pickup_window,
            end_date_time,
            created_at: Some(to_iso_string(now)),
        })
    }
}

fn parse_form_time(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
) -> Option<NaiveTime> {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", label));
        return None;
    }
    let parsed = parse_time(value);
    if parsed.is_none() {
        errors.add(field, format!("{} must be HH:MM", label));
    }
    parsed
}

// ============================================================================
// Deals
// ============================================================================

/// Deals stay up until the end of their expiration day
pub fn deal_day_end() -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(23, 59, 59)
}

/// Discount or offer shared by the community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: ListingId,
    pub creator_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub store: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount: String,
    /// Display label (`Today`, `Sun, Jun 1, 2025`) or empty
    #[serde(default)]
    pub expiration_date: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub end_date_time: Option<EndDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Listing for Deal {
    const STORAGE_KEY: &'static str = DEALS_KEY;
    const KIND: &'static str = "deal";

    fn id(&self) -> ListingId {
        self.id
    }

    fn creator_id(&self) -> Option<&str> {
        self.creator_id.as_deref()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn end_date_time(&self) -> Option<&EndDateTime> {
        self.end_date_time.as_ref()
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.store.as_str(),
            self.location.as_str(),
            self.description.as_str(),
        ]
    }

    fn summary(&self) -> String {
        labels::summary(&self.description)
    }
}

/// Form input for a new deal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDraft {
    pub title: String,
    #[serde(default)]
    pub store: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub discount: String,
    /// `YYYY-MM-DD`, optional
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ListingDraft for DealDraft {
    type Listing = Deal;

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Title is required");
        require(&mut errors, "location", &self.location, "Location is required");
        require(
            &mut errors,
            "description",
            &self.description,
            "Description is required",
        );

        if let Some(date) = self.expiration_date.as_deref() {
            if !date.trim().is_empty() && parse_date(date).is_none() {
                errors.add("expirationDate", "Expiration date must be YYYY-MM-DD");
            }
        }

        check_images(&mut errors, &self.images);
        errors
    }

    fn into_listing(
        self,
        id: ListingId,
        creator_id: Option<String>,
        clock: &ExpiryClock,
        now: DateTime<Utc>,
    ) -> Result<Deal> {
        self.validate().into_result()?;

        let expiry_date = self.expiration_date.as_deref().and_then(parse_date);
        let expiration_date = expiry_date
            .map(|date| labels::deal_expiration(date, clock.calendar_date(now)))
            .unwrap_or_default();
        let end_date_time = clock
            .compute_end_instant(expiry_date, deal_day_end())
            .map(EndDateTime::from);

        Ok(Deal {
            id,
            creator_id,
            title: self.title.trim().to_string(),
            store: self.store.trim().to_string(),
            location: self.location.trim().to_string(),
            description: self.description.trim().to_string(),
            discount: self.discount.trim().to_string(),
            expiration_date,
            images: self.images,
            end_date_time,
            created_at: Some(to_iso_string(now)),
        })
    }
}
