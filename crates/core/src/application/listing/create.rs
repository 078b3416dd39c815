// Create Listing Use Case

use crate::application::json_store::{decode_array, encode};
use crate::domain::{ExpiryClock, Listing, ListingDraft, ListingId};
use crate::error::{AppError, Result};
use crate::port::{KeyValueStore, TimeProvider};
use tracing::info;

/// Next free ID: the creation timestamp, bumped past any existing ID
pub fn next_listing_id<T: Listing>(existing: &[T], now_millis: i64) -> Result<ListingId> {
    match existing.iter().map(Listing::id).max() {
        None => Ok(now_millis),
        Some(max) => max
            .checked_add(1)
            .map(|next| now_millis.max(next))
            .ok_or_else(|| {
                AppError::Internal(format!("no {} id left after stored id {}", T::KIND, max))
            }),
    }
}

/// Execute create use case (inside a storage transaction)
///
/// # Arguments
///
/// * `store` - Key/value store holding the listing array
/// * `time_provider` - Creation time and ID source (injected for determinism)
/// * `clock` - Expiry clock used to derive `endDateTime` and labels
/// * `draft` - Form input
/// * `creator_id` - Signed-in user, if any
pub async fn execute<D: ListingDraft>(
    store: &dyn KeyValueStore,
    time_provider: &dyn TimeProvider,
    clock: &ExpiryClock,
    draft: D,
    creator_id: Option<&str>,
) -> Result<D::Listing> {
    // Reject bad input before touching storage
    draft.validate().into_result()?;

    let key = <D::Listing as Listing>::STORAGE_KEY;
    let mut tx = store.begin().await?;
    let mut listings: Vec<D::Listing> = decode_array(key, tx.get(key).await?)?;

    let now = time_provider.now();
    let id = match next_listing_id(&listings, now.timestamp_millis()) {
        Ok(id) => id,
        Err(e) => {
            tx.rollback().await?;
            return Err(e);
        }
    };
    let listing = draft.into_listing(id, creator_id.map(str::to_string), clock, now)?;

    listings.push(listing.clone());
    tx.set(key, &encode(&listings)?).await?;
    tx.commit().await?;

    info!(
        kind = <D::Listing as Listing>::KIND,
        id = listing.id(),
        title = listing.title(),
        "Listing created"
    );
    Ok(listing)
}
