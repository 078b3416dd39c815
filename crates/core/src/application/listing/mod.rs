// Listing Service - posts and deals stored as JSON arrays

pub mod create;

use crate::application::json_store::{decode_array, encode};
use crate::domain::{
    ExpiryClock, Listing, ListingDraft, ListingFilter, ListingId, TimeRemaining, Urgency,
};
use crate::error::{AppError, Result};
use crate::port::{KeyValueStore, TimeProvider};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

/// CRUD, search and expiry for one kind of listing
pub struct ListingService<T: Listing> {
    store: Arc<dyn KeyValueStore>,
    time_provider: Arc<dyn TimeProvider>,
    clock: ExpiryClock,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Listing> ListingService<T> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        time_provider: Arc<dyn TimeProvider>,
        clock: ExpiryClock,
    ) -> Self {
        Self {
            store,
            time_provider,
            clock,
            _kind: PhantomData,
        }
    }

    pub fn clock(&self) -> &ExpiryClock {
        &self.clock
    }

    /// Every stored listing, expired or not, in storage order
    pub async fn all(&self) -> Result<Vec<T>> {
        let raw = self.store.get(T::STORAGE_KEY).await?;
        decode_array(T::STORAGE_KEY, raw)
    }

    pub async fn find(&self, id: ListingId) -> Result<Option<T>> {
        Ok(self.all().await?.into_iter().find(|l| l.id() == id))
    }

    /// Like [`find`](Self::find) but a missing listing is an error
    pub async fn get(&self, id: ListingId) -> Result<T> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::KIND, id)))
    }

    /// Listings that have not ended yet
    pub async fn active(&self) -> Result<Vec<T>> {
        let now = self.time_provider.now();
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|l| !self.clock.is_expired(&l.end_date_time(), now))
            .collect())
    }

    /// Active listings matching the search text and time filter
    pub async fn search(&self, filter: &ListingFilter) -> Result<Vec<T>> {
        let now = self.time_provider.now();
        let matches: Vec<T> = self
            .active()
            .await?
            .into_iter()
            .filter(|l| filter.matches(l, &self.clock, now))
            .collect();
        debug!(kind = T::KIND, found = matches.len(), ?filter, "Listing search");
        Ok(matches)
    }

    pub async fn create<D>(&self, draft: D, creator_id: Option<&str>) -> Result<T>
    where
        D: ListingDraft<Listing = T>,
    {
        create::execute(
            self.store.as_ref(),
            self.time_provider.as_ref(),
            &self.clock,
            draft,
            creator_id,
        )
        .await
    }

    /// Delete a listing on behalf of `requester`
    ///
    /// Only the listing's creator may delete it.
    pub async fn delete(&self, id: ListingId, requester: Option<&str>) -> Result<T> {
        let mut tx = self.store.begin().await?;
        let mut listings: Vec<T> = decode_array(T::STORAGE_KEY, tx.get(T::STORAGE_KEY).await?)?;

        let Some(index) = listings.iter().position(|l| l.id() == id) else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("{} {} not found", T::KIND, id)));
        };
        if !listings[index].can_delete(requester) {
            tx.rollback().await?;
            return Err(AppError::Forbidden(format!(
                "only the creator can delete {} {}",
                T::KIND,
                id
            )));
        }

        let removed = listings.remove(index);
        tx.set(T::STORAGE_KEY, &encode(&listings)?).await?;
        tx.commit().await?;

        info!(kind = T::KIND, id, "Listing deleted");
        Ok(removed)
    }

    /// Drop every expired listing from storage, returning what was removed
    pub async fn remove_expired(&self) -> Result<Vec<T>> {
        let now = self.time_provider.now();
        let mut tx = self.store.begin().await?;
        let listings: Vec<T> = decode_array(T::STORAGE_KEY, tx.get(T::STORAGE_KEY).await?)?;

        let (expired, kept): (Vec<T>, Vec<T>) = listings
            .into_iter()
            .partition(|l| self.clock.is_expired(&l.end_date_time(), now));

        if expired.is_empty() {
            tx.rollback().await?;
            return Ok(expired);
        }

        tx.set(T::STORAGE_KEY, &encode(&kept)?).await?;
        tx.commit().await?;

        info!(
            kind = T::KIND,
            removed = expired.len(),
            remaining = kept.len(),
            "Expired listings removed"
        );
        Ok(expired)
    }

    /// Time left on a listing right now
    pub fn remaining(&self, listing: &T) -> TimeRemaining {
        self.clock
            .remaining(&listing.end_date_time(), self.time_provider.now())
    }

    pub fn urgency(&self, listing: &T) -> Urgency {
        self.clock
            .urgency(&listing.end_date_time(), self.time_provider.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Deal, DealDraft, EndDateTime, Post, PostDraft, TimeFilter};
    use crate::port::storage::mocks::InMemoryKeyValueStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use chrono::{DateTime, Duration, NaiveDateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .unwrap()
            .and_utc()
    }

    struct Fixture {
        store: Arc<InMemoryKeyValueStore>,
        time: Arc<FixedTimeProvider>,
        posts: ListingService<Post>,
        deals: ListingService<Deal>,
    }

    fn setup() -> Fixture {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let time = Arc::new(FixedTimeProvider::at(at("2025-06-01T10:00:00")));
        let posts = ListingService::new(store.clone(), time.clone(), ExpiryClock::utc());
        let deals = ListingService::new(store.clone(), time.clone(), ExpiryClock::utc());
        Fixture {
            store,
            time,
            posts,
            deals,
        }
    }

    fn draft(title: &str, end_time: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            location: "Gordon Commons".to_string(),
            pickup_date: "2025-06-01".to_string(),
            start_time: "09:00".to_string(),
            end_time: end_time.to_string(),
            note: "Trays of pasta".to_string(),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let f = setup();
        let post = f.posts.create(draft("Pasta", "12:00"), Some("user_a")).await.unwrap();

        assert_eq!(post.id, at("2025-06-01T10:00:00").timestamp_millis());
        assert_eq!(post.creator_id.as_deref(), Some("user_a"));
        assert_eq!(f.posts.get(post.id).await.unwrap(), post);

        // Second post in the same millisecond gets the next ID
        let second = f.posts.create(draft("Salad", "12:00"), None).await.unwrap();
        assert_eq!(second.id, post.id + 1);
        assert_eq!(f.posts.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_refuses_when_ids_are_exhausted() {
        let f = setup();
        let stored = r#"[{"id":9223372036854775807,"title":"Last","location":"A","note":""}]"#;
        f.store.insert_raw(Post::STORAGE_KEY, stored).await;

        let err = f.posts.create(draft("Pasta", "12:00"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(
            f.store.get(Post::STORAGE_KEY).await.unwrap().as_deref(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn test_invalid_draft_writes_nothing() {
        let f = setup();
        let err = f.posts.create(draft("", "12:00"), None).await.unwrap_err();
        assert!(err.to_string().contains("Title is required"));
        assert!(f.store.get(Post::STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_hides_expired() {
        let f = setup();
        f.posts.create(draft("Early", "10:30"), None).await.unwrap();
        f.posts.create(draft("Late", "18:00"), None).await.unwrap();
        assert_eq!(f.posts.active().await.unwrap().len(), 2);

        f.time.set(at("2025-06-01T10:30:00"));
        let active = f.posts.active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Late");
        // Still stored until the sweep runs
        assert_eq!(f.posts.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let f = setup();
        f.posts.create(draft("Early", "10:30"), None).await.unwrap();
        f.posts.create(draft("Late", "18:00"), None).await.unwrap();

        assert!(f.posts.remove_expired().await.unwrap().is_empty());

        f.time.advance(Duration::hours(1));
        let removed = f.posts.remove_expired().await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].title, "Early");
        assert_eq!(f.posts.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_with_time_filter() {
        let f = setup();
        f.posts.create(draft("Pizza", "10:45"), None).await.unwrap();
        f.posts.create(draft("Pizza rolls", "17:00"), None).await.unwrap();
        f.posts.create(draft("Soup", "10:50"), None).await.unwrap();

        let filter = ListingFilter::new(Some("pizza".to_string()), TimeFilter::ExpiringWithinHour);
        let found = f.posts.search(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Pizza");

        let today = ListingFilter::new(None, TimeFilter::ExpiringToday);
        assert_eq!(f.posts.search(&today).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_requires_creator() {
        let f = setup();
        let post = f.posts.create(draft("Pasta", "12:00"), Some("user_a")).await.unwrap();

        let err = f.posts.delete(post.id, Some("user_b")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = f.posts.delete(post.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = f.posts.delete(12345, Some("user_a")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let removed = f.posts.delete(post.id, Some("user_a")).await.unwrap();
        assert_eq!(removed.id, post.id);
        assert!(f.posts.find(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_posts_and_deals_use_separate_keys() {
        let f = setup();
        f.posts.create(draft("Pasta", "12:00"), None).await.unwrap();
        f.deals
            .create(
                DealDraft {
                    title: "BOGO burritos".to_string(),
                    location: "Library Mall".to_string(),
                    description: "Tuesdays only".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            f.store.keys().await.unwrap(),
            vec!["grabgrub_deals".to_string(), "grabgrub_posts".to_string()]
        );
        assert_eq!(f.deals.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reads_hand_written_records() {
        let f = setup();
        let end = at("2025-06-01T10:05:00").timestamp_millis();
        f.store
            .insert_raw(
                "grabgrub_posts",
                &format!(
                    r#"[{{"id":1,"creatorId":null,"title":"Cookies","location":"Lobby","note":"","endDateTime":{}}},
                        {{"id":2,"creatorId":"u","title":"Tea","location":"Lobby","note":"","endDateTime":"garbage"}}]"#,
                    end
                ),
            )
            .await;

        let posts = f.posts.all().await.unwrap();
        assert_eq!(posts[0].end_date_time, Some(EndDateTime::Epoch(end)));
        assert_eq!(f.posts.remaining(&posts[0]).total_seconds, 300);
        assert_eq!(f.posts.urgency(&posts[0]), Urgency::Final);

        // Unparseable end time never expires
        f.time.advance(Duration::days(30));
        let active = f.posts.active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 2);
    }
}
