// Application State - everything a front-end needs, wired once

use crate::application::auth::AuthService;
use crate::application::countdown::Countdown;
use crate::application::listing::ListingService;
use crate::domain::{AuthSession, Deal, EndInstant, ExpiryClock, Post};
use crate::error::Result;
use crate::port::{IdProvider, KeyValueStore, TimeProvider};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub posts: Arc<ListingService<Post>>,
    pub deals: Arc<ListingService<Deal>>,
    pub clock: ExpiryClock,
    pub time_provider: Arc<dyn TimeProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        clock: ExpiryClock,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(
                store.clone(),
                id_provider,
                time_provider.clone(),
            )),
            posts: Arc::new(ListingService::new(
                store.clone(),
                time_provider.clone(),
                clock,
            )),
            deals: Arc::new(ListingService::new(store, time_provider.clone(), clock)),
            clock,
            time_provider,
        }
    }

    pub async fn session(&self) -> Result<AuthSession> {
        self.auth.session().await
    }

    /// Signed-in user's ID, used as the creator of new listings
    pub async fn current_user_id(&self) -> Result<Option<String>> {
        Ok(self.session().await?.current_user_id().map(str::to_string))
    }

    pub fn countdown<E: EndInstant + ?Sized>(&self, end: &E) -> Countdown {
        Countdown::new(end, self.clock, self.time_provider.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostDraft;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::storage::mocks::InMemoryKeyValueStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    #[tokio::test]
    async fn test_signed_in_user_owns_new_posts() {
        let state = AppState::new(
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(FixedTimeProvider::new(1_748_772_000_000)),
            ExpiryClock::utc(),
        );
        assert_eq!(state.current_user_id().await.unwrap(), None);

        let user = state
            .auth
            .signup("Grace", "grace@wisc.edu", "hopper1")
            .await
            .unwrap();
        let creator = state.current_user_id().await.unwrap();
        assert_eq!(creator.as_deref(), Some(user.id.as_str()));

        let post = state
            .posts
            .create(
                PostDraft {
                    title: "Donuts".to_string(),
                    location: "CS Building".to_string(),
                    pickup_date: "2025-06-01".to_string(),
                    start_time: "10:00".to_string(),
                    end_time: "11:00".to_string(),
                    note: "Two boxes".to_string(),
                    images: vec![],
                },
                creator.as_deref(),
            )
            .await
            .unwrap();

        let frame = state.countdown(&post.end_date_time).frame();
        assert_eq!(frame.label(), "1h 0m left");
    }
}
