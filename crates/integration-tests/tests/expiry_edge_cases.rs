//! Expiry behaviour across zones, stored shapes and the live countdown

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use grabgrub_core::application::AppState;
use grabgrub_core::domain::{ExpiryClock, ListingFilter, PostDraft, TimeFilter, Urgency};
use grabgrub_core::port::id_provider::mocks::SequentialIdProvider;
use grabgrub_core::port::time_provider::mocks::FixedTimeProvider;
use grabgrub_infra_sqlite::{create_pool, run_migrations, SqliteKeyValueStore};

fn at(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .unwrap()
        .and_utc()
}

async fn setup(now: DateTime<Utc>, clock: ExpiryClock) -> (AppState, Arc<FixedTimeProvider>) {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let time = Arc::new(FixedTimeProvider::at(now));
    let store = Arc::new(SqliteKeyValueStore::new(pool, time.clone()));
    let state = AppState::new(store, Arc::new(SequentialIdProvider::new()), time.clone(), clock);
    (state, time)
}

fn late_night_post() -> PostDraft {
    PostDraft {
        title: "Late-night ramen".to_string(),
        location: "Chadbourne".to_string(),
        pickup_date: "2025-06-01".to_string(),
        start_time: "22:00".to_string(),
        end_time: "23:30".to_string(),
        note: "Instant, but free".to_string(),
        images: vec![],
    }
}

#[tokio::test]
async fn test_wall_clock_inputs_follow_clock_zone() {
    // 23:30 at UTC-5 is 04:30 UTC the next day
    let central = FixedOffset::west_opt(5 * 3600).unwrap();
    let (state, time) = setup(at("2025-06-02T03:00:00"), ExpiryClock::with_offset(central)).await;

    let post = state.posts.create(late_night_post(), None).await.unwrap();
    assert_eq!(
        serde_json::to_value(&post).unwrap()["endDateTime"],
        "2025-06-02T04:30:00.000Z"
    );
    assert_eq!(post.pickup_window, "Today 10:00 pm - 11:30 pm");
    assert_eq!(state.posts.remaining(&post).format(), "1h 30m");

    // Same local day for the clock even though UTC has rolled over
    let today = ListingFilter::new(None, TimeFilter::ExpiringToday);
    assert_eq!(state.posts.search(&today).await.unwrap().len(), 1);

    time.set(at("2025-06-02T04:21:00"));
    assert_eq!(state.posts.urgency(&post), Urgency::Final);

    time.set(at("2025-06-02T04:30:00"));
    assert!(state.posts.active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_final_window_starts_strictly_under_ten_minutes() {
    let (state, time) = setup(at("2025-06-01T23:20:00"), ExpiryClock::utc()).await;
    let post = state.posts.create(late_night_post(), None).await.unwrap();
    let final_window = ListingFilter::new(None, TimeFilter::FinalWindow);

    // Exactly 10 minutes left
    assert_eq!(state.posts.urgency(&post), Urgency::Normal);
    assert!(state.posts.search(&final_window).await.unwrap().is_empty());

    time.set(at("2025-06-01T23:20:01"));
    assert_eq!(state.posts.urgency(&post), Urgency::Final);
    assert_eq!(state.posts.search(&final_window).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_live_countdown_reaches_expired() {
    let (state, time) = setup(at("2025-06-01T23:29:58"), ExpiryClock::utc()).await;
    let post = state.posts.create(late_night_post(), None).await.unwrap();

    let handle = state
        .countdown(&post.end_date_time)
        .with_cadence(StdDuration::from_millis(10))
        .spawn();
    let mut frames = handle.frames();
    assert_eq!(handle.current().label(), "2s left");
    assert_eq!(handle.current().urgency, Urgency::Final);

    time.set(at("2025-06-01T23:30:00"));
    let last = tokio::time::timeout(StdDuration::from_secs(1), frames.wait_for(|f| f.is_expired()))
        .await
        .unwrap()
        .map(|frame| *frame)
        .unwrap();
    assert_eq!(last.label(), "Expired");
    assert_eq!(last.urgency, Urgency::Expired);

    tokio::time::timeout(StdDuration::from_secs(1), handle.join())
        .await
        .unwrap();
}
