//! Storage survives a restart and tolerates records written by older clients

use std::path::PathBuf;
use std::sync::Arc;

use grabgrub_core::application::AppState;
use grabgrub_core::domain::{EndDateTime, ExpiryClock, PostDraft};
use grabgrub_core::port::id_provider::UuidProvider;
use grabgrub_core::port::time_provider::SystemTimeProvider;
use grabgrub_core::port::{KeyValueStore, TimeProvider};
use grabgrub_infra_sqlite::{open_database, SqliteKeyValueStore};
use tokio::task::JoinSet;
use tokio_test::assert_ok;

fn temp_db(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("grabgrub_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("storage.db")
}

async fn open(path: &std::path::Path) -> (AppState, Arc<SqliteKeyValueStore>) {
    let pool = open_database(path).await.unwrap();
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteKeyValueStore::new(pool, time_provider.clone()));
    let state = AppState::new(
        store.clone(),
        Arc::new(UuidProvider),
        time_provider,
        ExpiryClock::utc(),
    );
    (state, store)
}

#[tokio::test]
async fn test_session_and_posts_survive_restart() {
    let path = temp_db("restart");

    let (user_id, post_id) = {
        let (state, _) = open(&path).await;
        let user = state
            .auth
            .signup("Abe", "abe@wisc.edu", "lincoln1")
            .await
            .unwrap();
        let post = state
            .posts
            .create(
                PostDraft {
                    title: "Sandwiches".to_string(),
                    location: "Grainger Hall".to_string(),
                    pickup_date: "2999-01-01".to_string(),
                    start_time: "10:00".to_string(),
                    end_time: "11:00".to_string(),
                    note: "Veggie and turkey".to_string(),
                    images: vec![],
                },
                Some(user.id.as_str()),
            )
            .await
            .unwrap();
        (user.id, post.id)
    };

    let (state, _) = open(&path).await;
    assert_eq!(
        state.current_user_id().await.unwrap().as_deref(),
        Some(user_id.as_str())
    );
    let post = state.posts.get(post_id).await.unwrap();
    assert_eq!(post.creator_id.as_deref(), Some(user_id.as_str()));
    assert_eq!(
        state.auth.user_email(&user_id).await.unwrap().as_deref(),
        Some("abe@wisc.edu")
    );

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_reads_mixed_end_date_time_shapes() {
    let path = temp_db("legacy");
    let (state, store) = open(&path).await;

    let raw = serde_json::json!([
        { "id": 1, "creatorId": null, "title": "Epoch", "location": "A", "note": "",
          "endDateTime": 32503680000000_i64 },
        { "id": 2, "creatorId": null, "title": "Iso", "location": "B", "note": "",
          "endDateTime": "3000-01-01T00:00:00.000Z" },
        { "id": 3, "creatorId": null, "title": "Past", "location": "C", "note": "",
          "endDateTime": "2001-01-01T00:00:00.000Z" },
        { "id": 4, "creatorId": null, "title": "Broken", "location": "D", "note": "",
          "endDateTime": "next tuesday" },
        { "id": 5, "creatorId": null, "title": "Open", "location": "E", "note": "" }
    ]);
    store
        .set("grabgrub_posts", &raw.to_string())
        .await
        .unwrap();

    let all = state.posts.all().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].end_date_time, Some(EndDateTime::Epoch(32_503_680_000_000)));
    assert!(all[4].end_date_time.is_none());

    let active: Vec<i64> = state
        .posts
        .active()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(active, vec![1, 2, 4, 5]);

    let removed = state.posts.remove_expired().await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].title, "Past");

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_corrupt_array_is_an_error_not_data_loss() {
    let path = temp_db("corrupt");
    let (state, store) = open(&path).await;

    store.set("grabgrub_deals", "{not an array").await.unwrap();
    assert!(state.deals.all().await.is_err());
    assert!(state.deals.remove_expired().await.is_err());
    assert_eq!(
        store.get("grabgrub_deals").await.unwrap().as_deref(),
        Some("{not an array")
    );

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_concurrent_creates_from_two_processes() {
    // Two pools on one file stand in for the CLI and the sweeper daemon
    let path = temp_db("contention");
    let (cli, _) = open(&path).await;
    let (daemon, _) = open(&path).await;

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let state = if i % 2 == 0 { cli.clone() } else { daemon.clone() };
        tasks.spawn(async move {
            state
                .posts
                .create(
                    PostDraft {
                        title: format!("Tray {}", i),
                        location: "Memorial Union".to_string(),
                        pickup_date: "2999-01-01".to_string(),
                        start_time: "10:00".to_string(),
                        end_time: "11:00".to_string(),
                        note: "Leftover catering".to_string(),
                        images: vec![],
                    },
                    None,
                )
                .await
        });
    }

    let mut ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        ids.push(assert_ok!(assert_ok!(joined)).id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 40);

    assert_eq!(assert_ok!(cli.posts.all().await).len(), 40);
    assert_eq!(assert_ok!(daemon.posts.remove_expired().await).len(), 0);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
