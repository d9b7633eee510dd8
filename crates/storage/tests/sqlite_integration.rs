use checkpoint_core::analytics::CountdownQuarter;
use checkpoint_core::model::{
    CachedAnalytics, Quartiles, ScanEvent, SessionConfig, SessionId, SessionStatus,
};
use checkpoint_core::time::fixed_now;
use storage::repository::{
    ScanEventRepository, SessionStateRepository, SessionStatsRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_persists_stats_row() {
    let repo = connect("memdb_stats_roundtrip").await;
    let id = SessionId::new("lab01");

    let created = repo
        .start_session(&id, 1800, 12, fixed_now())
        .await
        .expect("start");
    assert_eq!(created.sequence_number(), 1);

    let fetched = repo.get_session(&id).await.expect("fetch");
    assert_eq!(fetched.countdown_duration_seconds(), 1800);
    assert_eq!(fetched.starting_team_count(), 12);
    assert_eq!(fetched.finishing_team_count(), 0);
    assert_eq!(fetched.status(), SessionStatus::Active);
    assert_eq!(fetched.started_at(), fixed_now());
    assert!(fetched.cached().is_none());
}

#[tokio::test]
async fn sqlite_missing_session_is_not_found() {
    let repo = connect("memdb_missing").await;
    let err = repo
        .get_session(&SessionId::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_sequence_survives_re_reset_and_grows_across_sessions() {
    let repo = connect("memdb_sequence").await;
    let a = SessionId::new("a");
    let b = SessionId::new("b");

    let first = repo.start_session(&a, 600, 10, fixed_now()).await.unwrap();
    let second = repo.start_session(&b, 600, 10, fixed_now()).await.unwrap();
    assert_eq!(first.sequence_number(), 1);
    assert_eq!(second.sequence_number(), 2);

    repo.update_finishing_count(&a, 7).await.unwrap();
    let again = repo.start_session(&a, 900, 15, fixed_now()).await.unwrap();
    assert_eq!(again.sequence_number(), 1);

    // Re-reset wiped the mutable fields.
    let fetched = repo.get_session(&a).await.unwrap();
    assert_eq!(fetched.countdown_duration_seconds(), 900);
    assert_eq!(fetched.starting_team_count(), 15);
    assert_eq!(fetched.finishing_team_count(), 0);
}

#[tokio::test]
async fn sqlite_concurrent_new_session_resets_all_succeed() {
    let repo = connect("memdb_concurrent_resets").await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.start_session(&SessionId::new(format!("lab{i:02}")), 600, 4, fixed_now())
                .await
        }));
    }

    let mut sequences = Vec::new();
    for handle in handles {
        let stats = handle.await.expect("join").expect("start");
        sequences.push(stats.sequence_number());
    }

    // Every reset succeeded and each got a distinct sequence number.
    sequences.sort_unstable();
    let expected: Vec<i64> = (1..=32).collect();
    assert_eq!(sequences, expected);
}

#[tokio::test]
async fn sqlite_events_keep_arrival_order_and_clear() {
    let repo = connect("memdb_events").await;
    let id = SessionId::new("s1");
    repo.start_session(&id, 600, 4, fixed_now()).await.unwrap();

    for elapsed in [40_u32, 10, 25] {
        repo.append_event(&ScanEvent::new(id.clone(), elapsed, fixed_now()))
            .await
            .unwrap();
    }

    let events = repo.list_events(&id).await.unwrap();
    let elapsed: Vec<u32> = events.iter().map(|e| e.elapsed_seconds).collect();
    assert_eq!(elapsed, vec![40, 10, 25]);

    repo.clear_events(&id).await.unwrap();
    assert!(repo.list_events(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_cached_analytics_roundtrip_and_clear_on_reset() {
    let repo = connect("memdb_cached").await;
    let id = SessionId::new("s1");
    repo.start_session(&id, 600, 4, fixed_now()).await.unwrap();

    let cached = CachedAnalytics {
        median_completion_seconds: 25.0,
        quartiles: Quartiles {
            q1: 15.0,
            q2: 25.0,
            q3: 35.0,
        },
        early_completion_rate: 100.0,
        late_completion_rate: 0.0,
        participation_rate: 100.0,
        completion_spread_seconds: 30,
        peak_completion_period: CountdownQuarter::First,
    };
    repo.store_analytics(&id, Some(&cached)).await.unwrap();

    let fetched = repo.get_session(&id).await.unwrap();
    assert_eq!(fetched.cached(), Some(&cached));

    // A new reset clears the cache.
    repo.start_session(&id, 600, 4, fixed_now()).await.unwrap();
    let fetched = repo.get_session(&id).await.unwrap();
    assert!(fetched.cached().is_none());
}

#[tokio::test]
async fn sqlite_status_update_roundtrips() {
    let repo = connect("memdb_status").await;
    let id = SessionId::new("s1");
    repo.start_session(&id, 600, 4, fixed_now()).await.unwrap();

    repo.set_status(&id, SessionStatus::Completed).await.unwrap();
    let fetched = repo.get_session(&id).await.unwrap();
    assert_eq!(fetched.status(), SessionStatus::Completed);
}

#[tokio::test]
async fn sqlite_list_sessions_orders_by_sequence() {
    let repo = connect("memdb_list").await;
    for name in ["one", "two", "three"] {
        repo.start_session(&SessionId::new(name), 600, 4, fixed_now())
            .await
            .unwrap();
    }

    let sessions = repo.list_sessions().await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id().as_str()).collect();
    assert_eq!(ids, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn sqlite_session_state_upserts_and_preserves_extras() {
    let repo = connect("memdb_state").await;
    let id = SessionId::new("s1");
    assert!(repo.get_state(&id).await.unwrap().is_none());

    let raw = r##"{"countdown_minutes": 45, "team_count": 8, "accent_color": "#ff0066"}"##;
    let config: SessionConfig = serde_json::from_str(raw).unwrap();
    repo.set_state(&id, &config).await.unwrap();

    let fetched = repo.get_state(&id).await.unwrap().unwrap();
    assert_eq!(fetched, config);
    assert_eq!(fetched.countdown_duration_seconds(), 2700);

    let replacement = SessionConfig {
        countdown_minutes: Some(30),
        ..SessionConfig::default()
    };
    repo.set_state(&id, &replacement).await.unwrap();
    assert_eq!(repo.get_state(&id).await.unwrap(), Some(replacement));
}
