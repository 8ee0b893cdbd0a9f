//! End-to-end: captures recorded through the store, inference through the service.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use greenwave_lib::{
    db::TrafficLightInput,
    inference::{LightState, ScheduleRegularity},
    settings::{Settings, SettingsPatch},
    AppState,
};

fn t(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
}

async fn app_with_light() -> (TempDir, AppState, String) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::open(
        dir.path().join("greenwave.sqlite3"),
        dir.path().join("settings.json"),
    )
    .unwrap();
    let light = state
        .db
        .create_traffic_light(TrafficLightInput {
            location: "Elm St".to_string(),
            latitude: None,
            longitude: None,
            notes: None,
        })
        .await
        .unwrap();
    (dir, state, light.id)
}

async fn record_regular_cycle(state: &AppState, light_id: &str) {
    // Recorded out of order on purpose.
    for start in [20_000, 0, 10_000] {
        state
            .recorder
            .record(light_id, t(start), t(start + 4_000))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn pattern_for_regular_light() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;

    let pattern = state.schedules.pattern(&light_id, t(25_000)).await.unwrap();

    assert!(pattern.has_pattern);
    assert_eq!(pattern.total_captures, 3);
    assert_eq!(pattern.average_cycle_ms, Some(10_000));
    assert_eq!(pattern.typical_duration_ms, Some(4_000));
    assert_eq!(pattern.schedule_regularity, Some(ScheduleRegularity::Consistent));
    assert_eq!(pattern.next_green_start, Some(t(30_000)));
    assert_eq!(pattern.red_duration_ms, Some(6_000));
}

#[tokio::test]
async fn pattern_for_light_without_captures() {
    let (_dir, state, light_id) = app_with_light().await;

    let pattern = state.schedules.pattern(&light_id, t(0)).await.unwrap();
    assert!(!pattern.has_pattern);
    assert_eq!(pattern.total_captures, 0);
}

#[tokio::test]
async fn unknown_light_is_an_error() {
    let (_dir, state, _light_id) = app_with_light().await;

    let err = state.schedules.pattern("missing", t(0)).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn timeline_uses_configured_default_length() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;

    let now = t(25_000);
    let entries = state
        .schedules
        .timeline(&light_id, now, None, None)
        .await
        .unwrap();

    assert_eq!(entries.first().unwrap().start_time, now);
    assert_eq!(entries.last().unwrap().end_time, now + Duration::hours(1));
    assert_eq!(entries[0].state, LightState::Red);
    assert_eq!(entries[1].start_time, t(30_000));
    assert_eq!(entries[1].state, LightState::Green);
    for pair in entries.windows(2) {
        assert_eq!(pair[0].end_time, pair[1].start_time);
    }
}

#[tokio::test]
async fn timeline_honours_explicit_window_and_settings() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;

    let mut settings = state.settings.current();
    settings.timeline_hours = 24;
    state.settings.update(settings).unwrap();

    let from = t(100_000);
    let entries = state
        .schedules
        .timeline(&light_id, t(25_000), Some(from), None)
        .await
        .unwrap();
    assert_eq!(entries.first().unwrap().start_time, from);
    assert_eq!(entries.last().unwrap().end_time, from + Duration::hours(24));

    let err = state
        .schedules
        .timeline(&light_id, t(25_000), None, Some(0))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not after"));
}

#[tokio::test]
async fn timeline_without_cycle_is_an_error() {
    let (_dir, state, light_id) = app_with_light().await;
    state
        .recorder
        .record(&light_id, t(0), t(4_000))
        .await
        .unwrap();

    assert!(state
        .schedules
        .timeline(&light_id, t(5_000), None, None)
        .await
        .is_err());
}

#[tokio::test]
async fn validation_over_recorded_history() {
    let (_dir, state, light_id) = app_with_light().await;
    for i in 0..10 {
        let late = if i == 3 || i == 6 { 30_000 } else { 0 };
        let start = i * 60_000 + late;
        state
            .recorder
            .record(&light_id, t(start), t(start + 20_000))
            .await
            .unwrap();
    }

    let validation = state
        .schedules
        .validate(&light_id, t(600_000), None)
        .await
        .unwrap();

    assert_eq!(validation.total, 10);
    assert_eq!(validation.matches, 8);
    assert!(validation.is_valid);

    // A lookback that ends before any capture.
    let validation = state
        .schedules
        .validate(&light_id, t(0), Some(1))
        .await
        .unwrap();
    assert_eq!(validation.total, 0);
    assert_eq!(validation.match_rate, 0.0);
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn countdown_matches_timeline() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;

    let now = t(31_000);
    let countdown = state.schedules.countdown(&light_id, now).await.unwrap();
    let entries = state
        .schedules
        .timeline(&light_id, now, None, Some(1))
        .await
        .unwrap();

    assert_eq!(countdown.state, entries[0].state);
    assert_eq!(countdown.changes_at, entries[0].end_time);
    assert_eq!(countdown.remaining_ms, 3_000);
}

#[tokio::test]
async fn settings_file_round_trips() {
    let (dir, state, _light_id) = app_with_light().await;

    let mut settings = Settings::default();
    settings.inference.validation_match_threshold = 0.9;
    state.settings.update(settings.clone()).unwrap();

    let reopened = AppState::open(
        dir.path().join("greenwave.sqlite3"),
        dir.path().join("settings.json"),
    )
    .unwrap();
    assert_eq!(reopened.settings.current(), settings);
}

#[tokio::test]
async fn oversized_windows_are_errors_not_panics() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;
    let now = t(25_000);

    let err = state
        .schedules
        .timeline(&light_id, now, None, Some(u32::MAX))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("representable time range"));

    let err = state
        .schedules
        .validate(&light_id, now, Some(u32::MAX))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("representable time range"));

    // Representable, but above the default 168h limit.
    let err = state
        .schedules
        .timeline(&light_id, now, None, Some(169))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds the 168h limit"));

    let week = state
        .schedules
        .timeline(&light_id, now, None, Some(168))
        .await
        .unwrap();
    assert_eq!(week.last().unwrap().end_time, now + Duration::hours(168));
}

#[tokio::test]
async fn window_limit_follows_settings() {
    let (_dir, state, light_id) = app_with_light().await;
    record_regular_cycle(&state, &light_id).await;

    state
        .settings
        .patch(SettingsPatch {
            max_window_hours: Some(2),
            ..SettingsPatch::default()
        })
        .unwrap();

    assert!(state
        .schedules
        .timeline(&light_id, t(25_000), None, Some(2))
        .await
        .is_ok());
    let err = state
        .schedules
        .timeline(&light_id, t(25_000), None, Some(3))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("exceeds the 2h limit"));
}
