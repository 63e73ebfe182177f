use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use storage::backend::{
    AuthSession, AuthUser, Backend, BackendConfig, MemorySessionStore, SessionStore,
};
use storage::dto::auth::SignInRequest;
use storage::dto::measurement::NewMeasurementRequest;
use storage::models::ExerciseSet;
use tracker::draft::SetUpdate;
use tracker::session::TickerExit;
use tracker::{Clock, ManualClock, RoutineStart, Store, TrackerError, View};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "6f1c1f5e-2a43-4a51-9a36-4a0d3f5b8c10";
const TODAY: &str = "2024-05-01";

fn nine_am() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

fn session() -> AuthSession {
    AuthSession {
        access_token: "user-token".into(),
        refresh_token: "refresh".into(),
        expires_at: Utc::now() + Duration::hours(1),
        user: AuthUser {
            id: Uuid::parse_str(USER).unwrap(),
            email: Some("lifter@example.com".into()),
            is_anonymous: false,
        },
    }
}

fn signed_in_store(server: &MockServer, clock: &ManualClock) -> Store<ManualClock> {
    let backend = Backend::new(&BackendConfig::new(server.uri(), "anon-key")).unwrap();
    backend.set_session(Some(session()));
    Store::new(backend, Arc::new(MemorySessionStore::new()), clock.clone())
}

fn workout_row(id: i64, date: &str, start_time: Option<&str>, exercises: Value) -> Value {
    json!({
        "id": id,
        "user_id": USER,
        "date": date,
        "start_time": start_time,
        "end_time": null,
        "duration": null,
        "routine_id": null,
        "exercises": exercises
    })
}

fn library() -> Value {
    json!([
        { "id": "0001", "name": "Barbell Squat", "body_part": "upper legs",
          "equipment": "barbell", "target_muscle": "quads", "instructions": [],
          "gif_url": "0001.gif" },
        { "id": "0002", "name": "Push-up", "body_part": "chest",
          "equipment": "body weight", "target_muscle": "pectorals", "instructions": null,
          "gif_url": null }
    ])
}

fn profile(favorites: &[&str]) -> Value {
    json!({
        "id": USER,
        "full_name": "Sam Lifter",
        "age": 31,
        "height": 180.0,
        "weight": 80.0,
        "favorite_exercises": favorites
    })
}

/// Reads made by a full refresh, plus the by-date lookup returning nothing
async fn mount_reads(server: &MockServer, workouts: Value, routines: Value, profile: Option<Value>) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("order", "date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workouts))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/routines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(routines))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/exercises_library"))
        .respond_with(ResponseTemplate::new(200).set_body_json(library()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/measurements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    let profile_response = match profile {
        Some(body) => ResponseTemplate::new(200).set_body_json(body),
        None => ResponseTemplate::new(406).set_body_json(json!({ "code": "PGRST116" })),
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(profile_response)
        .mount(server)
        .await;
}

async fn requests_with(server: &MockServer, verb: &str, url_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == url_path)
        .collect()
}

/// A session started at 08:00 today, resumed by `load` at 09:00
async fn resumed_session(server: &MockServer, clock: &ManualClock) -> Store<ManualClock> {
    mount_reads(
        server,
        json!([workout_row(7, TODAY, Some("2024-05-01T08:00:00Z"), json!([]))]),
        json!([]),
        Some(profile(&[])),
    )
    .await;

    let mut store = signed_in_store(server, clock);
    store.load().await.unwrap();
    store
}

#[tokio::test]
async fn test_starting_today_creates_one_marker() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), None).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/workouts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T09:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();
    assert!(store.state().editor.is_none());

    store.start_or_continue_today().await.unwrap();

    let editor = store.state().editor.as_ref().unwrap();
    assert_eq!(editor.draft.workout_id, Some(7));
    assert!(editor.timer.is_running());
    assert_eq!(store.elapsed(), Some(0));
    assert_eq!(store.state().view, View::Editor);

    let posted = requests_with(&server, "POST", "/rest/v1/workouts").await;
    let body: Value = posted[0].body_json().unwrap();
    assert_eq!(body["start_time"], "2024-05-01T09:00:00Z");
    assert_eq!(body["date"], TODAY);
    assert_eq!(body["exercises"], json!([]));
    assert!(requests_with(&server, "PATCH", "/rest/v1/workouts").await.is_empty());
}

#[tokio::test]
async fn test_load_resumes_session_in_progress() {
    let server = MockServer::start().await;
    let clock = nine_am();
    let store = resumed_session(&server, &clock).await;

    let editor = store.state().editor.as_ref().unwrap();
    assert_eq!(editor.draft.workout_id, Some(7));
    assert_eq!(store.elapsed(), Some(3600));

    clock.advance(Duration::seconds(90));
    assert_eq!(store.elapsed(), Some(3690));
}

#[tokio::test]
async fn test_save_drops_blank_sets_and_keeps_session_open() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T08:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;

    let curl = store.add_manual_exercise().unwrap();
    store.rename_exercise(&curl, "Curl").unwrap();
    store.update_set(&curl, 0, SetUpdate::Reps(10)).unwrap();
    store
        .update_set(&curl, 0, SetUpdate::Weight(Decimal::new(125, 1)))
        .unwrap();
    store.add_set(&curl).unwrap();
    store.update_set(&curl, 1, SetUpdate::Reps(0)).unwrap();
    store.update_set(&curl, 1, SetUpdate::Weight(Decimal::ZERO)).unwrap();
    store.add_manual_exercise().unwrap();

    clock.advance(Duration::minutes(30));
    store.save_and_exit().await.unwrap();

    let patched = requests_with(&server, "PATCH", "/rest/v1/workouts").await;
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body["duration"], 5400);
    assert_eq!(body["end_time"], Value::Null);
    assert_eq!(body["start_time"], "2024-05-01T08:00:00Z");

    let exercises = body["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0]["name"], "Curl");
    assert_eq!(exercises[0]["sets"], json!([{ "reps": 10, "weight": 12.5, "completed": false }]));

    assert!(store.state().editor.is_none());
    assert_eq!(store.state().view, View::Calendar);
}

#[tokio::test]
async fn test_save_refuses_empty_draft() {
    let server = MockServer::start().await;
    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;

    store.add_manual_exercise().unwrap();
    let err = store.save_and_exit().await.unwrap_err();

    assert!(matches!(err, TrackerError::Rejected(_)));
    assert!(store.state().editor.is_some());
    assert!(requests_with(&server, "PATCH", "/rest/v1/workouts").await.is_empty());
}

#[tokio::test]
async fn test_duplicate_library_exercise_rejected() {
    let server = MockServer::start().await;
    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;

    store.add_library_exercise("0001").unwrap();
    let err = store.add_library_exercise("0001").unwrap_err();

    assert!(matches!(err, TrackerError::Rejected(_)));
    let draft = &store.state().editor.as_ref().unwrap().draft;
    assert_eq!(draft.exercises.len(), 1);
    assert!(draft.exercises[0].id.starts_with("lib-0001-"));
    assert_eq!(draft.exercises[0].body_part.as_deref(), Some("upper legs"));

    assert!(matches!(
        store.add_library_exercise("9999"),
        Err(TrackerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_routine_prefills_new_workout() {
    let server = MockServer::start().await;
    mount_reads(
        &server,
        json!([]),
        json!([{
            "id": 3,
            "name": "Leg Day",
            "user_id": USER,
            "exercises": [
                { "id": "a", "name": "Barbell Squat" },
                { "id": "b", "name": "Lunge", "bodyPart": "upper legs" },
                { "id": "c", "name": "Calf Raise" }
            ]
        }]),
        None,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/workouts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(workout_row(
            8,
            TODAY,
            Some("2024-05-01T09:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    let started = store.start_routine(3, false).await.unwrap();
    assert_eq!(started, RoutineStart::Started);

    let draft = &store.state().editor.as_ref().unwrap().draft;
    assert_eq!(draft.routine_id, Some(3));
    let names: Vec<&str> = draft.exercises.iter().map(|ex| ex.name.as_str()).collect();
    assert_eq!(names, vec!["Barbell Squat", "Lunge", "Calf Raise"]);
    for ex in &draft.exercises {
        assert_eq!(ex.sets, vec![ExerciseSet::default()]);
    }
    assert_eq!(draft.exercises[0].body_part.as_deref(), Some("upper legs"));

    let posted = requests_with(&server, "POST", "/rest/v1/workouts").await;
    let body: Value = posted[0].body_json().unwrap();
    assert_eq!(body["routine_id"], 3);

    let stored = body["exercises"].as_array().unwrap();
    let stored_names: Vec<&str> = stored.iter().map(|ex| ex["name"].as_str().unwrap()).collect();
    assert_eq!(stored_names, vec!["Barbell Squat", "Lunge", "Calf Raise"]);
    assert_eq!(stored[0]["bodyPart"], "upper legs");
    for ex in stored {
        assert_eq!(ex["sets"], json!([]));
    }
}

#[tokio::test]
async fn test_routine_appended_to_logged_day_is_stored() {
    let server = MockServer::start().await;
    mount_reads(
        &server,
        json!([workout_row(
            7,
            TODAY,
            None,
            json!([{ "id": "manual-1", "name": "Curl",
                     "sets": [{ "reps": 10, "weight": 12.5, "completed": true }] }])
        )]),
        json!([{
            "id": 3,
            "name": "Leg Day",
            "user_id": USER,
            "exercises": [{ "id": "a", "name": "Barbell Squat" }]
        }]),
        None,
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T09:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    assert_eq!(store.start_routine(3, true).await.unwrap(), RoutineStart::Started);

    let patched = requests_with(&server, "PATCH", "/rest/v1/workouts").await;
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body["start_time"], "2024-05-01T09:00:00Z");
    let names: Vec<&str> = body["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ex| ex["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Curl", "Barbell Squat"]);
    assert_eq!(body["exercises"][0]["sets"][0]["reps"], 10);
    assert!(requests_with(&server, "POST", "/rest/v1/workouts").await.is_empty());
}

#[tokio::test]
async fn test_restarting_a_finished_day_reopens_the_session() {
    let server = MockServer::start().await;
    mount_reads(
        &server,
        json!([{
            "id": 7,
            "user_id": USER,
            "date": TODAY,
            "start_time": null,
            "end_time": "2024-05-01T07:00:00Z",
            "duration": null,
            "routine_id": null,
            "exercises": []
        }]),
        json!([]),
        None,
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T09:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();
    assert!(store.state().editor.is_none());

    store.start_or_continue_today().await.unwrap();
    assert!(store.state().editor.as_ref().unwrap().timer.is_running());

    let patched = requests_with(&server, "PATCH", "/rest/v1/workouts").await;
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body["start_time"], "2024-05-01T09:00:00Z");
    assert_eq!(body["end_time"], Value::Null);
    assert_eq!(body["duration"], Value::Null);
}

#[tokio::test]
async fn test_routine_on_logged_day_needs_confirmation() {
    let server = MockServer::start().await;
    mount_reads(
        &server,
        json!([workout_row(7, TODAY, None, json!([]))]),
        json!([{ "id": 3, "name": "Leg Day", "user_id": USER, "exercises": [] }]),
        None,
    )
    .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    let started = store.start_routine(3, false).await.unwrap();
    assert_eq!(started, RoutineStart::NeedsConfirmation);
    assert!(store.state().editor.is_none());
}

#[tokio::test]
async fn test_deleting_active_workout_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("order", "date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([workout_row(
            7,
            TODAY,
            Some("2024-05-01T08:00:00Z"),
            json!([])
        )])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_reads(&server, json!([]), json!([]), None).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([workout_row(
            7, TODAY, None, json!([])
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();
    assert!(store.state().editor.is_some());

    store.delete_workout(7).await.unwrap();

    let today = clock.today();
    assert!(store.state().editor.is_none());
    assert!(store.state().active_session(today).is_none());
    assert!(store.state().workouts.is_empty());
}

#[tokio::test]
async fn test_cancelling_empty_session_discards_marker() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), None).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/workouts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T09:00:00Z"),
            json!([]),
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();
    store.start_or_continue_today().await.unwrap();

    store.cancel_editor().await.unwrap();
    assert!(store.state().editor.is_none());
}

#[tokio::test]
async fn test_cancelling_session_with_exercises_keeps_it() {
    let server = MockServer::start().await;
    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;

    store.add_library_exercise("0001").unwrap();
    store.cancel_editor().await.unwrap();

    assert!(store.state().editor.is_none());
    assert!(requests_with(&server, "DELETE", "/rest/v1/workouts").await.is_empty());
    assert!(requests_with(&server, "PATCH", "/rest/v1/workouts").await.is_empty());
    assert!(store.state().active_session(clock.today()).is_some());
}

#[tokio::test]
async fn test_failed_delete_restores_workout() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([workout_row(7, TODAY, None, json!([]))]), json!([]), None).await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/workouts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    let err = store.delete_workout(7).await.unwrap_err();

    assert!(matches!(err, TrackerError::Storage(_)));
    assert_eq!(store.state().workouts.len(), 1);
    assert_eq!(store.state().workouts[0].id, 7);
}

#[tokio::test]
async fn test_deleting_unknown_workout_is_not_found() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), None).await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    assert!(matches!(
        store.delete_workout(42).await,
        Err(TrackerError::NotFound(_))
    ));
    assert!(requests_with(&server, "DELETE", "/rest/v1/workouts").await.is_empty());
}

#[tokio::test]
async fn test_finishing_from_calendar_stamps_end_and_duration() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T08:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;
    clock.advance(Duration::minutes(30));

    store.finish_workout(7).await.unwrap();

    let patched = requests_with(&server, "PATCH", "/rest/v1/workouts").await;
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body, json!({ "end_time": "2024-05-01T09:30:00Z", "duration": 5400 }));
    assert!(store.state().editor.is_none());

    assert!(matches!(
        store.finish_workout(99).await,
        Err(TrackerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_token_refreshed_during_long_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "refresh-2",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": USER, "email": "lifter@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T08:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_reads(
        &server,
        json!([workout_row(7, TODAY, Some("2024-05-01T08:00:00Z"), json!([]))]),
        json!([]),
        Some(profile(&[])),
    )
    .await;

    let clock = nine_am();
    let backend = Backend::new(&BackendConfig::new(server.uri(), "anon-key")).unwrap();
    backend.set_session(Some(AuthSession {
        expires_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        ..session()
    }));
    let sessions = Arc::new(MemorySessionStore::new());
    let mut store = Store::new(backend, sessions.clone(), clock.clone());
    store.load().await.unwrap();
    assert!(requests_with(&server, "POST", "/auth/v1/token").await.is_empty());

    clock.advance(Duration::seconds(3601));
    let exit = store
        .watch_session(std::future::pending(), |_| {})
        .await
        .unwrap();

    assert_eq!(exit, TickerExit::Expired(7201));
    assert!(store.state().editor.is_none());
    let saved = sessions.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh-token");
    assert_eq!(saved.refresh_token, "refresh-2");
}

#[tokio::test]
async fn test_expired_session_finishes_once() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/workouts"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workout_row(
            7,
            TODAY,
            Some("2024-05-01T08:00:00Z"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = resumed_session(&server, &clock).await;
    clock.advance(Duration::seconds(3601));

    let mut ticks = Vec::new();
    let exit = store
        .watch_session(std::future::pending(), |elapsed| ticks.push(elapsed))
        .await
        .unwrap();

    assert_eq!(exit, TickerExit::Expired(7201));
    assert_eq!(ticks, vec![7201]);
    assert!(store.state().editor.is_none());

    let patched = requests_with(&server, "PATCH", "/rest/v1/workouts").await;
    assert_eq!(patched.len(), 1);
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body["duration"], 7201);
    assert_eq!(body["end_time"], "2024-05-01T10:00:01Z");

    assert!(store.watch_session(std::future::pending(), |_| {}).await.is_err());
}

#[tokio::test]
async fn test_favorite_rolls_back_on_failure() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), Some(profile(&["0002"]))).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    assert!(store.toggle_favorite("0001").await.is_err());
    assert_eq!(store.state().favorites, vec!["0002".to_string()]);
    assert!(!store.state().is_favorite("0001"));
}

#[tokio::test]
async fn test_measurement_needs_both_values() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), None).await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    let err = store
        .add_measurement(&NewMeasurementRequest {
            weight: Some(Decimal::from(80)),
            height: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Please enter both height and weight");
    assert!(requests_with(&server, "POST", "/rest/v1/measurements").await.is_empty());
}

#[tokio::test]
async fn test_second_measurement_same_day_replaces_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/measurements"))
        .and(query_param("created_at", "gte.2024-05-01T00:00:00+00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 11,
            "user_id": USER,
            "created_at": "2024-05-01T07:15:00Z",
            "weight": 80.0,
            "height": 180.0
        }])))
        .mount(&server)
        .await;
    mount_reads(&server, json!([]), json!([]), Some(profile(&[]))).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/measurements"))
        .and(query_param("id", "eq.11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "user_id": USER,
            "created_at": "2024-05-01T09:00:00Z",
            "weight": 81.5,
            "height": 180.0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let clock = nine_am();
    let mut store = signed_in_store(&server, &clock);
    store.load().await.unwrap();

    let saved = store
        .add_measurement(&NewMeasurementRequest {
            weight: Some(Decimal::new(815, 1)),
            height: Some(Decimal::from(180)),
        })
        .await
        .unwrap();

    assert_eq!(saved.id, 11);
    assert!(requests_with(&server, "POST", "/rest/v1/measurements").await.is_empty());
    let patched = requests_with(&server, "PATCH", "/rest/v1/measurements").await;
    let body: Value = patched[0].body_json().unwrap();
    assert_eq!(body["weight"], 81.5);
}

#[tokio::test]
async fn test_sign_in_saves_session_and_loads() {
    let server = MockServer::start().await;
    mount_reads(&server, json!([]), json!([]), None).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "refresh-2",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": USER, "email": "lifter@example.com" }
        })))
        .mount(&server)
        .await;

    let sessions = Arc::new(MemorySessionStore::new());
    let backend = Backend::new(&BackendConfig::new(server.uri(), "anon-key")).unwrap();
    let mut store = Store::new(backend, sessions.clone(), nine_am());

    store
        .sign_in(&SignInRequest {
            email: "lifter@example.com".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();

    assert!(store.state().user.is_some());
    assert_eq!(store.state().library.len(), 2);
    let saved = sessions.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh-token");
}

#[tokio::test]
async fn test_unconfirmed_email_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "email_not_confirmed",
            "msg": "Email not confirmed"
        })))
        .mount(&server)
        .await;

    let backend = Backend::new(&BackendConfig::new(server.uri(), "anon-key")).unwrap();
    let mut store = Store::new(backend, Arc::new(MemorySessionStore::new()), nine_am());

    let err = store
        .sign_in(&SignInRequest {
            email: "lifter@example.com".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::EmailNotConfirmed(_)));
    assert!(store.state().user.is_none());
}
