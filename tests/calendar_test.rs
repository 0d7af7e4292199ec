mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

#[tokio::test]
async fn test_schedule_and_list() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let workout = common::create_template(&app, &cookie, "Legs", json!([])).await;
    let today = Utc::now().date_naive();
    let upcoming = today + Duration::days(2);

    let (status, entry) = common::send(
        &app,
        "POST",
        "/calendar",
        &cookie,
        Some(json!({ "workout_id": workout["id"], "date": upcoming })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["status"], "scheduled");
    assert_eq!(entry["workout_name"], "Legs");

    let uri = format!(
        "/calendar?from={}&to={}",
        today,
        today + Duration::days(7)
    );
    let (status, entries) = common::send(&app, "GET", &uri, &cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["date"], upcoming.to_string());

    // Outside the range
    let uri = format!(
        "/calendar?from={}&to={}",
        today + Duration::days(3),
        today + Duration::days(7)
    );
    let (_, entries) = common::send(&app, "GET", &uri, &cookie, None).await;
    assert!(entries.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_past_scheduled_entries_become_missed() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let workout = common::create_template(&app, &cookie, "Push", json!([])).await;
    let today = Utc::now().date_naive();
    let past = today - Duration::days(3);

    let (status, entry) = common::send(
        &app,
        "POST",
        "/calendar",
        &cookie,
        Some(json!({ "workout_id": workout["id"], "date": past })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["status"], "scheduled");

    let uri = format!("/calendar?from={}&to={}", past, today);
    let (_, entries) = common::send(&app, "GET", &uri, &cookie, None).await;
    assert_eq!(entries[0]["status"], "missed");
}

#[tokio::test]
async fn test_finishing_completes_todays_entry() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let workout = common::create_template(
        &app,
        &cookie,
        "Pull",
        json!([{ "exercise_id": "builtin-pull-up", "sets": [{ "reps": 8, "weight": 0.0 }] }]),
    )
    .await;
    let today = Utc::now().date_naive();

    let (_, scheduled) = common::send(
        &app,
        "POST",
        "/calendar",
        &cookie,
        Some(json!({ "workout_id": workout["id"], "date": today })),
    )
    .await;

    let (_, view) = common::send(
        &app,
        "POST",
        "/active",
        &cookie,
        Some(json!({ "template_id": workout["id"] })),
    )
    .await;
    let exercise = view["workout"]["exercises"][0]["id"].as_str().unwrap();
    let set = view["workout"]["exercises"][0]["sets"][0]["id"].as_str().unwrap();
    common::send(
        &app,
        "POST",
        &format!("/active/exercises/{}/sets/{}/toggle", exercise, set),
        &cookie,
        None,
    )
    .await;
    let (status, finished) =
        common::send(&app, "POST", "/active/finish", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    // The scheduled entry is completed in place
    assert_eq!(finished["calendar"]["id"], scheduled["id"]);
    assert_eq!(finished["calendar"]["status"], "completed");

    let uri = format!("/calendar?from={}&to={}", today, today);
    let (_, entries) = common::send(&app, "GET", &uri, &cookie, None).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["history_id"], finished["history"]["id"]);
}

#[tokio::test]
async fn test_calendar_errors() {
    let pool = common::setup_test_db();
    let owner = common::login_as(&pool, "owner").await;
    let other = common::login_as(&pool, "other").await;
    let app = common::create_test_app(pool);

    let workout = common::create_template(&app, &owner, "Push", json!([])).await;
    let today = Utc::now().date_naive();

    let (status, _) = common::send(
        &app,
        "POST",
        "/calendar",
        &other,
        Some(json!({ "workout_id": workout["id"], "date": today })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/calendar?from={}&to={}", today, today - Duration::days(1));
    let (status, _) = common::send(&app, "GET", &uri, &owner, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, entry) = common::send(
        &app,
        "POST",
        "/calendar",
        &owner,
        Some(json!({ "workout_id": workout["id"], "date": today })),
    )
    .await;
    let entry_uri = format!("/calendar/{}", entry["id"].as_str().unwrap());

    let (status, _) = common::send(&app, "DELETE", &entry_uri, &other, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(&app, "DELETE", &entry_uri, &owner, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
