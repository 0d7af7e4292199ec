mod common;

use axum::{http::StatusCode, Router};
use serde_json::{json, Value};

fn exercise_id(view: &Value, index: usize) -> String {
    view["workout"]["exercises"][index]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn set_id(view: &Value, exercise: usize, set: usize) -> String {
    view["workout"]["exercises"][exercise]["sets"][set]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Runs a one-exercise workout with a single completed set and returns the finish response.
async fn log_single_set(app: &Router, cookie: &str, exercise: &str, reps: i32, weight: f64) -> Value {
    let (status, _) = common::send(app, "POST", "/active", cookie, Some(json!({ "name": "Quick" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = common::send(
        app,
        "POST",
        "/active/exercises",
        cookie,
        Some(json!({ "exercise_id": exercise })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let we = created["id"].as_str().unwrap().to_string();
    let set = set_id(&created["active"], 0, 0);

    let (status, _) = common::send(
        app,
        "PATCH",
        &format!("/active/exercises/{}/sets/{}", we, set),
        cookie,
        Some(json!({ "reps": reps, "weight": weight, "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, finished) =
        common::send(app, "POST", "/active/finish", cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    finished
}

#[tokio::test]
async fn test_full_workout_from_template() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let template = common::create_template(
        &app,
        &cookie,
        "Push A",
        json!([{
            "exercise_id": "builtin-bench-press",
            "sets": [{ "reps": 5, "weight": 100.0 }, { "reps": 5, "weight": 100.0 }]
        }]),
    )
    .await;
    let template_id = template["id"].as_str().unwrap();

    let (status, view) = common::send(
        &app,
        "POST",
        "/active",
        &cookie,
        Some(json!({ "template_id": template_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["template_id"], template_id);
    assert_eq!(view["workout"]["name"], "Push A");
    assert_eq!(view["completed_sets"], 0);
    assert_eq!(view["dirty"], false);

    // Only one workout at a time
    let (status, _) = common::send(&app, "POST", "/active", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) =
        common::send(&app, "POST", "/active/finish", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Complete at least one set before finishing");

    let bench = exercise_id(&view, 0);
    let (status, toggled) = common::send(
        &app,
        "POST",
        &format!("/active/exercises/{}/sets/{}/toggle", bench, set_id(&view, 0, 0)),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);
    assert_eq!(toggled["active"]["completed_sets"], 1);
    assert_eq!(toggled["active"]["dirty"], true);

    let (status, created) = common::send(
        &app,
        "POST",
        "/active/exercises",
        &cookie,
        Some(json!({ "exercise_id": "builtin-squat" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let squat = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["active"]["workout"]["exercises"][1]["exercise_name"], "Squat");
    let squat_set = set_id(&created["active"], 1, 0);

    let (status, updated) = common::send(
        &app,
        "PATCH",
        &format!("/active/exercises/{}/sets/{}", squat, squat_set),
        &cookie,
        Some(json!({ "reps": 5, "weight": 140.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["workout"]["exercises"][1]["sets"][0]["weight"], 140.0);

    // A new set starts from the previous load
    let (status, added) = common::send(
        &app,
        "POST",
        &format!("/active/exercises/{}/sets", squat),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_set = &added["active"]["workout"]["exercises"][1]["sets"][1];
    assert_eq!(second_set["id"], added["id"]);
    assert_eq!(second_set["weight"], 140.0);
    assert_eq!(second_set["completed"], false);

    let (status, _) = common::send(
        &app,
        "POST",
        &format!("/active/exercises/{}/sets/{}/toggle", squat, squat_set),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, finished) = common::send(
        &app,
        "POST",
        "/active/finish",
        &cookie,
        Some(json!({ "update_template": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Only completed sets are recorded
    let history = &finished["history"];
    assert_eq!(history["workout_id"], template_id);
    assert_eq!(history["total_volume"], 1200.0);
    assert_eq!(history["exercises"].as_array().unwrap().len(), 2);
    assert_eq!(history["exercises"][0]["sets"].as_array().unwrap().len(), 1);
    assert_eq!(history["exercises"][1]["exercise_name"], "Squat");

    let new_records = finished["new_records"].as_array().unwrap();
    assert!(new_records
        .iter()
        .any(|r| r["exercise_id"] == "builtin-bench-press"
            && r["kind"] == "max_weight"
            && r["value"] == 100.0
            && r["previous"].is_null()));

    assert_eq!(finished["calendar"]["status"], "completed");
    assert_eq!(finished["calendar"]["history_id"], history["id"]);
    assert!(finished["template_changes"].is_object());

    let (status, _) = common::send(&app, "GET", "/active", &cookie, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The template now mirrors what was performed
    let (_, template) = common::send(
        &app,
        "GET",
        &format!("/workouts/{}", template_id),
        &cookie,
        None,
    )
    .await;
    let exercises = template["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0]["sets"].as_array().unwrap().len(), 1);
    assert_eq!(exercises[1]["exercise_id"], "builtin-squat");
    assert_eq!(exercises[1]["sets"][0]["weight"], 140.0);
    assert_eq!(exercises[1]["sets"][0]["completed"], false);

    let (_, page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["total_pages"], 1);
    assert_eq!(page["entries"][0]["name"], "Push A");

    let (status, entry) = common::send(
        &app,
        "GET",
        &format!("/history/{}", history["id"].as_str().unwrap()),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["exercises"][0]["sets"][0]["reps"], 5);
}

#[tokio::test]
async fn test_finish_without_template_update_keeps_template() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let template = common::create_template(
        &app,
        &cookie,
        "Legs",
        json!([{ "exercise_id": "builtin-squat", "sets": [{ "reps": 5, "weight": 120.0 }, {}] }]),
    )
    .await;
    let template_id = template["id"].as_str().unwrap();

    let (_, view) = common::send(
        &app,
        "POST",
        "/active",
        &cookie,
        Some(json!({ "template_id": template_id })),
    )
    .await;
    common::send(
        &app,
        "POST",
        &format!(
            "/active/exercises/{}/sets/{}/toggle",
            exercise_id(&view, 0),
            set_id(&view, 0, 0)
        ),
        &cookie,
        None,
    )
    .await;

    let (status, finished) =
        common::send(&app, "POST", "/active/finish", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(finished["template_changes"].is_null());

    let (_, stored) = common::send(
        &app,
        "GET",
        &format!("/workouts/{}", template_id),
        &cookie,
        None,
    )
    .await;
    assert_eq!(stored, template);
}

#[tokio::test]
async fn test_new_records_compare_against_history() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    log_single_set(&app, &cookie, "builtin-bench-press", 5, 100.0).await;

    let finished = log_single_set(&app, &cookie, "builtin-bench-press", 5, 105.0).await;
    let max_weight = finished["new_records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["kind"] == "max_weight")
        .expect("max weight record");
    assert_eq!(max_weight["value"], 105.0);
    assert_eq!(max_weight["previous"], 100.0);

    // A lighter session sets no records
    let finished = log_single_set(&app, &cookie, "builtin-bench-press", 5, 90.0).await;
    assert!(finished["new_records"].as_array().unwrap().is_empty());

    // Finishing without a template still lands on the calendar
    assert_eq!(finished["calendar"]["status"], "completed");
    assert!(finished["calendar"]["workout_id"].is_null());

    let (_, page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["entries"][0]["total_volume"], 450.0);
}

#[tokio::test]
async fn test_editing_the_active_workout() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let (status, view) = common::send(&app, "POST", "/active", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["workout"]["name"], "Workout");

    let (status, _) = common::send(
        &app,
        "POST",
        "/active/exercises",
        &cookie,
        Some(json!({ "exercise_id": "no-such-exercise" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut ids = Vec::new();
    for exercise in ["builtin-bench-press", "builtin-barbell-row"] {
        let (_, created) = common::send(
            &app,
            "POST",
            "/active/exercises",
            &cookie,
            Some(json!({ "exercise_id": exercise })),
        )
        .await;
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let (status, grouped) = common::send(
        &app,
        "POST",
        "/active/supersets",
        &cookie,
        Some(json!({ "ids": ids })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group = grouped["id"].clone();
    assert_eq!(grouped["active"]["workout"]["exercises"][0]["superset_group"], group);
    assert_eq!(grouped["active"]["workout"]["exercises"][1]["superset_group"], group);

    // Ungrouping one member dissolves a two-exercise superset
    let (status, ungrouped) = common::send(
        &app,
        "DELETE",
        &format!("/active/supersets/{}", ids[0]),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ungrouped["workout"]["exercises"][1]["superset_group"].is_null());

    let (status, moved) = common::send(
        &app,
        "POST",
        "/active/exercises/move",
        &cookie,
        Some(json!({ "from": 0, "to": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["workout"]["exercises"][0]["id"], ids[1].as_str());
    assert_eq!(moved["workout"]["exercises"][1]["position"], 1);

    let (status, _) = common::send(
        &app,
        "POST",
        "/active/exercises/move",
        &cookie,
        Some(json!({ "from": 0, "to": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rested) = common::send(
        &app,
        "PUT",
        &format!("/active/exercises/{}/rest", ids[0]),
        &cookie,
        Some(json!({ "rest_seconds": 120, "warmup_rest_seconds": 60 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rested["workout"]["exercises"][1]["rest_seconds"], 120);

    let (status, replaced) = common::send(
        &app,
        "PUT",
        &format!("/active/exercises/{}/replace", ids[0]),
        &cookie,
        Some(json!({ "exercise_id": "builtin-incline-dumbbell-press" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let swapped = &replaced["workout"]["exercises"][1];
    assert_eq!(swapped["exercise_name"], "Incline Dumbbell Press");
    assert_eq!(swapped["sets"].as_array().unwrap().len(), 1);

    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/active/exercises/{}/sets/not-a-set", ids[0]),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(
        &app,
        "PATCH",
        &format!("/active/exercises/{}/sets/{}", ids[0], set_id(&replaced, 1, 0)),
        &cookie,
        Some(json!({ "rpe": 11.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, removed) = common::send(
        &app,
        "DELETE",
        &format!("/active/exercises/{}", ids[1]),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["workout"]["exercises"].as_array().unwrap().len(), 1);
    assert_eq!(removed["workout"]["exercises"][0]["position"], 0);

    let (status, renamed) = common::send(
        &app,
        "PATCH",
        "/active",
        &cookie,
        Some(json!({ "name": "Evening Push", "notes": "Shoulder felt fine" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["workout"]["name"], "Evening Push");
    assert_eq!(renamed["workout"]["notes"], "Shoulder felt fine");

    let (status, _) = common::send(&app, "DELETE", "/active", &cookie, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(&app, "GET", "/active", &cookie, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Discarding leaves no history behind
    let (_, page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_active_workouts_are_per_user() {
    let pool = common::setup_test_db();
    let first = common::login_as(&pool, "first").await;
    let second = common::login_as(&pool, "second").await;
    let app = common::create_test_app(pool);

    let template = common::create_template(&app, &first, "Mine", json!([])).await;

    let (status, _) = common::send(&app, "POST", "/active", &first, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::send(&app, "GET", "/active", &second, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Someone else's template cannot be started
    let (status, _) = common::send(
        &app,
        "POST",
        "/active",
        &second,
        Some(json!({ "template_id": template["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(&app, "POST", "/active", &second, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_history_delete_and_pagination() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let mut last = Value::Null;
    for _ in 0..11 {
        last = log_single_set(&app, &cookie, "builtin-deadlift", 3, 180.0).await;
    }

    let (_, first_page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(first_page["total"], 11);
    assert_eq!(first_page["total_pages"], 2);
    assert_eq!(first_page["entries"].as_array().unwrap().len(), 10);

    let (_, second_page) = common::send(&app, "GET", "/history?page=2", &cookie, None).await;
    assert_eq!(second_page["page"], 2);
    assert_eq!(second_page["entries"].as_array().unwrap().len(), 1);

    let uri = format!("/history/{}", last["history"]["id"].as_str().unwrap());
    let (status, _) = common::send(&app, "DELETE", &uri, &cookie, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(&app, "GET", &uri, &cookie, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finish_after_exercise_removed_from_catalog() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let (_, created) = common::send(
        &app,
        "POST",
        "/exercises",
        &cookie,
        Some(json!({ "name": "Landmine Press", "muscle_group": "shoulders" })),
    )
    .await;
    let landmine = created["id"].as_str().unwrap().to_string();

    common::send(&app, "POST", "/active", &cookie, Some(json!({ "name": "Quick" }))).await;
    let (_, added) = common::send(
        &app,
        "POST",
        "/active/exercises",
        &cookie,
        Some(json!({ "exercise_id": landmine })),
    )
    .await;
    let we = added["id"].as_str().unwrap().to_string();
    let set = set_id(&added["active"], 0, 0);
    common::send(
        &app,
        "PATCH",
        &format!("/active/exercises/{}/sets/{}", we, set),
        &cookie,
        Some(json!({ "reps": 8, "weight": 30.0, "completed": true })),
    )
    .await;

    let (status, _) = common::send(
        &app,
        "DELETE",
        &format!("/exercises/{}", landmine),
        &cookie,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, finished) =
        common::send(&app, "POST", "/active/finish", &cookie, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let exercise = &finished["history"]["exercises"][0];
    assert_eq!(exercise["exercise_name"], "Landmine Press");
    assert!(exercise["exercise_id"].is_null());
    assert_eq!(exercise["sets"][0]["reps"], 8);
    assert!(finished["new_records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_finish_records_nothing_and_can_be_retried() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool.clone());

    let template = common::create_template(
        &app,
        &cookie,
        "Legs",
        json!([{ "exercise_id": "builtin-squat", "sets": [{ "reps": 5, "weight": 140.0 }] }]),
    )
    .await;
    let (_, view) = common::send(
        &app,
        "POST",
        "/active",
        &cookie,
        Some(json!({ "template_id": template["id"] })),
    )
    .await;
    common::send(
        &app,
        "POST",
        &format!(
            "/active/exercises/{}/sets/{}/toggle",
            exercise_id(&view, 0),
            set_id(&view, 0, 0)
        ),
        &cookie,
        None,
    )
    .await;

    pool.get()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_calendar BEFORE INSERT ON calendar_entries
             BEGIN SELECT RAISE(ABORT, 'calendar unavailable'); END;",
        )
        .unwrap();

    let (status, _) = common::send(
        &app,
        "POST",
        "/active/finish",
        &cookie,
        Some(json!({ "update_template": true })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Nothing was recorded and the workout is still running
    let (_, page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(page["total"], 0);
    let (status, _) = common::send(&app, "GET", "/active", &cookie, None).await;
    assert_eq!(status, StatusCode::OK);

    pool.get()
        .unwrap()
        .execute_batch("DROP TRIGGER reject_calendar;")
        .unwrap();

    let (status, finished) = common::send(
        &app,
        "POST",
        "/active/finish",
        &cookie,
        Some(json!({ "update_template": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["calendar"]["history_id"], finished["history"]["id"]);

    let (_, page) = common::send(&app, "GET", "/history", &cookie, None).await;
    assert_eq!(page["total"], 1);
}
