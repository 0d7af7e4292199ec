mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_log_and_list_measurements() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let entries = [
        ("Body weight", 82.0, "kg", "2024-03-01T08:00:00Z"),
        ("Body weight", 81.2, "kg", "2024-03-08T08:00:00Z"),
        ("Waist", 84.0, "cm", "2024-03-02T08:00:00Z"),
    ];
    for (label, value, unit, measured_at) in entries {
        let (status, created) = common::send(
            &app,
            "POST",
            "/measurements",
            &cookie,
            Some(json!({
                "label": label,
                "value": value,
                "unit": unit,
                "measured_at": measured_at
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["label"], label);
    }

    let (status, all) = common::send(&app, "GET", "/measurements", &cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);
    // Newest first
    assert_eq!(all[0]["value"], 81.2);

    let (_, weights) = common::send(
        &app,
        "GET",
        "/measurements?label=Body%20weight",
        &cookie,
        None,
    )
    .await;
    assert_eq!(weights.as_array().unwrap().len(), 2);

    let (status, latest) = common::send(&app, "GET", "/measurements/latest", &cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    let latest = latest.as_array().unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0]["label"], "Body weight");
    assert_eq!(latest[0]["value"], 81.2);
    assert_eq!(latest[1]["label"], "Waist");
}

#[tokio::test]
async fn test_measurement_defaults_to_now() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    let before = chrono::Utc::now();
    let (status, created) = common::send(
        &app,
        "POST",
        "/measurements",
        &cookie,
        Some(json!({ "label": " Body fat ", "value": 15.5, "unit": "%" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["label"], "Body fat");

    let measured_at: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(created["measured_at"].clone()).unwrap();
    assert!(measured_at >= before);
}

#[tokio::test]
async fn test_measurement_validation() {
    let pool = common::setup_test_db();
    let cookie = common::login_as(&pool, "lifter").await;
    let app = common::create_test_app(pool);

    for body in [
        json!({ "label": "", "value": 80.0, "unit": "kg" }),
        json!({ "label": "Body weight", "value": 0.0, "unit": "kg" }),
        json!({ "label": "Body weight", "value": -3.0, "unit": "kg" }),
    ] {
        let (status, _) = common::send(&app, "POST", "/measurements", &cookie, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn test_delete_measurement() {
    let pool = common::setup_test_db();
    let owner = common::login_as(&pool, "owner").await;
    let other = common::login_as(&pool, "other").await;
    let app = common::create_test_app(pool);

    let (_, created) = common::send(
        &app,
        "POST",
        "/measurements",
        &owner,
        Some(json!({ "label": "Arm", "value": 38.0, "unit": "cm" })),
    )
    .await;
    let uri = format!("/measurements/{}", created["id"].as_str().unwrap());

    let (_, listed) = common::send(&app, "GET", "/measurements", &other, None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = common::send(&app, "DELETE", &uri, &other, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(&app, "DELETE", &uri, &owner, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = common::send(&app, "GET", "/measurements", &owner, None).await;
    assert!(listed.as_array().unwrap().is_empty());
}
