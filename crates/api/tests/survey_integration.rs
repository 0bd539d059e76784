//! Integration tests for the survey HTTP surface.
//!
//! Requests go through the full router (extractors, middleware, error
//! mapping) over the in-memory store.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{
    create_area, create_test_app, create_test_app_with_config, empty_request_with_auth,
    get_request_with_auth, json_request_with_auth, parse_response_body, test_config, TestUser,
};
use domain::services::LiveEvent;

async fn send(
    app: &axum::Router,
    request: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

async fn create_grid(app: &axum::Router, user: &TestUser, area_id: &str, rows: u32, cols: u32) {
    let (status, body) = send(
        app,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points", area_id),
            &user.token,
            json!({ "grid": { "rows": rows, "cols": cols } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn test_full_survey_walk() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Field-1").await;

    create_grid(&app.router, &user, &area_id, 1, 3).await;

    // All three points start unmeasured
    let (status, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/points", area_id), &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["points"][0]["pointId"], "A1");
    assert_eq!(body["points"][2]["status"], "unmeasured");

    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/points/next", area_id), &user.token),
    )
    .await;
    assert_eq!(body["complete"], false);
    assert_eq!(body["point"]["pointId"], "A1");

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A1/complete", area_id),
            &user.token,
            json!({ "temperature": 25.0, "moisture": 30.0, "autoAdvance": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["completed"]["status"], "measured");
    assert_eq!(body["next"]["pointId"], "A2");
    assert_eq!(body["progress"]["measuredPoints"], 1);
    assert_eq!(body["progress"]["completionPercentage"], 33);

    let (_, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A2/complete", area_id),
            &user.token,
            json!({ "temperature": 27.0 }),
        ),
    )
    .await;
    assert_eq!(body["area"]["temperatureAvg"], 26.0);
    assert_eq!(body["area"]["moistureAvg"], 30.0);
    assert_eq!(body["area"]["totalMeasurements"], 3);

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A3/skip", area_id),
            &user.token,
            json!({ "reason": "standing water" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["skipped"]["status"], "skipped");
    assert!(body["next"].is_null());
    assert_eq!(body["progress"]["isComplete"], true);
    assert_eq!(body["progress"]["completionPercentage"], 67);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/points/next", area_id), &user.token),
    )
    .await;
    assert_eq!(body["complete"], true);
    assert!(body["point"].is_null());

    // Skips never enter averages
    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}", area_id), &user.token),
    )
    .await;
    assert_eq!(body["temperatureAvg"], 26.0);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/session", area_id), &user.token),
    )
    .await;
    assert_eq!(body["state"], "complete");

    let kinds: Vec<&str> = app.relay.events().iter().map(LiveEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "points_created",
            "area_updated",
            "point_completed",
            "area_updated",
            "point_completed",
            "area_updated",
            "point_skipped",
            "area_updated",
        ]
    );
}

#[tokio::test]
async fn test_status_filter() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Filter").await;
    create_grid(&app.router, &user, &area_id, 1, 3).await;

    send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A2/skip", area_id),
            &user.token,
            json!({}),
        ),
    )
    .await;

    let uri = |status: &str| format!("/api/v1/areas/{}/points?status={}", area_id, status);
    let (_, skipped) = send(&app.router, get_request_with_auth(&uri("skipped"), &user.token)).await;
    assert_eq!(skipped["total"], 1);
    assert_eq!(skipped["points"][0]["pointId"], "A2");

    let (_, measured) = send(&app.router, get_request_with_auth(&uri("measured"), &user.token)).await;
    assert_eq!(measured["total"], 0);

    let (_, unmeasured) =
        send(&app.router, get_request_with_auth(&uri("unmeasured"), &user.token)).await;
    assert_eq!(unmeasured["total"], 2);

    let (status, body) = send(&app.router, get_request_with_auth(&uri("done"), &user.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_skip_without_body() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Bare skip").await;
    create_grid(&app.router, &user, &area_id, 1, 1).await;

    let (status, body) = send(
        &app.router,
        empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A1/skip", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.get("reason").is_none());
}

#[tokio::test]
async fn test_point_already_measured() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Twice").await;
    create_grid(&app.router, &user, &area_id, 1, 2).await;

    let complete = |point: &str| {
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/{}/complete", area_id, point),
            &user.token,
            json!({ "ph": 6.5 }),
        )
    };

    let (status, _) = send(&app.router, complete("A1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, complete("A1")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = send(&app.router, complete("Z9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_out_of_range_reading_rejected() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Range").await;
    create_grid(&app.router, &user, &area_id, 1, 1).await;

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A1/complete", area_id),
            &user.token,
            json!({ "ph": 15.2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "ph");

    // Still unmeasured
    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/progress", area_id), &user.token),
    )
    .await;
    assert_eq!(body["unmeasuredPoints"], 1);
}

#[tokio::test]
async fn test_point_creation_rules() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Rules").await;
    let uri = format!("/api/v1/areas/{}/points", area_id);

    let (status, body) = send(
        &app.router,
        json_request_with_auth(Method::POST, &uri, &user.token, json!({ "count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pointIds"], json!(["P001", "P002", "P003"]));

    // Overlapping ids are rejected as a whole
    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &uri,
            &user.token,
            json!({ "pointIds": ["X1", "P002"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app.router, get_request_with_auth(&uri, &user.token)).await;
    assert_eq!(body["total"], 3);

    // Exactly one layout
    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &uri,
            &user.token,
            json!({ "count": 2, "pattern": { "prefix": "B", "count": 2 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        json_request_with_auth(Method::POST, &uri, &user.token, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Over the configured per-request limit (100 in tests)
    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &uri,
            &user.token,
            json!({ "grid": { "rows": 11, "cols": 10 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_random_strategy_returns_unmeasured_point() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Random").await;
    create_grid(&app.router, &user, &area_id, 2, 2).await;

    let (status, body) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}/points/next?strategy=random", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "random");
    assert_eq!(body["point"]["status"], "unmeasured");

    let (status, _) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}/points/next?strategy=nearest", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authentication_required() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/v1/areas")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, get_request_with_auth("/api/v1/areas", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_area_ownership() {
    let app = create_test_app();
    let owner = TestUser::user();
    let stranger = TestUser::user();
    let admin = TestUser::admin();
    let area_id = create_area(&app.router, &owner, "Private").await;
    let uri = format!("/api/v1/areas/{}", area_id);

    let (status, _) = send(&app.router, get_request_with_auth(&uri, &stranger.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, get_request_with_auth(&uri, &admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app.router, get_request_with_auth("/api/v1/areas", &stranger.token)).await;
    assert_eq!(body["total"], 0);

    let (_, body) = send(&app.router, get_request_with_auth("/api/v1/areas", &owner.token)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["areas"][0]["ownerId"], owner.user_id.to_string());

    let (status, _) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}", uuid::Uuid::new_v4()),
            &owner.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        get_request_with_auth("/api/v1/areas/not-a-uuid", &owner.token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_points() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Reset").await;
    create_grid(&app.router, &user, &area_id, 1, 2).await;

    send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/A1/complete", area_id),
            &user.token,
            json!({ "nitrogen": 40.0 }),
        ),
    )
    .await;

    let (status, body) = send(
        &app.router,
        empty_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/points/reset", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["resetCount"], 2);
    assert_eq!(body["progress"]["unmeasuredPoints"], 2);
    assert_eq!(body["progress"]["isComplete"], false);

    let (_, area) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}", area_id), &user.token),
    )
    .await;
    assert!(area["nitrogenAvg"].is_null());
    assert_eq!(area["totalMeasurements"], 2);
}

#[tokio::test]
async fn test_sessions() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Session").await;
    let uri = format!("/api/v1/areas/{}/session", area_id);

    // No points yet
    let (status, _) = send(
        &app.router,
        json_request_with_auth(Method::POST, &uri, &user.token, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app.router, get_request_with_auth(&uri, &user.token)).await;
    assert_eq!(body["state"], "complete");
    assert_eq!(body["progress"]["totalPoints"], 0);

    create_grid(&app.router, &user, &area_id, 1, 2).await;

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &uri,
            &user.token,
            json!({ "measurementIntervalSecs": 45, "sessionName": "Morning run" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["currentPoint"]["pointId"], "A1");
    assert_eq!(body["settings"]["measurementIntervalSecs"], 45);
    assert_eq!(body["settings"]["autoAdvance"], true);

    let (_, body) = send(&app.router, get_request_with_auth(&uri, &user.token)).await;
    assert_eq!(body["state"], "not_started");
    assert_eq!(body["nextPoint"]["pointId"], "A1");
}

#[tokio::test]
async fn test_measurement_crud_keeps_area_in_sync() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Free").await;

    let record = |temperature: f64| {
        json_request_with_auth(
            Method::POST,
            "/api/v1/measurements",
            &user.token,
            json!({
                "areaId": area_id,
                "deviceId": "sensor-1",
                "temperature": temperature,
                "latitude": 48.123456789123,
                "longitude": 17.1
            }),
        )
    };

    let (status, first) = send(&app.router, record(20.0)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["latitude"], 48.12345679);
    let (_, second) = send(&app.router, record(30.0)).await;

    let area_uri = format!("/api/v1/areas/{}", area_id);
    let (_, area) = send(&app.router, get_request_with_auth(&area_uri, &user.token)).await;
    assert_eq!(area["temperatureAvg"], 25.0);
    assert_eq!(area["totalMeasurements"], 2);

    let second_uri = format!("/api/v1/measurements/{}", second["measurementId"]);
    let (status, updated) = send(
        &app.router,
        json_request_with_auth(
            Method::PATCH,
            &second_uri,
            &user.token,
            json!({ "temperature": 40.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["deviceId"], "sensor-1");

    let (_, area) = send(&app.router, get_request_with_auth(&area_uri, &user.token)).await;
    assert_eq!(area["temperatureAvg"], 30.0);

    let (_, list) = send(
        &app.router,
        get_request_with_auth("/api/v1/measurements?deviceId=sensor-1", &user.token),
    )
    .await;
    assert_eq!(list["total"], 2);

    let (status, _) = send(
        &app.router,
        empty_request_with_auth(Method::DELETE, &second_uri, &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, area) = send(&app.router, get_request_with_auth(&area_uri, &user.token)).await;
    assert_eq!(area["temperatureAvg"], 20.0);
    assert_eq!(area["totalMeasurements"], 1);

    let (status, _) = send(&app.router, get_request_with_auth(&second_uri, &user.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nutrient_cap_from_config() {
    let mut config = test_config();
    config.limits.max_nutrient_value = 500.0;
    let app = create_test_app_with_config(config);
    let user = TestUser::user();

    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            "/api/v1/measurements",
            &user.token,
            json!({ "potassium": 750.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_area_statistics() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Stats").await;
    create_grid(&app.router, &user, &area_id, 1, 2).await;

    for (point, moisture) in [("A1", 10.0), ("A2", 20.0)] {
        send(
            &app.router,
            json_request_with_auth(
                Method::POST,
                &format!("/api/v1/areas/{}/points/{}/complete", area_id, point),
                &user.token,
                json!({ "moisture": moisture }),
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/stats", area_id), &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["measuredPoints"], 2);

    let moisture = body["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["metric"] == "moisture")
        .expect("moisture statistics");
    assert_eq!(moisture["average"], 15.0);
    assert_eq!(moisture["min"], 10.0);
    assert_eq!(moisture["max"], 20.0);
}

#[tokio::test]
async fn test_public_endpoints_and_headers() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/health/live")
                .header("x-request-id", "trace-me-1")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-me-1");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_point_coordinates_lifecycle() {
    let app = create_test_app();
    let user = TestUser::user();
    let area_id = create_area(&app.router, &user, "Coordinates").await;
    create_grid(&app.router, &user, &area_id, 2, 2).await;

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::PUT,
            &format!("/api/v1/areas/{}/points/A1/coordinates", area_id),
            &user.token,
            json!({ "lat": 13.7, "lng": 100.5, "source": "gps" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["source"], "gps");
    assert_eq!(body["point"]["hasCoordinates"], true);
    assert_eq!(body["point"]["coordinates"]["lat"], 13.7);

    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::PUT,
            &format!("/api/v1/areas/{}/points/A1/coordinates", area_id),
            &user.token,
            json!({ "lat": 95.0, "lng": 100.5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // One unknown point fails the whole batch
    let (status, _) = send(
        &app.router,
        json_request_with_auth(
            Method::PUT,
            &format!("/api/v1/areas/{}/coordinates", area_id),
            &user.token,
            json!({ "coordinates": [
                { "pointId": "A2", "lat": 13.7, "lng": 100.501 },
                { "pointId": "C9", "lat": 13.8, "lng": 100.6 }
            ] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(&format!("/api/v1/areas/{}/coordinates", area_id), &user.token),
    )
    .await;
    assert_eq!(body["statistics"]["totalPoints"], 1);
    assert_eq!(body["coordinates"][0]["pointId"], "A1");

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::PUT,
            &format!("/api/v1/areas/{}/coordinates", area_id),
            &user.token,
            json!({ "coordinates": [{ "pointId": "A2", "lat": 13.7, "lng": 100.501 }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 1);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}/coordinates?includeNulls=true", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(body["statistics"]["totalPoints"], 4);
    assert_eq!(body["statistics"]["pointsWithoutCoordinates"], 2);
    assert_eq!(body["coordinates"][2]["hasCoordinates"], false);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}/coordinates/stats", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(body["gpsStatistics"]["coveragePercentage"], 50);
    assert_eq!(body["gpsStatistics"]["bounds"]["maxLng"], 100.501);

    let (status, body) = send(
        &app.router,
        json_request_with_auth(
            Method::POST,
            &format!("/api/v1/areas/{}/coordinates/estimate", area_id),
            &user.token,
            json!({
                "gridRows": 2, "gridCols": 2,
                "startLat": 13.7, "startLng": 100.5,
                "latSpacing": 0.001, "lngSpacing": 0.001,
                "apply": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 2);
    assert_eq!(body["applied"], true);
    assert_eq!(body["estimatedPoints"][0]["pointId"], "B1");
    assert_eq!(body["estimatedPoints"][0]["gridPosition"]["row"], 1);
    assert_eq!(body["gridConfiguration"]["cols"], 2);

    let (_, body) = send(
        &app.router,
        get_request_with_auth(
            &format!("/api/v1/areas/{}/coordinates/stats", area_id),
            &user.token,
        ),
    )
    .await;
    assert_eq!(body["gpsStatistics"]["coveragePercentage"], 100);
}
