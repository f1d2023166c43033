use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use pollverse::{
    build_router,
    SECURITY_HEADERS,
    config::{Config, Environment, StorageBackend},
    db::MemoryStore,
    polls::broadcaster::{channel_key, ChannelEvent, Subscriber},
    state::AppState,
    utils::clock::{Clock, ManualClock},
};

struct TestApp {
    router: Router,
    state: AppState,
    clock: Arc<ManualClock>,
    storage: Arc<MemoryStore>,
}

fn app() -> TestApp {
    app_with(Config {
        storage: StorageBackend::Memory,
        ..Config::default()
    })
}

fn app_with(config: Config) -> TestApp {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::new(config, storage.clone(), clock.clone());
    TestApp {
        router: build_router(state.clone()),
        state,
        clock,
        storage,
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    device: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(device) = device {
        req = req.header(header::COOKIE, format!("deviceId={device}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookie, json)
}

async fn create_poll(app: &TestApp, body: Value) -> Value {
    let (status, _, json) = send(app, "POST", "/api/polls", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"].clone()
}

fn lunch() -> Value {
    json!({
        "name": "Lunch",
        "question": "Where do we eat?",
        "answers": ["Pizza", "Sushi"],
        "duration": 1
    })
}

async fn vote(app: &TestApp, code: &str, device: &str, selected: Value) -> (StatusCode, Value) {
    let (status, _, json) = send(
        app,
        "POST",
        &format!("/api/polls/{code}/vote"),
        Some(device),
        Some(json!({ "selected": selected })),
    )
    .await;
    (status, json)
}

#[tokio::test]
async fn test_lunch_scenario() {
    let app = app();
    let poll = create_poll(&app, lunch()).await;
    let code = poll["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(poll["isActive"], true);
    assert_eq!(poll["multipleChoices"], false);

    let (status, body) = vote(&app, &code, "d1", json!([0])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["voteCounts"], json!([1, 0]));
    assert_eq!(body["data"]["totalVotes"], 1);
    assert_eq!(body["data"]["vote"]["selected"], json!([0]));
    assert_eq!(body["data"]["vote"]["deviceId"], "d1");

    let (status, body) = vote(&app, &code, "d1", json!([1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ALREADY_VOTED");
    assert_eq!(body["message"], "You have already voted in this poll");

    let (status, body) = vote(&app, &code, "d2", json!([0, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MULTIPLE_CHOICE_NOT_ALLOWED");

    let (_, _, results) = send(&app, "GET", &format!("/api/polls/{code}/results"), None, None).await;
    assert_eq!(results["data"]["voteCounts"], json!([1, 0]));
    assert_eq!(results["data"]["totalVotes"], 1);

    app.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let (status, body) = vote(&app, &code, "d3", json!([1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "POLL_INACTIVE");
    assert_eq!(body["message"], "This poll has expired");

    let (_, _, results) = send(&app, "GET", &format!("/api/polls/{code}/results"), None, None).await;
    assert_eq!(results["data"]["isActive"], false);
}

#[tokio::test]
async fn test_poll_view_reports_device_vote() {
    let app = app();
    let poll = create_poll(&app, lunch()).await;
    let code = poll["code"].as_str().unwrap();

    let (_, _, view) = send(&app, "GET", &format!("/api/polls/{code}"), Some("d1"), None).await;
    assert!(view["data"]["userVote"].is_null());

    vote(&app, code, "d1", json!([1])).await;

    let (status, _, view) = send(&app, "GET", &format!("/api/polls/{code}"), Some("d1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["data"]["userVote"], json!([1]));
    assert_eq!(view["data"]["voteCounts"], json!([0, 1]));

    let (_, _, other) = send(&app, "GET", &format!("/api/polls/{code}"), Some("d2"), None).await;
    assert!(other["data"]["userVote"].is_null());

    let (_, _, results) = send(&app, "GET", &format!("/api/polls/{code}/results"), Some("d1"), None).await;
    assert!(results["data"].get("userVote").is_none());
}

#[tokio::test]
async fn test_device_cookie_issued_once() {
    let app = app();
    let poll = create_poll(&app, lunch()).await;
    let code = poll["code"].as_str().unwrap();

    let (status, cookie, _) = send(&app, "GET", &format!("/api/polls/{code}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("device cookie issued");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let device = cookie
        .strip_prefix("deviceId=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string();
    assert_eq!(device.len(), 32);

    let (_, cookie, _) = send(&app, "GET", &format!("/api/polls/{code}"), Some(device.as_str()), None).await;
    assert!(cookie.is_none());

    // The issued id is the one votes are recorded under
    vote(&app, code, &device, json!([0])).await;
    let (_, _, view) = send(&app, "GET", &format!("/api/polls/{code}"), Some(device.as_str()), None).await;
    assert_eq!(view["data"]["userVote"], json!([0]));

    // Creation and results never set the cookie
    let (_, cookie, _) = send(&app, "POST", "/api/polls", None, Some(lunch())).await;
    assert!(cookie.is_none());
}

#[tokio::test]
async fn test_not_found() {
    let app = app();

    let (status, _, body) = send(&app, "GET", "/api/polls/Missing1", Some("d1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Poll not found");

    let (status, body) = vote(&app, "Missing1", "d1", json!([0])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _, _) = send(&app, "GET", "/api/polls/bad!/results", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&app, "GET", "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route /api/nowhere not found");
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = app();

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/polls",
        None,
        Some(json!({ "name": "ab", "question": "Why?", "answers": ["only"], "duration": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_FAILED");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    for field in ["name", "question", "answers", "duration"] {
        assert!(fields.contains(&field), "missing {field} in {fields:?}");
    }
    assert_eq!(app.storage.poll_count(), 0);

    let (status, _, body) = send(&app, "POST", "/api/polls", None, Some(json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MALFORMED_BODY");
}

#[tokio::test]
async fn test_default_duration_and_trimming() {
    let app = app();
    let poll = create_poll(
        &app,
        json!({ "name": "  Lunch  ", "question": "Where do we eat?", "answers": [" Pizza ", "Sushi"] }),
    )
    .await;

    assert_eq!(poll["name"], "Lunch");
    assert_eq!(poll["answers"], json!(["Pizza", "Sushi"]));

    let valid_till: chrono::DateTime<Utc> = serde_json::from_value(poll["validTill"].clone()).unwrap();
    let expires_at: chrono::DateTime<Utc> = serde_json::from_value(poll["expiresAt"].clone()).unwrap();
    assert_eq!(valid_till, app.clock.now() + Duration::hours(24));
    assert_eq!(expires_at, valid_till + Duration::hours(24));
}

#[tokio::test]
async fn test_multiple_choice_tally() {
    let app = app();
    let poll = create_poll(
        &app,
        json!({
            "name": "Toppings",
            "question": "Which toppings?",
            "answers": ["Cheese", "Olives", "Basil"],
            "multipleChoices": true
        }),
    )
    .await;
    let code = poll["code"].as_str().unwrap();

    assert_eq!(vote(&app, code, "a", json!([0, 2])).await.0, StatusCode::OK);
    assert_eq!(vote(&app, code, "b", json!([2])).await.0, StatusCode::OK);

    let (status, body) = vote(&app, code, "c", json!([1, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DUPLICATE_SELECTION");

    let (status, body) = vote(&app, code, "c", json!([3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_SELECTION");

    let (status, body) = vote(&app, code, "c", json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "EMPTY_SELECTION");

    let (_, _, results) = send(&app, "GET", &format!("/api/polls/{code}/results"), None, None).await;
    assert_eq!(results["data"]["voteCounts"], json!([1, 0, 2]));
    assert_eq!(results["data"]["totalVotes"], 2);
}

#[tokio::test]
async fn test_vote_is_broadcast_to_channel() {
    let app = app();
    let poll = create_poll(&app, lunch()).await;
    let code = poll["code"].as_str().unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let watcher = Subscriber::new(tx);
    app.state.broadcaster.subscribe(&channel_key(code), &watcher);

    let (other_tx, mut other_rx) = mpsc::channel(8);
    app.state
        .broadcaster
        .subscribe(&channel_key("Elsewhere"), &Subscriber::new(other_tx));

    vote(&app, code, "d1", json!([1])).await;

    match rx.try_recv().unwrap() {
        ChannelEvent::VoteUpdate(update) => {
            assert_eq!(update.code, code);
            assert_eq!(update.vote_counts, vec![0, 1]);
            assert_eq!(update.total_votes, 1);
            assert_eq!(update.selected, vec![1]);
            assert_eq!(update.device_id, "d1");
            assert_eq!(update.poll_id, poll["id"].as_str().unwrap());
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(other_rx.try_recv().is_err());

    // Rejected votes publish nothing
    vote(&app, code, "d1", json!([0])).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_from_one_device() {
    let app = Arc::new(app());
    let poll = create_poll(&app, lunch()).await;
    let code = poll["code"].as_str().unwrap().to_string();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            let code = code.clone();
            tokio::spawn(async move { vote(&app, &code, "same-device", json!([i % 2])).await })
        })
        .collect();

    let mut ok = 0;
    let mut already_voted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            (StatusCode::OK, _) => ok += 1,
            (StatusCode::BAD_REQUEST, body) => {
                assert_eq!(body["error"], "ALREADY_VOTED", "{body}");
                already_voted += 1;
            }
            (other, body) => panic!("unexpected status {other}: {body}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(already_voted, 15);
    assert_eq!(app.storage.vote_count(), 1);

    let (_, _, results) = send(&app, "GET", &format!("/api/polls/{code}/results"), None, None).await;
    assert_eq!(results["data"]["totalVotes"], 1);
}

#[tokio::test]
async fn test_root_status() {
    let app = app();
    let (status, _, body) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
}

#[tokio::test]
async fn test_security_headers_only_in_production() {
    let prod = app_with(Config {
        storage: StorageBackend::Memory,
        environment: Environment::Production,
        ..Config::default()
    });

    for uri in ["/", "/api/nowhere"] {
        let resp = prod
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(resp.headers().get(name).unwrap(), value, "{name} on {uri}");
        }
    }

    let dev = app();
    let resp = dev
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.headers().get("x-content-type-options").is_none());
}

#[tokio::test]
async fn test_production_device_cookie_is_secure() {
    let prod = app_with(Config {
        storage: StorageBackend::Memory,
        environment: Environment::Production,
        ..Config::default()
    });
    let poll = create_poll(&prod, lunch()).await;
    let code = poll["code"].as_str().unwrap();

    let (status, cookie, _) = send(&prod, "GET", &format!("/api/polls/{code}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("device cookie issued");
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=None"));
}
