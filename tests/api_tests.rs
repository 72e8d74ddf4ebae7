mod common;

use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{spawn_app, spawn_app_with, TestOptions, API_KEY, SECRET_KEY, TEST_RSA_KEY};
use searchping::models::{Engine, QueueStatus};

// ── Health & auth ───────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn api_rejects_missing_or_wrong_token() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/api/v1/queue"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .client
        .get(app.url("/api/v1/queue"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Enqueue & read path ─────────────────────────────────────────

#[tokio::test]
async fn enqueue_and_list_roundtrip() {
    let app = spawn_app().await;

    let (body, status) = app
        .post_auth(
            "/api/v1/queue",
            &json!({ "url": "https://ex.com/a", "engines": ["bing"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "enqueue failed: {body}");
    assert!(body["id"].as_i64().unwrap() > 0);

    let (body, status) = app.get_auth("/api/v1/queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let item = &body["items"][0];
    assert_eq!(item["url"], "https://ex.com/a");
    assert_eq!(item["status"], "pending");
    assert_eq!(item["action"], "updated");
    assert_eq!(item["engines"], json!(["bing"]));
}

#[tokio::test]
async fn enqueue_rejects_invalid_url() {
    let app = spawn_app().await;

    let (_, status) = app
        .post_auth("/api/v1/queue", &json!({ "url": "not a url" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .post_auth("/api/v1/queue", &json!({ "url": "ftp://ex.com/file" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_validates_dedupes_and_applies_exclusions() {
    let app = spawn_app().await;

    let (_, status) = app
        .put_auth(
            "/api/v1/settings",
            &json!({ "exclude_urls": ["https://ex.com/skip"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post_auth(
            "/api/v1/queue/bulk",
            &json!({
                "urls": [
                    "https://ex.com/1",
                    "https://ex.com/1",
                    "  https://ex.com/2  ",
                    "not a url",
                    "https://ex.com/skip",
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "bulk failed: {body}");
    assert_eq!(body["queued"], 2);
    assert_eq!(app.queue_total().await, 2);
}

#[tokio::test]
async fn bulk_rejects_empty_input() {
    let app = spawn_app().await;

    let (_, status) = app
        .post_auth("/api/v1/queue/bulk", &json!({ "urls": ["nope", ""] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let app = spawn_app().await;

    for (url, engine, status) in [
        ("https://ex.com/1", Engine::Bing, QueueStatus::Done),
        ("https://ex.com/2", Engine::Bing, QueueStatus::Failed),
        ("https://ex.com/3", Engine::Google, QueueStatus::Done),
    ] {
        searchping::db::queue::record_outcome(
            &app.pool,
            0,
            url,
            searchping::models::Action::Updated,
            &searchping::db::queue::Outcome {
                engine,
                http_code: 200,
                response: "",
                status,
            },
        )
        .await
        .unwrap();
    }

    let (body, _) = app.get_auth("/api/v1/queue?status=done").await;
    assert_eq!(body["total"], 2);

    let (body, _) = app.get_auth("/api/v1/queue?status=done&engine=google").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["url"], "https://ex.com/3");

    let (body, _) = app
        .get_auth("/api/v1/queue?per_page=2&page=2&orderby=id&order=asc")
        .await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["url"], "https://ex.com/3");
}

#[tokio::test]
async fn clear_empties_the_queue() {
    let app = spawn_app().await;

    app.post_auth("/api/v1/queue", &json!({ "url": "https://ex.com/a" }))
        .await;
    let (body, status) = app.delete_auth("/api/v1/queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
    assert_eq!(app.queue_total().await, 0);
}

#[tokio::test]
async fn export_returns_csv_with_fixed_columns() {
    let app = spawn_app().await;

    app.post_auth("/api/v1/queue", &json!({ "url": "https://ex.com/a" }))
        .await;

    let resp = app
        .client
        .get(app.url("/api/v1/queue/export"))
        .bearer_auth(common::ADMIN_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("attachment"));

    let text = resp.text().await.unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "ID,URL,Action,Engine,Status,HTTP Code,Response,Attempts,Created,Processed"
    );
    assert!(lines.next().unwrap().contains("https://ex.com/a"));
}

// ── Settings ────────────────────────────────────────────────────

#[tokio::test]
async fn settings_have_sensible_defaults() {
    let app = spawn_app().await;

    let (body, status) = app.get_auth("/api/v1/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batch_size"], 100);
    assert_eq!(body["auto_submit"], true);
    assert_eq!(body["content_types"], json!(["post", "page"]));
    assert_eq!(body["google_credentials_configured"], false);
}

#[tokio::test]
async fn settings_update_clamps_batch_size() {
    let app = spawn_app().await;

    let (body, _) = app
        .put_auth("/api/v1/settings", &json!({ "batch_size": 500 }))
        .await;
    assert_eq!(body["batch_size"], 100);

    let (body, _) = app
        .put_auth("/api/v1/settings", &json!({ "batch_size": 0 }))
        .await;
    assert_eq!(body["batch_size"], 1);
}

#[tokio::test]
async fn settings_roundtrip_filters() {
    let app = spawn_app().await;

    let (body, status) = app
        .put_auth(
            "/api/v1/settings",
            &json!({
                "auto_submit": false,
                "content_types": ["post"],
                "exclude_urls": ["https://ex.com/private"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["auto_submit"], false);
    assert_eq!(body["content_types"], json!(["post"]));
    assert_eq!(body["exclude_urls"], json!(["https://ex.com/private"]));
}

#[tokio::test]
async fn settings_reject_invalid_credentials_json() {
    let app = spawn_app().await;

    let (body, status) = app
        .put_auth(
            "/api/v1/settings",
            &json!({ "google_credentials": "not json" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not valid JSON"));

    let (body, _) = app.get_auth("/api/v1/settings").await;
    assert_eq!(body["google_credentials_configured"], false);
}

#[tokio::test]
async fn settings_encrypt_credentials_at_rest() {
    let app = spawn_app().await;

    let raw = json!({ "client_email": "a@b.c", "private_key": "pk" }).to_string();
    let (body, status) = app
        .put_auth("/api/v1/settings", &json!({ "google_credentials": raw }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["google_credentials_configured"], true);
    // The blob itself is never echoed back.
    assert!(body.get("google_credentials").is_none());

    let stored = searchping::db::settings::get(&app.pool, "google_credentials")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored, raw);
    assert!(!stored.contains("client_email"));
    assert_eq!(searchping::crypto::decrypt(&stored, SECRET_KEY).unwrap(), raw);
}

#[tokio::test]
async fn settings_clear_credentials_with_empty_string() {
    let app = spawn_app().await;
    app.set_google_credentials("pk").await;

    let (body, _) = app
        .put_auth("/api/v1/settings", &json!({ "google_credentials": "" }))
        .await;
    assert_eq!(body["google_credentials_configured"], false);
}

// ── Key verification file ───────────────────────────────────────

#[tokio::test]
async fn key_verification_file_is_served_as_plain_text() {
    let app = spawn_app().await;
    app.set_api_key().await;

    let resp = app
        .client
        .get(app.url(&format!("/{API_KEY}.txt")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/plain"
    );
    assert_eq!(resp.headers().get("x-robots-tag").unwrap(), "noindex");
    assert_eq!(resp.text().await.unwrap(), API_KEY);
}

#[tokio::test]
async fn other_filenames_are_not_found() {
    let app = spawn_app().await;
    app.set_api_key().await;

    let resp = app
        .client
        .get(app.url("/other.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Content-change events ───────────────────────────────────────

#[tokio::test]
async fn updated_event_queues_both_engines() {
    let app = spawn_app().await;

    let (body, status) = app
        .post_auth(
            "/api/v1/events",
            &json!({ "url": "https://ex.com/post-1", "kind": "updated", "content_type": "post" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "event rejected: {body}");

    app.wait_for_queue_total(1).await;
    let (body, _) = app.get_auth("/api/v1/queue").await;
    let item = &body["items"][0];
    assert_eq!(item["action"], "updated");
    assert_eq!(item["engines"], json!(["bing", "google"]));
}

#[tokio::test]
async fn deleted_event_queues_google_only() {
    let app = spawn_app().await;

    app.post_auth(
        "/api/v1/events",
        &json!({ "url": "https://ex.com/post-1", "kind": "deleted", "content_type": "page" }),
    )
    .await;

    app.wait_for_queue_total(1).await;
    let (body, _) = app.get_auth("/api/v1/queue").await;
    let item = &body["items"][0];
    assert_eq!(item["action"], "deleted");
    assert_eq!(item["engines"], json!(["google"]));
}

#[tokio::test]
async fn events_respect_auto_submit_toggle() {
    let app = spawn_app().await;
    app.put_auth("/api/v1/settings", &json!({ "auto_submit": false }))
        .await;

    app.post_auth(
        "/api/v1/events",
        &json!({ "url": "https://ex.com/post-1", "kind": "updated", "content_type": "post" }),
    )
    .await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(app.queue_total().await, 0);
}

#[tokio::test]
async fn events_filter_content_type_and_exclusions() {
    let app = spawn_app().await;
    app.put_auth(
        "/api/v1/settings",
        &json!({ "exclude_urls": ["https://ex.com/excluded"] }),
    )
    .await;

    // Content type not in the enabled set.
    app.post_auth(
        "/api/v1/events",
        &json!({ "url": "https://ex.com/p", "kind": "updated", "content_type": "product" }),
    )
    .await;
    // Excluded URL.
    app.post_auth(
        "/api/v1/events",
        &json!({ "url": "https://ex.com/excluded", "kind": "updated", "content_type": "post" }),
    )
    .await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(app.queue_total().await, 0);
}

// ── Immediate submission ────────────────────────────────────────

#[tokio::test]
async fn immediate_submit_hits_both_engines_and_records_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexnow"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let app = spawn_app_with(TestOptions {
        indexnow_endpoint: Some(format!("{}/indexnow", server.uri())),
        google_token_url: Some(format!("{}/token", server.uri())),
        google_indexing_url: Some(format!("{}/publish", server.uri())),
    })
    .await;
    app.set_api_key().await;
    app.set_google_credentials(TEST_RSA_KEY).await;

    let (body, status) = app
        .post_auth(
            "/api/v1/submit",
            &json!({ "urls": ["https://ex.com/1", "https://ex.com/2"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");

    let results = body["results"].as_array().unwrap();
    // Two URLs times two engines.
    assert_eq!(results.len(), 4);
    for result in results {
        assert_eq!(result["status"], "done");
        assert_eq!(result["http_code"], 200);
        assert!(result["timestamp"].is_string());
    }

    // Each result lands as a historical row.
    let (body, _) = app.get_auth("/api/v1/queue?status=done").await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["items"][0]["attempts"], 1);
}

#[tokio::test]
async fn immediate_submit_dedupes_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexnow"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = spawn_app_with(TestOptions {
        indexnow_endpoint: Some(format!("{}/indexnow", server.uri())),
        ..TestOptions::default()
    })
    .await;
    app.set_api_key().await;

    let (body, status) = app
        .post_auth(
            "/api/v1/submit",
            &json!({
                "urls": ["https://ex.com/1", "https://ex.com/1"],
                "engines": ["bing"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let received = server.received_requests().await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(payload["urlList"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn immediate_submit_rejects_invalid_input() {
    let app = spawn_app().await;

    let (_, status) = app
        .post_auth("/api/v1/submit", &json!({ "urls": ["nope"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Manual dispatch trigger ─────────────────────────────────────

#[tokio::test]
async fn dispatch_endpoint_runs_a_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexnow"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = spawn_app_with(TestOptions {
        indexnow_endpoint: Some(format!("{}/indexnow", server.uri())),
        ..TestOptions::default()
    })
    .await;
    app.set_api_key().await;
    app.post_auth("/api/v1/queue", &json!({ "url": "https://ex.com/a", "engines": ["bing"] }))
        .await;

    let (body, status) = app.post_auth("/api/v1/dispatch", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fetched"], 1);
    assert_eq!(body["submitted_bing"], 1);

    let (body, _) = app.get_auth("/api/v1/queue?status=done").await;
    assert_eq!(body["total"], 1);
}
