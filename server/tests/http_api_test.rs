//! End-to-end HTTP tests over the in-memory backend.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use repair_desk_auth::AuthConfig;
use repair_desk_core::{QrError, TicketNumber};
use repair_desk_server::context::{memory_auth, HttpSettings};
use repair_desk_server::uploads::{ImageFuture, ImageStore, LocalImageStore};
use repair_desk_server::{build_router, AppContext};
use repair_desk_testing::fixtures::TestDesk;
use repair_desk_testing::mocks::{FailingQrPublisher, FixedQrPublisher, ScriptedSuffix};
use repair_desk_testing::test_clock;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

struct Harness {
    server: TestServer,
    ctx: AppContext,
    desk: TestDesk,
    dir: TempDir,
}

fn harness_with(desk: TestDesk) -> Harness {
    harness_with_images(desk, |dir| Arc::new(LocalImageStore::new(dir)))
}

fn harness_with_images(
    desk: TestDesk,
    images: impl FnOnce(PathBuf) -> Arc<dyn ImageStore>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let http = HttpSettings {
        public_dir: dir.path().join("public"),
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes: 1024 * 1024,
    };
    std::fs::create_dir_all(&http.public_dir).unwrap();
    std::fs::write(
        http.public_dir.join("checking_ticket_status.html"),
        "<h1>Status</h1>",
    )
    .unwrap();

    let auth = memory_auth(
        Arc::new(test_clock()),
        AuthConfig::default().with_hash_cost(4),
    );
    let images = images(http.upload_dir.clone());
    let ctx = AppContext::from_parts(desk.lifecycle.clone(), auth, images, http);
    let server = TestServer::new(build_router(ctx.clone())).unwrap();
    Harness {
        server,
        ctx,
        desk,
        dir,
    }
}

fn uploaded_files(dir: &Path) -> usize {
    std::fs::read_dir(dir.join("uploads"))
        .map(Iterator::count)
        .unwrap_or(0)
}

fn multipart_intake(contact: &str, first_name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("ticketType", "Repair")
        .add_text("contactNumber", contact)
        .add_text("firstName", first_name)
        .add_text("middleName", "Reyes")
        .add_text("lastName", "Lim")
}

fn png_part(name: &str) -> Part {
    Part::bytes(PNG.to_vec()).file_name(name).mime_type("image/png")
}

/// Stores through a local store but fails the nth write.
struct FailingNthImageStore {
    inner: LocalImageStore,
    calls: AtomicUsize,
    fail_at: usize,
}

impl ImageStore for FailingNthImageStore {
    fn store(&self, file_name: String, content_type: String, bytes: Vec<u8>) -> ImageFuture<'_> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_at {
            return Box::pin(async {
                Err(repair_desk_core::TicketError::Upstream {
                    service: "image store",
                    message: "disk full".into(),
                })
            });
        }
        self.inner.store(file_name, content_type, bytes)
    }

    fn remove(&self, reference: String) -> ImageFuture<'_, ()> {
        self.inner.remove(reference)
    }
}

fn harness() -> Harness {
    harness_with(
        TestDesk::builder()
            .suffixes(ScriptedSuffix::new(["AB12", "CD34", "EF56"]))
            .qr(FixedQrPublisher::new("https://cdn.test/qr"))
            .build(),
    )
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn intake(contact: &str) -> Value {
    json!({
        "ticketType": "Repair",
        "contactNumber": contact,
        "firstName": "Juan",
        "middleName": "Santos",
        "lastName": "Cruz",
        "unit": "ThinkPad T480",
        "problem": "No power"
    })
}

impl Harness {
    async fn token(&self, username: &str, role: Option<&str>) -> String {
        let mut body = json!({ "username": username, "password": "bench-pass-1" });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.server
            .post("/api/tech/signup")
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);

        let login: Value = self
            .server
            .post("/api/tech/login")
            .json(&json!({ "username": username, "password": "bench-pass-1" }))
            .await
            .json();
        login["token"].as_str().unwrap().to_string()
    }

    async fn open(&self, contact: &str) -> String {
        let response = self.server.post("/api/tickets").json(&intake(contact)).await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["ticket"]["ticketNumber"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_json_intake_returns_ticket_and_qr() {
    let h = harness();
    let response = h.server.post("/api/tickets").json(&intake("09175550101")).await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    let number = body["ticket"]["ticketNumber"].as_str().unwrap();
    assert_eq!(number, "TKT-20250101-300-AB12");
    assert_eq!(body["ticket"]["status"], "Pending");
    assert_eq!(body["ticket"]["ticketType"], "Repair");
    assert_eq!(
        body["checkUrl"].as_str().unwrap(),
        format!("http://localhost:5000/checking_ticket_status.html?ticket={number}")
    );
    assert_eq!(
        body["qrCodeUrl"].as_str().unwrap(),
        format!("https://cdn.test/qr/{number}.png")
    );
    assert!(body.get("qrError").is_none());

    let logs = body["ticket"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0]["text"].as_str().unwrap().starts_with("[SYSTEM] Ticket created"));
}

#[tokio::test]
async fn test_intake_rejects_unknown_ticket_type() {
    let h = harness();
    let mut body = intake("09175550101");
    body["ticketType"] = json!("Upgrade");

    let response = h.server.post("/api/tickets").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["code"], "INVALID_TICKET_TYPE");
    assert!(h.desk.customers.is_empty());
    assert!(h.desk.tickets.is_empty());
}

#[tokio::test]
async fn test_same_contact_reuses_customer() {
    let h = harness();
    let first = h.open("09175550101").await;
    let second = h.open("09175550101").await;

    assert_ne!(first, second);
    assert_eq!(h.desk.customers.len(), 1);
    assert_eq!(h.desk.tickets.len(), 2);
}

#[tokio::test]
async fn test_multipart_intake_stores_images() {
    let h = harness();
    let form = MultipartForm::new()
        .add_text("ticketType", "Free Checkup")
        .add_text("contactNumber", "09175550102")
        .add_text("firstName", "Ana")
        .add_text("middleName", "Reyes")
        .add_text("lastName", "Lim")
        .add_part(
            "images",
            Part::bytes(PNG.to_vec())
                .file_name("front panel.png")
                .mime_type("image/png"),
        );

    let response = h.server.post("/api/tickets").multipart(form).await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    let images = body["ticket"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    let reference = images[0].as_str().unwrap();
    assert!(reference.starts_with("/uploads/"));
    assert!(reference.ends_with("-front_panel.png"));
    assert_eq!(body["ticket"]["unit"], "Unknown Unit");
    assert_eq!(body["ticket"]["problem"], "Not specified");

    let file = reference.trim_start_matches("/uploads/");
    assert!(h.dir.path().join("uploads").join(file).exists());

    // Served back as a static file.
    h.server.get(reference).await.assert_status_ok();
}

#[tokio::test]
async fn test_multipart_rejects_non_image_upload() {
    let h = harness();
    let form = MultipartForm::new()
        .add_text("ticketType", "Repair")
        .add_text("contactNumber", "09175550103")
        .add_text("firstName", "Ana")
        .add_text("middleName", "Reyes")
        .add_text("lastName", "Lim")
        .add_part(
            "images",
            Part::bytes(b"#!/bin/sh".to_vec())
                .file_name("run.sh")
                .mime_type("text/x-shellscript"),
        );

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(h.desk.tickets.is_empty());
}

#[tokio::test]
async fn test_multipart_rejects_svg_upload() {
    let h = harness();
    let svg = b"<svg xmlns='http://www.w3.org/2000/svg'><script>alert(1)</script></svg>";
    let form = multipart_intake("09175550106", "Ana").add_part(
        "images",
        Part::bytes(svg.to_vec())
            .file_name("logo.svg")
            .mime_type("image/svg+xml"),
    );

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(h.desk.tickets.is_empty());
    assert_eq!(uploaded_files(h.dir.path()), 0);
}

#[tokio::test]
async fn test_multipart_blank_name_writes_no_files() {
    let h = harness();
    let form = multipart_intake("09175550107", "   ").add_part("images", png_part("a.png"));

    let response = h.server.post("/api/tickets").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert!(error["error"].as_str().unwrap().contains("firstName"));
    assert!(h.desk.tickets.is_empty());
    assert!(h.desk.customers.is_empty());
    assert_eq!(uploaded_files(h.dir.path()), 0);
}

#[tokio::test]
async fn test_multipart_blank_contact_writes_no_files() {
    let h = harness();
    let form = multipart_intake(" ", "Ana").add_part("images", png_part("a.png"));

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(h.desk.tickets.is_empty());
    assert_eq!(uploaded_files(h.dir.path()), 0);
}

#[tokio::test]
async fn test_multipart_failed_open_removes_stored_images() {
    let h = harness_with(
        TestDesk::builder()
            .qr(FailingQrPublisher(QrError::Transport("connection refused".into())))
            .build(),
    );
    let form = multipart_intake("09175550108", "Ana")
        .add_part("images", png_part("a.png"))
        .add_part("images", png_part("b.png"));

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert!(h.desk.tickets.is_empty());
    assert_eq!(uploaded_files(h.dir.path()), 0);
}

#[tokio::test]
async fn test_multipart_partial_write_failure_removes_earlier_images() {
    let h = harness_with_images(TestDesk::new(), |dir| {
        Arc::new(FailingNthImageStore {
            inner: LocalImageStore::new(dir),
            calls: AtomicUsize::new(0),
            fail_at: 3,
        })
    });
    let form = multipart_intake("09175550109", "Ana")
        .add_part("images", png_part("a.png"))
        .add_part("images", png_part("b.png"))
        .add_part("images", png_part("c.png"));

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert!(h.desk.tickets.is_empty());
    assert!(h.desk.customers.is_empty());
    assert_eq!(uploaded_files(h.dir.path()), 0);
}

#[tokio::test]
async fn test_multipart_rejects_more_than_five_images() {
    let h = harness();
    let mut form = MultipartForm::new()
        .add_text("ticketType", "Repair")
        .add_text("contactNumber", "09175550104")
        .add_text("firstName", "Ana")
        .add_text("middleName", "Reyes")
        .add_text("lastName", "Lim");
    for i in 0..6 {
        form = form.add_part(
            "images",
            Part::bytes(vec![1, 2, 3])
                .file_name(format!("{i}.jpg"))
                .mime_type("image/jpeg"),
        );
    }

    h.server
        .post("/api/tickets")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(!h.dir.path().join("uploads").exists());
}

#[tokio::test]
async fn test_qr_failure_rolls_back_with_502() {
    let h = harness_with(
        TestDesk::builder()
            .qr(FailingQrPublisher(QrError::Transport("connection refused".into())))
            .build(),
    );
    let response = h.server.post("/api/tickets").json(&intake("09175550105")).await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let error: Value = response.json();
    assert_eq!(error["code"], "UPSTREAM_ERROR");
    assert!(h.desk.tickets.is_empty());
}

#[tokio::test]
async fn test_internal_routes_require_token() {
    let h = harness();
    let number = h.open("09175550101").await;

    h.server
        .get("/api/tickets")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get(&format!("/api/tickets/{number}"))
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic bWFyaWE="))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .put(&format!("/api/tickets/{number}/status"))
        .add_header(AUTHORIZATION, bearer(&"z".repeat(43)))
        .json(&json!({ "status": "Ongoing" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let h = harness();
    let first = h.open("09175550101").await;
    let second = h.open("09175550102").await;
    let token = h.token("maria", None).await;

    let list: Value = h
        .server
        .get("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    let numbers: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["ticketNumber"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_status_change_logs_actor() {
    let h = harness();
    let number = h.open("09175550101").await;
    let token = h.token("maria", None).await;

    let response = h
        .server
        .put(&format!("/api/tickets/{number}/status"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "Ongoing", "unit": "ThinkPad T480s" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "Ongoing");
    assert_eq!(body["unit"], "ThinkPad T480s");
    assert_eq!(body["problem"], "No power");
    let last = body["logs"].as_array().unwrap().last().unwrap().clone();
    let text = last["text"].as_str().unwrap();
    assert!(text.starts_with("[SYSTEM] Ticket marked as ONGOING by maria"));

    let invalid = h
        .server
        .put(&format!("/api/tickets/{number}/status"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "Lost" }))
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = invalid.json();
    assert_eq!(error["code"], "INVALID_STATUS");

    h.server
        .put("/api/tickets/TKT-20250101-999-NOPE/status")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "Ongoing" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_append_and_delete_log() {
    let h = harness();
    let number = h.open("09175550101").await;
    let token = h.token("maria", None).await;

    let appended: Value = h
        .server
        .put(&format!("/api/tickets/{number}/log"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "log": "Replaced DC jack" }))
        .await
        .json();
    let logs = appended["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    let entry = logs.last().unwrap();
    assert_eq!(entry["text"], "Replaced DC jack");
    let log_id = entry["_id"].as_str().unwrap();

    h.server
        .delete(&format!("/api/tickets/{number}/logs/not-a-uuid"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let after: Value = h
        .server
        .delete(&format!("/api/tickets/{number}/logs/{log_id}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(after["logs"].as_array().unwrap().len(), 1);

    h.server
        .delete(&format!("/api/tickets/{number}/logs/{log_id}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_details_logs_diff_and_detects_conflict() {
    let h = harness();
    let number = h.open("09175550101").await;
    h.open("09175550199").await;
    let token = h.token("maria", None).await;

    let response = h
        .server
        .post(&format!("/api/tickets/update/{number}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "firstName": "John", "problem": "Cracked screen" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["customer"]["firstName"], "John");
    assert_eq!(body["customer"]["lastName"], "Cruz");
    assert_eq!(body["problem"], "Cracked screen");
    let last = body["logs"].as_array().unwrap().last().unwrap().clone();
    assert!(last["text"].as_str().unwrap().contains("Juan"));

    h.server
        .post(&format!("/api/tickets/update/{number}"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "contactNumber": "09175550199" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_public_view_is_redacted_and_aliased() {
    let h = harness();
    let number = h.open("09175550101").await;

    for path in [
        format!("/api/public/{number}"),
        format!("/api/tickets/public/{number}"),
    ] {
        let response = h.server.get(&path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["ticketNumber"], number.as_str());
        assert_eq!(body["customer"]["firstName"], "Juan");
        assert_eq!(body["customer"]["suffix"], "");
        assert!(body["customer"].get("contactNumber").is_none());
        assert!(body.get("contactNumber").is_none());
    }

    h.server
        .get("/api/public/TKT-20250101-999-NOPE")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_requires_admin_or_tech() {
    let h = harness();
    let number = h.open("09175550101").await;
    let staff = h.token("front", Some("staff")).await;
    let tech = h.token("maria", None).await;

    h.server
        .delete(&format!("/api/tickets/{number}"))
        .add_header(AUTHORIZATION, bearer(&staff))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    assert_eq!(h.desk.tickets.len(), 1);

    h.server
        .delete(&format!("/api/tickets/{number}"))
        .add_header(AUTHORIZATION, bearer(&tech))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(h.desk.tickets.is_empty());
    assert!(h.desk.tickets.raw(&TicketNumber::new(number.clone())).is_none());

    h.server
        .get(&format!("/api/public/{number}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_login_logout() {
    let h = harness();
    h.server
        .post("/api/tech/signup")
        .json(&json!({ "username": "boss", "password": "bench-pass-1", "role": "admin" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let token = h.token("maria", None).await;
    h.server
        .post("/api/tech/signup")
        .json(&json!({ "username": "maria", "password": "other-pass-1" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    h.server
        .post("/api/tech/login")
        .json(&json!({ "username": "maria", "password": "wrong-pass" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    h.server
        .post("/api/tech/logout")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    h.server
        .get("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_returns_expiry() {
    let h = harness();
    let _ = h.token("maria", None).await;
    let login: Value = h
        .server
        .post("/api/tech/login")
        .json(&json!({ "username": "maria", "password": "bench-pass-1" }))
        .await
        .json();
    assert_eq!(login["expiresAt"], "2025-01-01T08:00:00Z");
    assert_eq!(login["role"], "tech");
}

#[tokio::test]
async fn test_every_response_carries_headers() {
    let h = harness();
    for response in [
        h.server.get("/health").await,
        h.server.get("/api/public/TKT-NOPE").await,
        h.server.get("/checking_ticket_status.html").await,
    ] {
        let headers = response.headers();
        assert!(headers.contains_key("x-correlation-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["referrer-policy"], "no-referrer");
    }
}

#[tokio::test]
async fn test_static_fallback_and_disabled_metrics() {
    let h = harness();
    let page = h.server.get("/checking_ticket_status.html").await;
    page.assert_status_ok();
    page.assert_text("<h1>Status</h1>");

    h.server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server.get("/ready").await.assert_status_ok();

    h.desk.tickets.set_available(false);
    h.server
        .get("/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    h.ctx.shutdown().await;
}
