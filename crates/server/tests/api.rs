use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use deployment::{Deployment, PrintShopDeployment};
use secrecy::SecretString;
use serde_json::{Value, json};
use services::services::{
    config::Config,
    mail_api::{MailApiError, MailSender, OutgoingEmail},
};
use tempfile::TempDir;
use tower::ServiceExt;

const WORKER_SECRET: &str = "worker-secret";

struct TestApp {
    router: Router,
    deployment: PrintShopDeployment,
    _dir: TempDir,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.admin_password = Some(SecretString::from("letmein".to_string()));
    config.worker_secret = Some(SecretString::from(WORKER_SECRET.to_string()));
    config.mail.send_delay_ms = 0;
    config.mail.admin_notification_email = Some("owner@shop.test".to_string());
    config
}

async fn spawn_with(config: Config, mailer: Option<Arc<dyn MailSender>>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut deployment = PrintShopDeployment::new_at_path(&dir.path().join("shop.db"), config)
        .await
        .unwrap();
    if let Some(mailer) = mailer {
        deployment = deployment.with_mailer(mailer);
    }
    TestApp {
        router: server::app(deployment.clone()),
        deployment,
        _dir: dir,
    }
}

async fn spawn() -> TestApp {
    spawn_with(test_config(), None).await
}

/// Send a request with the admin cookie and decode the JSON envelope.
async fn api(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(router, method, uri, body, &[(header::COOKIE.as_str(), "admin-auth=true")]).await
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_party(router: &Router, name: &str) -> String {
    let (status, body) = api(router, "POST", "/parties", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn post_transaction(router: &Router, party_id: &str, kind: &str, amount: f64) -> Value {
    let (status, body) = api(
        router,
        "POST",
        "/parties/transactions",
        Some(json!({ "party_id": party_id, "type": kind, "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"].clone()
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailApiError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[tokio::test]
async fn payment_on_existing_balance_is_reflected_on_party() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Sunrise Traders").await;

    let first = post_transaction(&app.router, &party_id, "payment", 1000.0).await;
    assert_eq!(first["balance_after"], 1000.0);

    let second = post_transaction(&app.router, &party_id, "payment", 500.0).await;
    assert_eq!(second["balance_after"], 1500.0);
    assert_eq!(second["type"], "payment");
    assert_eq!(second["created_by"], "Admin");

    let (status, body) = api(&app.router, "GET", &format!("/parties/{party_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 1500.0);
}

#[tokio::test]
async fn order_then_soft_delete_restores_balance() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Blue Ink").await;
    let order = post_transaction(&app.router, &party_id, "order", 300.0).await;
    assert_eq!(order["balance_after"], -300.0);

    let uri = format!("/transactions/{}/soft-delete", order["id"].as_str().unwrap());
    let reason = json!({ "deletion_reason": "entered twice" });
    let (status, body) = api(&app.router, "PATCH", &uri, Some(reason.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_deleted"], true);

    // Second delete is refused and leaves the balance alone.
    let (status, body) = api(&app.router, "PATCH", &uri, Some(reason)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = api(&app.router, "GET", &format!("/parties/{party_id}"), None).await;
    assert_eq!(body["data"]["balance"], 0.0);
}

#[tokio::test]
async fn soft_delete_requires_a_reason() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Reasonless").await;
    let payment = post_transaction(&app.router, &party_id, "payment", 50.0).await;

    let uri = format!("/transactions/{}/soft-delete", payment["id"].as_str().unwrap());
    let (status, _) = api(&app.router, "PATCH", &uri, Some(json!({ "deletion_reason": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn machine_without_color_capacity_is_rejected() {
    let app = spawn().await;
    let (status, body) = api(&app.router, "POST", "/machines", Some(json!({ "name": "Heidelberg SM52" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = api(&app.router, "GET", "/machines", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn duplicate_machine_names_are_rejected() {
    let app = spawn().await;
    let machine = json!({ "name": "Komori", "color_capacity": 4 });
    let (status, _) = api(&app.router, "POST", "/machines", Some(machine)).await;
    assert_eq!(status, StatusCode::OK);

    let duplicate = json!({ "name": "komori", "color_capacity": 2 });
    let (status, _) = api(&app.router, "POST", "/machines", Some(duplicate)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = api(&app.router, "GET", "/machines", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_routes_require_cookie() {
    let app = spawn().await;
    let (status, body) = send(&app.router, "GET", "/parties", None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    // Operator and public routes stay open.
    let (status, _) = send(&app.router, "GET", "/health", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_login_sets_cookie() {
    let app = spawn().await;
    let login = |password: &'static str| {
        Request::builder()
            .method("POST")
            .uri("/auth/admin-login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "password": password }).to_string()))
            .unwrap()
    };

    let response = app.router.clone().oneshot(login("wrong")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.router.clone().oneshot(login("letmein")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("admin-auth=true"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn public_quotations_are_rate_limited() {
    let app = spawn().await;
    let quote = json!({
        "customer_name": "Asha",
        "customer_email": "asha@example.com",
        "job_description": "500 flyers"
    });
    let client = [("x-forwarded-for", "203.0.113.7")];

    for _ in 0..5 {
        let (status, body) = send(&app.router, "POST", "/quotations", Some(quote.clone()), &client).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (status, _) = send(&app.router, "POST", "/quotations", Some(quote.clone()), &client).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different address has its own window.
    let other = [("x-forwarded-for", "198.51.100.2")];
    let (status, _) = send(&app.router, "POST", "/quotations", Some(quote), &other).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn email_worker_requires_bearer_secret() {
    let app = spawn().await;
    let (status, _) = send(&app.router, "POST", "/email-worker", None, &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = [(header::AUTHORIZATION.as_str(), "Bearer nope")];
    let (status, _) = send(&app.router, "POST", "/email-worker", None, &wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct secret but no mail key configured.
    let auth = format!("Bearer {WORKER_SECRET}");
    let right = [(header::AUTHORIZATION.as_str(), auth.as_str())];
    let (status, _) = send(&app.router, "POST", "/email-worker", None, &right).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn email_worker_drains_queued_quotation_alert() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = spawn_with(test_config(), Some(mailer.clone())).await;

    let quote = json!({
        "customer_name": "Ravi",
        "customer_phone": "+91 98450 00000",
        "job_description": "Wedding cards"
    });
    let (status, _) = send(&app.router, "POST", "/quotations", Some(quote), &[]).await;
    assert_eq!(status, StatusCode::OK);

    let auth = format!("Bearer {WORKER_SECRET}");
    let headers = [(header::AUTHORIZATION.as_str(), auth.as_str())];
    let (status, body) = send(&app.router, "POST", "/email-worker", None, &headers).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!({ "processed": 1, "sent": 1, "failed": 0 }));

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "owner@shop.test");

    // Nothing left on a second run.
    drop(sent);
    let (_, body) = send(&app.router, "POST", "/email-worker", None, &headers).await;
    assert_eq!(body["data"]["processed"], 0);
}

#[tokio::test]
async fn operator_moves_assigned_job_through_its_lifecycle() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Lotus Press").await;

    let (_, machine) = api(
        &app.router,
        "POST",
        "/machines",
        Some(json!({ "name": "Ryobi 524", "color_capacity": 2 })),
    )
    .await;
    let machine_id = machine["data"]["id"].as_str().unwrap().to_string();

    let (status, job) = api(
        &app.router,
        "POST",
        "/job-sheets",
        Some(json!({ "party_id": party_id, "description": "Letterheads", "printing": 1200.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{job}");
    let job_id = job["data"]["id"].as_str().unwrap().to_string();

    // Creating the sheet charged the party.
    let (_, party) = api(&app.router, "GET", &format!("/parties/{party_id}"), None).await;
    assert_eq!(party["data"]["balance"], -1200.0);

    let (status, assigned) = api(
        &app.router,
        "POST",
        &format!("/job-sheets/{job_id}/assign"),
        Some(json!({ "machine_id": machine_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{assigned}");
    assert_eq!(assigned["data"]["job_status"], "assigned");

    let (status, queue) = send(&app.router, "GET", &format!("/jobs?machine_id={machine_id}"), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app.router, "GET", "/jobs", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The operator must say which machine they are on.
    let (status, body) = send(
        &app.router,
        "PUT",
        "/jobs",
        Some(json!({ "job_id": job_id, "status": "in_progress" })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "machine_id is required");

    // Skipping straight to completed is not allowed.
    let update = |status: &str| {
        json!({ "job_id": job_id, "machine_id": machine_id, "status": status })
    };
    let (status, _) = send(&app.router, "PUT", "/jobs", Some(update("completed")), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, "PUT", "/jobs", Some(update("in_progress")), &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["started_at"].is_string());

    let (status, body) = send(&app.router, "PUT", "/jobs", Some(update("completed")), &[]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["job_status"], "completed");

    let (status, feed) = send(
        &app.router,
        "GET",
        &format!("/notifications?machine_id={machine_id}&unread_only=true"),
        None,
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(feed["data"]["unread_count"].as_i64().unwrap() >= 1);

    let (status, body) = send(
        &app.router,
        "PATCH",
        "/notifications",
        Some(json!({ "machine_id": machine_id })),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["updated"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn party_with_ledger_rows_cannot_be_deleted() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Keepers").await;
    post_transaction(&app.router, &party_id, "payment", 10.0).await;

    let (status, _) = api(&app.router, "DELETE", &format!("/parties/{party_id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let empty = create_party(&app.router, "Empty").await;
    let (status, _) = api(&app.router, "DELETE", &format!("/parties/{empty}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = spawn().await;
    let request = Request::builder()
        .method("POST")
        .uri("/parties")
        .header(header::COOKIE, "admin-auth=true")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn dashboard_reports_receivables() {
    let app = spawn().await;
    let party_id = create_party(&app.router, "Debtor").await;
    post_transaction(&app.router, &party_id, "order", 700.0).await;

    let (status, body) = api(&app.router, "GET", "/dashboard/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_parties"], 1);
    assert_eq!(body["data"]["total_receivable"], 700.0);
    assert_eq!(app.deployment.config().low_stock_threshold, 500);
}
