//! End-to-end tests for the HTTP API over in-memory stores

use std::str::FromStr;
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;

use infra_external::RecordingEmailSender;
use interface_api::{config::ApiConfig, create_router, handlers::payment::SIGNATURE_HEADER, AppState};
use test_utils::{GatewayFixtures, StringFixtures, TestHarness};

struct TestApp {
    server: TestServer,
    harness: TestHarness,
    email: RecordingEmailSender,
    _photos: TempDir,
}

fn app() -> TestApp {
    let photos = TempDir::new().unwrap();
    let harness = TestHarness::new();
    let email = RecordingEmailSender::new();

    let config = ApiConfig {
        jwt_secret: "test-secret".to_string(),
        frontend_url: "https://app.meterproof.test".to_string(),
        photo_dir: photos.path().display().to_string(),
        email_from: Some("noreply@meterproof.test".to_string()),
        ..ApiConfig::default()
    };

    let state = AppState {
        config,
        accounts: Arc::new(harness.accounts()),
        tenancy: Arc::new(harness.tenancy()),
        billing: harness.billing.clone(),
        email: Arc::new(email.clone()),
        health: harness.health_checks(),
    };

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        harness,
        email,
        _photos: photos,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

fn bill_form(month: &str, reading: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("month", month)
        .add_text("currentReading", reading)
        .add_part(
            "currentPhoto",
            Part::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                .file_name("meter.jpg")
                .mime_type("image/jpeg"),
        )
}

impl TestApp {
    /// Registers the fixture owner and returns the session token
    async fn register(&self) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "name": StringFixtures::owner_name(),
                "mobile": StringFixtures::owner_mobile(),
                "email": StringFixtures::owner_email(),
                "password": StringFixtures::owner_password(),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    /// Registers, sets a UPI id and a tenant at `rate`
    async fn owner_with_tenant(&self, rate: &str) -> String {
        let token = self.register().await;
        self.server
            .put("/api/auth/upi")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "upi_id": StringFixtures::upi_id() }))
            .await
            .assert_status_ok();
        self.server
            .post("/api/tenant")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "name": StringFixtures::tenant_name(),
                "mobile": StringFixtures::tenant_mobile(),
                "unit_rate": rate,
            }))
            .await
            .assert_status(StatusCode::CREATED);
        token
    }

    async fn create_bill(&self, token: &str, month: &str, reading: &str) -> Value {
        let response = self
            .server
            .post("/api/bill")
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(bill_form(month, reading))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_register_login_and_profile() {
        let app = app();
        app.register().await;

        let login = app
            .server
            .post("/api/auth/login")
            .json(&json!({
                "email": "ASHA@example.com",
                "password": StringFixtures::owner_password(),
            }))
            .await;
        login.assert_status_ok();
        let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

        let me = app.server.get("/api/auth").add_header(AUTHORIZATION, bearer(&token)).await;
        me.assert_status_ok();
        let profile = me.json::<Value>();
        assert_eq!(profile["email"], StringFixtures::owner_email());
        assert_eq!(profile["email_verified"], false);
        assert!(profile.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = app();
        app.register().await;

        let response = app
            .server
            .post("/api/auth/register")
            .json(&json!({
                "name": "Someone Else",
                "mobile": "9000000000",
                "email": StringFixtures::owner_email(),
                "password": "another-pass",
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = app();
        app.register().await;

        let response = app
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": StringFixtures::owner_email(), "password": "nope-nope" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verification_email_link_verifies() {
        let app = app();
        app.register().await;

        let sent = app.email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, StringFixtures::owner_email());

        let start = sent[0].html.find("/verify-email/").unwrap() + "/verify-email/".len();
        let token: String = sent[0].html[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        let response = app.server.get(&format!("/api/auth/verify-email/{token}")).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["email_verified"], true);

        app.server
            .get(&format!("/api/auth/verify-email/{token}"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_owner_routes_require_token() {
        let app = app();

        app.server.get("/api/auth").await.assert_status(StatusCode::UNAUTHORIZED);
        app.server
            .get("/api/bill")
            .add_header(AUTHORIZATION, bearer("not-a-jwt"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_header_is_accepted() {
        let app = app();
        let token = app.register().await;

        app.server
            .get("/api/auth")
            .add_header(HeaderName::from_static("x-auth-token"), HeaderValue::from_str(&token).unwrap())
            .await
            .assert_status_ok();
    }
}

mod tenants {
    use super::*;

    #[tokio::test]
    async fn test_second_tenant_conflicts() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;

        let response = app
            .server
            .post("/api/tenant")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "name": "Other", "unit_rate": "9" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_rate() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;

        let response = app
            .server
            .put("/api/tenant")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "unit_rate": "9.25" }))
            .await;
        response.assert_status_ok();
        assert_eq!(decimal(&response.json::<Value>()["unit_rate"]), dec!(9.25));
    }
}

mod bills {
    use super::*;

    #[tokio::test]
    async fn test_create_bill_from_multipart() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;

        let bill = app.create_bill(&token, "2024-03", "120").await;
        assert_eq!(decimal(&bill["previous_reading"]), Decimal::ZERO);
        assert_eq!(decimal(&bill["units"]), dec!(120));
        assert_eq!(decimal(&bill["amount"]), dec!(1020));
        assert_eq!(bill["status"], "UNPAID");
        assert_eq!(bill["payment"]["status"], "PENDING");
        assert_eq!(app.harness.photos.stored(), 1);

        let second = app.create_bill(&token, "2024-04", "150.5").await;
        assert_eq!(decimal(&second["previous_reading"]), dec!(120));
        assert_eq!(decimal(&second["units"]), dec!(30.5));

        let last = app
            .server
            .get("/api/bill/last")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        assert_eq!(last.json::<Value>()["id"], second["id"]);

        let list = app.server.get("/api/bill").add_header(AUTHORIZATION, bearer(&token)).await;
        assert_eq!(list.json::<Vec<Value>>().len(), 2);
    }

    #[tokio::test]
    async fn test_bill_rejections() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;
        app.create_bill(&token, "2024-03", "120").await;

        // same month
        app.server
            .post("/api/bill")
            .add_header(AUTHORIZATION, bearer(&token))
            .multipart(bill_form("2024-03", "130"))
            .await
            .assert_status(StatusCode::CONFLICT);

        // reading going backwards
        app.server
            .post("/api/bill")
            .add_header(AUTHORIZATION, bearer(&token))
            .multipart(bill_form("2024-04", "100"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // no photo
        app.server
            .post("/api/bill")
            .add_header(AUTHORIZATION, bearer(&token))
            .multipart(
                MultipartForm::new()
                    .add_text("month", "2024-04")
                    .add_text("currentReading", "140"),
            )
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(app.harness.bills.len().await, 1);
    }

    #[tokio::test]
    async fn test_bill_needs_tenant() {
        let app = app();
        let token = app.register().await;

        app.server
            .post("/api/bill")
            .add_header(AUTHORIZATION, bearer(&token))
            .multipart(bill_form("2024-03", "120"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_public_view_has_upi_link_until_paid() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;
        let bill = app.create_bill(&token, "2024-03", "120").await;
        let id = bill["id"].as_str().unwrap();

        let view = app.server.get(&format!("/api/bill/{id}")).await;
        view.assert_status_ok();
        let view = view.json::<Value>();
        let link = view["upi_link"].as_str().unwrap();
        assert!(link.starts_with("upi://pay?"));
        assert!(link.contains("am=1020.00"));
        assert_eq!(view["owner"]["name"], StringFixtures::owner_name());
        assert_eq!(view["tenant"]["name"], StringFixtures::tenant_name());

        app.server
            .put(&format!("/api/bill/{id}/owner-confirm"))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .assert_status_ok();

        let paid = app.server.get(&format!("/api/bill/{id}")).await.json::<Value>();
        assert_eq!(paid["status"], "PAID");
        assert!(paid["upi_link"].is_null());
    }

    #[tokio::test]
    async fn test_manual_payment_flow() {
        let app = app();
        let token = app.owner_with_tenant("10").await;
        let bill = app.create_bill(&token, "2024-03", "50").await;
        let id = bill["id"].as_str().unwrap();

        let claimed = app.server.post(&format!("/api/bill/{id}/tenant-confirm")).await;
        claimed.assert_status_ok();
        let claimed = claimed.json::<Value>();
        assert_eq!(claimed["status"], "UNPAID");
        assert_eq!(claimed["payment"]["status"], "TENANT_CONFIRMED");

        let confirmed = app
            .server
            .put(&format!("/api/bill/{id}/owner-confirm"))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "referenceId": "UTR123" }))
            .await;
        confirmed.assert_status_ok();
        let confirmed = confirmed.json::<Value>();
        assert_eq!(confirmed["status"], "PAID");
        assert_eq!(confirmed["payment"]["manual"]["reference_id"], "UTR123");

        app.server
            .post(&format!("/api/bill/{id}/tenant-confirm"))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_toggle_status() {
        let app = app();
        let token = app.owner_with_tenant("10").await;
        let bill = app.create_bill(&token, "2024-03", "50").await;
        let id = bill["id"].as_str().unwrap();

        let paid = app
            .server
            .put(&format!("/api/bill/{id}/status"))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        paid.assert_status_ok();
        assert_eq!(paid.json::<Value>()["status"], "PAID");

        let unpaid = app
            .server
            .put(&format!("/api/bill/{id}/status"))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        assert_eq!(unpaid.json::<Value>()["status"], "UNPAID");
    }

    #[tokio::test]
    async fn test_other_owner_cannot_toggle() {
        let app = app();
        let token = app.owner_with_tenant("10").await;
        let bill = app.create_bill(&token, "2024-03", "50").await;
        let id = bill["id"].as_str().unwrap();

        let intruder = app
            .server
            .post("/api/auth/register")
            .json(&json!({
                "name": "Intruder",
                "mobile": "9000000009",
                "email": "intruder@example.com",
                "password": "secret123",
            }))
            .await
            .json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string();

        app.server
            .put(&format!("/api/bill/{id}/status"))
            .add_header(AUTHORIZATION, bearer(&intruder))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_statement_download() {
        let app = app();
        let token = app.owner_with_tenant("10").await;
        let bill = app.create_bill(&token, "2024-03", "50").await;
        let id = bill["id"].as_str().unwrap();

        let response = app.server.get(&format!("/api/bill/{id}/statement")).await;
        response.assert_status_ok();
        let disposition = response.header("content-disposition");
        assert!(disposition.to_str().unwrap().starts_with("attachment; filename="));
        assert_eq!(response.header("content-type"), "text/plain");
    }

    #[tokio::test]
    async fn test_unknown_bill_is_not_found() {
        let app = app();
        app.server
            .get("/api/bill/00000000-0000-0000-0000-000000000000")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod payments {
    use super::*;

    #[tokio::test]
    async fn test_gateway_checkout_and_verify() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;
        let bill = app.create_bill(&token, "2024-03", "120").await;
        let id = bill["id"].as_str().unwrap();

        let order = app
            .server
            .post("/api/payment/create-order")
            .json(&json!({ "billId": id }))
            .await;
        order.assert_status_ok();
        let order = order.json::<Value>();
        assert_eq!(order["amount"], 102000);
        assert_eq!(order["currency"], "INR");
        let order_id = order["order_id"].as_str().unwrap().to_string();

        let signature = GatewayFixtures::secrets().sign_payment(&order_id, "pay_123");
        let verified = app
            .server
            .post("/api/payment/verify")
            .json(&json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_123",
                "razorpay_signature": signature,
            }))
            .await;
        verified.assert_status_ok();
        let verified = verified.json::<Value>();
        assert_eq!(verified["success"], true);
        assert_eq!(verified["bill"]["status"], "PAID");

        let status = app.server.get(&format!("/api/payment/status/{id}")).await;
        status.assert_status_ok();
        let status = status.json::<Value>();
        assert_eq!(status["status"], "PAID");
        assert_eq!(status["payment"]["gateway"]["payment_id"], "pay_123");
    }

    #[tokio::test]
    async fn test_bad_verify_signature_leaves_bill_unpaid() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;
        let bill = app.create_bill(&token, "2024-03", "120").await;
        let id = bill["id"].as_str().unwrap();

        let order = app
            .server
            .post("/api/payment/create-order")
            .json(&json!({ "bill_id": id }))
            .await
            .json::<Value>();

        app.server
            .post("/api/payment/verify")
            .json(&json!({
                "order_id": order["order_id"],
                "payment_id": "pay_123",
                "signature": "deadbeef",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let status = app.server.get(&format!("/api/payment/status/{id}")).await.json::<Value>();
        assert_eq!(status["status"], "UNPAID");
    }

    #[tokio::test]
    async fn test_create_order_requires_bill_id() {
        let app = app();
        app.server
            .post("/api/payment/create-order")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_capture_settles_bill() {
        let app = app();
        let token = app.owner_with_tenant("8.5").await;
        let bill = app.create_bill(&token, "2024-03", "120").await;
        let id = bill["id"].as_str().unwrap();

        let order = app
            .server
            .post("/api/payment/create-order")
            .json(&json!({ "billId": id }))
            .await
            .json::<Value>();
        let body = GatewayFixtures::captured(order["order_id"].as_str().unwrap(), "pay_hook");
        let signature = GatewayFixtures::secrets().sign_webhook(&body).unwrap();

        let response = app
            .server
            .post("/api/payment/webhook")
            .add_header(HeaderName::from_static(SIGNATURE_HEADER), HeaderValue::from_str(&signature).unwrap())
            .bytes(body.into())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");

        let status = app.server.get(&format!("/api/payment/status/{id}")).await.json::<Value>();
        assert_eq!(status["status"], "PAID");
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_rejected() {
        let app = app();
        let body = GatewayFixtures::captured("order_x", "pay_x");

        app.server
            .post("/api/payment/webhook")
            .add_header(HeaderName::from_static(SIGNATURE_HEADER), HeaderValue::from_static("bad"))
            .bytes(body.into())
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_and_readiness() {
        let app = app();

        let health = app.server.get("/health").await;
        health.assert_status_ok();
        assert_eq!(health.json::<Value>()["status"], "healthy");

        let ready = app.server.get("/health/ready").await;
        ready.assert_status_ok();
        let ready = ready.json::<Value>();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["checks"].as_array().unwrap().len(), 2);
    }
}
