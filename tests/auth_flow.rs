mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{error_code, TestApp};
use hospital_service::models::OtpType;

#[tokio::test]
async fn staff_cannot_login_until_approved() {
    let app = TestApp::new();
    let admin_token = app.admin_token().await;
    let staff_id = app
        .register_staff("Nurse Priya", "9876543211", "priya@lael.in", "correct-horse")
        .await;

    let (status, body) = app
        .post(
            "/auth/login",
            json!({ "identifier": "9876543211", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "2005");

    let (status, body) = app
        .post_auth(
            &format!("/admin/users/{}/approve", staff_id),
            json!({}),
            &admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_approved"], true);

    let (status, body) = app
        .post(
            "/auth/login",
            json!({ "identifier": "9876543211", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn login_does_not_reveal_which_accounts_exist() {
    let app = TestApp::new();
    app.admin_token().await;

    let (unknown_status, unknown) = app
        .post(
            "/auth/login",
            json!({ "identifier": "9111111111", "password": "whatever" }),
        )
        .await;
    let (wrong_status, wrong) = app
        .post(
            "/auth/login",
            json!({ "identifier": "9000000001", "password": "not-the-password" }),
        )
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, wrong_status);
    assert_eq!(error_code(&unknown), "2000");
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn three_wrong_codes_then_the_right_one() {
    let app = TestApp::new();
    app.register_staff("Asha Kumar", "9123456780", "a@x.com", "correct-horse")
        .await;

    let (status, _) = app
        .post("/auth/login/otp/request", json!({ "identifier": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let code = app.latest_code("a@x.com", OtpType::Login);
    let wrong = if code == "123456" { "654321" } else { "123456" };

    for _ in 0..3 {
        let (status, body) = app
            .post(
                "/auth/verify-otp",
                json!({ "email": "a@x.com", "otp": wrong, "otp_type": "login" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "2002");
    }

    let record = app
        .harness
        .otps
        .records()
        .into_iter()
        .find(|r| r.otp_type == OtpType::Login)
        .unwrap();
    assert_eq!(record.retry_count, 3);
    assert!(!record.is_validated);

    let (_, body) = app
        .post(
            "/auth/verify-otp",
            json!({ "email": "a@x.com", "otp": code, "otp_type": "login" }),
        )
        .await;
    // The code itself is accepted; the account still awaits approval
    assert_eq!(error_code(&body), "2005");

    let record = app
        .harness
        .otps
        .records()
        .into_iter()
        .find(|r| r.otp_type == OtpType::Login)
        .unwrap();
    assert!(record.is_validated);
}

#[tokio::test]
async fn otp_codes_are_single_use_and_expire() {
    let app = TestApp::new();
    app.admin_token().await;

    app.post("/auth/login/otp/request", json!({ "identifier": "9000000001" }))
        .await;
    let code = app.latest_code("rao@lael.in", OtpType::Login);

    let request = json!({ "identifier": "9000000001", "otp": code });
    let (status, body) = app.post("/auth/login/otp", request.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app.post("/auth/login/otp", request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "2002");

    app.post("/auth/login/otp/request", json!({ "identifier": "9000000001" }))
        .await;
    let code = app.latest_code("rao@lael.in", OtpType::Login);
    app.harness.otps.expire_all();

    let (_, body) = app
        .post(
            "/auth/login/otp",
            json!({ "identifier": "9000000001", "otp": code }),
        )
        .await;
    assert_eq!(error_code(&body), "2001");

    let expired = app
        .harness
        .otps
        .records()
        .into_iter()
        .find(|r| r.otp_code == code)
        .unwrap();
    assert_eq!(expired.retry_count, 0);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = TestApp::new();
    app.admin_token().await;

    let (status, body) = app
        .post("/auth/forgot-password", json!({ "identifier": "rao@lael.in" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, unknown) = app
        .post("/auth/forgot-password", json!({ "identifier": "ghost@lael.in" }))
        .await;
    assert_eq!(body, unknown);

    let code = app.latest_code("rao@lael.in", OtpType::ForgotPassword);
    let (status, body) = app
        .post(
            "/auth/reset-password",
            json!({ "email": "rao@lael.in", "otp": code, "new_password": "fresh-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    app.login_token("9000000001", "fresh-password").await;
}

#[tokio::test]
async fn refresh_token_flow() {
    let app = TestApp::new();
    app.admin_token().await;

    let (_, body) = app
        .post(
            "/auth/login",
            json!({ "identifier": "rao@lael.in", "password": "admin-password" }),
        )
        .await;
    let access = body["data"]["tokens"]["access_token"].as_str().unwrap();
    let refresh = body["data"]["tokens"]["refresh_token"].as_str().unwrap();

    let (status, body) = app
        .post("/auth/refresh-token", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["access_token"].is_string());

    let (status, body) = app
        .post("/auth/refresh-token", json!({ "refresh_token": access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "2007");

    // A refresh token is not accepted as a bearer token
    let (status, body) = app.get_auth("/patients/lookup/9999999999", refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "2007");
}

#[tokio::test]
async fn registration_errors_use_registry_codes() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/register",
            json!({
                "name": "Nurse Priya",
                "mobile": "98765",
                "email": "priya@lael.in",
                "designation": "nurse",
                "password": "correct-horse",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "3002");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["category"], "validation");

    let (status, body) = app.post("/auth/register", json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "400");

    app.register_staff("Nurse Priya", "9876543211", "priya@lael.in", "correct-horse")
        .await;
    let (status, body) = app
        .post(
            "/auth/register",
            json!({
                "name": "Someone Else",
                "mobile": "9876543211",
                "email": "else@lael.in",
                "designation": "staff",
                "password": "correct-horse",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "3001");
}

#[tokio::test]
async fn otp_delivery_failure_keeps_the_account() {
    let app = TestApp::new();
    app.harness.mailer.fail_deliveries(true);

    let (status, body) = app
        .post(
            "/auth/register",
            json!({
                "name": "Nurse Priya",
                "mobile": "9876543211",
                "email": "priya@lael.in",
                "designation": "nurse",
                "password": "correct-horse",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "1005");
    assert!(body["error"].get("details").is_none());
    assert_eq!(app.harness.users.users().len(), 1);

    app.harness.mailer.fail_deliveries(false);
    let (status, _) = app
        .post(
            "/auth/resend-otp",
            json!({ "email": "priya@lael.in", "otp_type": "registration" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.harness.mailer.sent().len(), 1);
}

#[tokio::test]
async fn only_admins_reach_admin_routes() {
    let app = TestApp::new();
    let admin_token = app.admin_token().await;
    let staff_id = app
        .register_staff("Nurse Priya", "9876543211", "priya@lael.in", "correct-horse")
        .await;
    app.post_auth(
        &format!("/admin/users/{}/approve", staff_id),
        json!({}),
        &admin_token,
    )
    .await;
    let staff_token = app.login_token("priya@lael.in", "correct-horse").await;

    let new_admin = json!({
        "name": "Dr. Mehta",
        "mobile": "9000000002",
        "email": "mehta@lael.in",
        "designation": "doctor",
        "password": "admin-password",
    });

    let (status, body) = app
        .post_auth("/admin/register", new_admin.clone(), &staff_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "2010");

    let (status, body) = app
        .post_auth("/admin/register", new_admin, &admin_token)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user"]["is_admin"], true);
}

#[tokio::test]
async fn health_check_reports_version() {
    let app = TestApp::new();
    let (status, body) = app
        .send(axum::http::Method::GET, "/health", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["version"], hospital_service::VERSION);
}
