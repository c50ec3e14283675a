#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use hospital_service::{
    api::{AppState, RouterBuilder},
    app::keys,
    models::{Designation, OtpType, RegisterRequest},
    test_support::TestHarness,
    utils::ErrorRegistry,
    Container,
};

pub struct TestApp {
    pub harness: TestHarness,
    pub container: Arc<Container>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_harness(TestHarness::new())
    }

    pub fn with_harness(harness: TestHarness) -> Self {
        let container = harness.container();
        let state = AppState::new(
            container.clone(),
            Arc::new(ErrorRegistry::embedded().unwrap()),
        );
        let router = RouterBuilder::with_all_routes().build(state);
        Self {
            harness,
            container,
            router,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    pub async fn post_auth(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), Some(token)).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, Some(token)).await
    }

    pub fn latest_code(&self, email: &str, otp_type: OtpType) -> String {
        self.harness
            .otps
            .latest_code(email, otp_type)
            .expect("an OTP was issued")
    }

    /// Register staff and verify the registration OTP
    pub async fn register_staff(&self, name: &str, mobile: &str, email: &str, password: &str) -> i64 {
        let (status, body) = self
            .post(
                "/auth/register",
                json!({
                    "name": name,
                    "mobile": mobile,
                    "email": email,
                    "designation": "nurse",
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let otp = self.latest_code(email, OtpType::Registration);
        let (status, body) = self
            .post(
                "/auth/verify-otp",
                json!({ "email": email, "otp": otp, "otp_type": "registration" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["data"]["user"]["id"].as_i64().unwrap()
    }

    /// Bootstrap an admin and return its access token
    pub async fn admin_token(&self) -> String {
        let auth = self.container.resolve(keys::AUTH_SERVICE).unwrap();
        auth.create_verified_admin(RegisterRequest {
            name: "Dr. Rao".to_string(),
            mobile: "9000000001".to_string(),
            email: "rao@lael.in".to_string(),
            designation: Designation::Doctor,
            password: "admin-password".to_string(),
        })
        .await
        .unwrap();

        self.login_token("rao@lael.in", "admin-password").await
    }

    pub async fn login_token(&self, identifier: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/login",
                json!({ "identifier": identifier, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["tokens"]["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["error_code"].as_str().unwrap_or_default()
}
