mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{error_code, TestApp};

async fn register_new_patient(app: &TestApp, token: &str) -> Value {
    let (status, body) = app
        .post_auth(
            "/patients/register",
            json!({
                "mobile": "9999999999",
                "name": "Asha Kumar",
                "age": 34,
                "sex": "female",
                "address": { "city": "Pune", "pincode": "411001" },
            }),
            token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn new_patient_is_found_by_mobile() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let registration = register_new_patient(&app, &token).await;
    assert_eq!(registration["visit_number"], 1);
    let opd_id = registration["opd_id"].as_str().unwrap();
    assert!(opd_id.starts_with("LAEL"));

    let (status, body) = app.get_auth("/patients/lookup/9999999999", &token).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let visits = body["data"]["visits"].as_array().unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(body["data"]["opd_id"], opd_id);
    assert_eq!(visits[0]["opd_id"], opd_id);
    assert_eq!(body["data"]["latest_visit"]["name"], "Asha Kumar");
}

#[tokio::test]
async fn opd_id_must_belong_to_the_mobile_number() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let registration = register_new_patient(&app, &token).await;

    let (status, body) = app
        .post_auth(
            "/patients/register",
            json!({ "mobile": "8888888888", "opd_id": registration["opd_id"] }),
            &token,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "4003");
    assert!(!body.to_string().contains("9999999999"));
    assert_eq!(app.harness.patients.visits().len(), 1);
}

#[tokio::test]
async fn revisit_keeps_opd_id_and_merges_fields() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let registration = register_new_patient(&app, &token).await;
    let opd_id = registration["opd_id"].as_str().unwrap();

    let (status, body) = app
        .post_auth(
            "/patients/register",
            json!({
                "mobile": "9999999999",
                "opd_id": opd_id,
                "age": 0,
                "name": "  ",
                "address": { "locality": "Kothrud" },
            }),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["opd_id"], opd_id);
    assert_eq!(body["data"]["visit_number"], 2);

    let (_, body) = app.get_auth("/patients/lookup/9999999999", &token).await;
    let latest = &body["data"]["latest_visit"];
    assert_eq!(body["data"]["visits"].as_array().unwrap().len(), 2);
    assert_eq!(latest["visit_number"], 2);
    assert_eq!(latest["name"], "Asha Kumar");
    assert_eq!(latest["age"], 34);
    assert_eq!(latest["address"]["city"], "Pune");
    assert_eq!(latest["address"]["locality"], "Kothrud");
}

#[tokio::test]
async fn patient_lookup_errors() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, body) = app.get_auth("/patients/lookup/12345", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "3002");

    let (status, body) = app.get_auth("/patients/lookup/9999999999", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "4000");

    let (status, body) = app
        .post_auth(
            "/patients/register",
            json!({ "mobile": "9999999999", "name": "Asha Kumar", "age": 200, "sex": "female" }),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "4001");
}

#[tokio::test]
async fn consultations_are_recorded_by_the_signed_in_doctor() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let registration = register_new_patient(&app, &token).await;
    let opd_id = registration["opd_id"].as_str().unwrap();
    let records_uri = format!("/patients/{}/opd-records", opd_id);

    let (status, body) = app.get_auth(&records_uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "5000");

    let (status, body) = app
        .post_auth(
            &records_uri,
            json!({
                "symptoms": ["fever", "cough"],
                "medicines": [{ "name": "Paracetamol", "dose": "500mg", "morning": true, "night": true }],
            }),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["template_version"], 1);
    assert_eq!(body["data"]["visit_number"], 1);

    let admin = app.harness.users.users().remove(0);
    assert_eq!(body["data"]["doctor_id"], admin.id);

    let (status, body) = app.post_auth(&records_uri, json!({}), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "5001");

    let (status, body) = app.get_auth(&records_uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["symptoms"], json!(["fever", "cough"]));
}

#[tokio::test]
async fn patient_routes_require_a_token() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::GET, "/patients/lookup/9999999999", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "2009");

    let (status, _) = app
        .send(
            Method::POST,
            "/patients/register",
            Some(json!({ "mobile": "9999999999" })),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
