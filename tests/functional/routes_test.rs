//! Functional tests for the proxy router

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use vton_studio::api::{create_router, routes::UPLOAD_PATH};
use vton_studio::backend::traits::Envelope;
use vton_studio::config::Settings;
use vton_studio::stage::Stage;
use vton_studio::AppState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "studio-key";
const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 9, 9, 9, 9];

async fn create_test_app(server: &MockServer, uploads: &TempDir) -> Router {
    let mut settings = Settings::default();
    settings.backend.base_url = server.uri();
    settings.transcoding.upload_dir = uploads.path().to_string_lossy().into_owned();
    settings.auth.enabled = true;
    settings.auth.api_keys = vec![API_KEY.to_string()];
    settings.rate_limit.enabled = false;

    create_router(Arc::new(AppState::from_settings(settings).unwrap()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", API_KEY))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_envelope(response: axum::response::Response) -> Envelope {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    let app = create_test_app(&server, &uploads).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stage_route_requires_key() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    let app = create_test_app(&server, &uploads).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(Stage::Model.route_path())
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_model_route_embeds_result() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path(Stage::Model.route_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Success",
            "data": { "images": [format!("{}/files/model.png", server.uri())] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/model.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG.to_vec()),
        )
        .mount(&server)
        .await;

    let app = create_test_app(&server, &uploads).await;
    let response = app
        .oneshot(post_json(
            Stage::Model.route_path(),
            json!({ "prompt": "A person a female youth with light skin tone, smiling" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = read_envelope(response).await;
    assert_eq!(envelope.code, 0);
    assert!(envelope.request_id.is_some());
    assert!(envelope.first_image().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_upload_then_overlay() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path(Stage::Overlay.route_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Success",
            "data": { "images": ["data:image/png;base64,RFJFU1NFRA=="] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app(&server, &uploads).await;

    let upload = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(UPLOAD_PATH)
                .header(AUTHORIZATION, format!("Bearer {}", API_KEY))
                .header(CONTENT_TYPE, "image/png")
                .body(Body::from(PNG.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(upload.status(), StatusCode::OK);
    let reference = read_envelope(upload).await.first_image().unwrap().to_string();
    assert!(reference.starts_with("blob:"));

    let missing_model = app
        .clone()
        .oneshot(post_json(
            Stage::Overlay.route_path(),
            json!({ "garment_image_url": reference }),
        ))
        .await
        .unwrap();
    assert_eq!(missing_model.status(), StatusCode::BAD_REQUEST);
    let envelope = read_envelope(missing_model).await;
    assert_eq!(envelope.code, 400);
    assert_eq!(envelope.message, "Both model and garment images are required");

    let response = app
        .oneshot(post_json(
            Stage::Overlay.route_path(),
            json!({
                "human_image_url": "data:image/png;base64,TU9ERUw=",
                "garment_image_url": reference,
                "model": "cat-vton",
                "garment_type": "upper"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_envelope(response).await.first_image(),
        Some("data:image/png;base64,RFJFU1NFRA==")
    );
}

#[tokio::test]
async fn test_transcoding_failure_reports_code() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path(Stage::Model.route_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Success",
            "data": { "images": [format!("{}/files/gone.png", server.uri())] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/gone.png"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let app = create_test_app(&server, &uploads).await;
    let response = app
        .oneshot(post_json(Stage::Model.route_path(), json!({ "prompt": "p" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let envelope = read_envelope(response).await;
    assert_eq!(envelope.code, 1001);
    assert!(envelope.data.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let server = MockServer::start().await;
    let uploads = TempDir::new().unwrap();
    let app = create_test_app(&server, &uploads).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(Stage::Campaign.route_path())
                .header(AUTHORIZATION, format!("Bearer {}", API_KEY))
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_envelope(response).await.code, 400);
}
