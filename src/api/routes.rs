//! HTTP surface of the transcoding proxy

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::backend::traits::{Envelope, EnvelopeData};
use crate::error::{AppError, Result};
use crate::middleware::{AuthLayer, RateLimitLayer};
use crate::stage::Stage;
use crate::AppState;

pub const UPLOAD_PATH: &str = "/api/uploads";

/// Build the proxy router with its middleware stack
pub fn create_router(state: Arc<AppState>) -> Router {
    let settings = &state.settings;
    let api_keys = if settings.auth.enabled {
        settings.auth.api_keys.clone()
    } else {
        Vec::new()
    };
    // Embedded images inflate payloads by roughly a third
    let body_limit = settings.transcoding.max_image_bytes.saturating_mul(2);

    let mut router = Router::new()
        .route(Stage::Model.route_path(), post(generate_model))
        .route(Stage::Overlay.route_path(), post(generate_overlay))
        .route(Stage::Campaign.route_path(), post(generate_campaign))
        .route(UPLOAD_PATH, post(upload_image))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit));

    if settings.rate_limit.enabled {
        router = router.layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_second,
            settings.rate_limit.burst_size,
        ));
    }

    router
        .layer(AuthLayer::new(api_keys))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn generate_model(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    forward(&state, Stage::Model, &body).await
}

async fn generate_overlay(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    forward(&state, Stage::Overlay, &body).await
}

async fn generate_campaign(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    forward(&state, Stage::Campaign, &body).await
}

async fn forward(state: &AppState, stage: Stage, body: &[u8]) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("stage_request", stage = %stage, request_id = %request_id);

    async {
        match relay(state, stage, body).await {
            Ok(mut envelope) => {
                envelope.request_id.get_or_insert(request_id);
                (status_for_code(envelope.code), Json(envelope)).into_response()
            }
            Err(e) => {
                info!(error = %e, kind = ?e.kind(), "Stage request failed");
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn relay(state: &AppState, stage: Stage, body: &[u8]) -> Result<Envelope> {
    let body: Value = serde_json::from_slice(body)?;
    if stage == Stage::Overlay {
        require_overlay_images(&body)?;
    }
    state.proxy.submit(stage, body).await
}

fn require_overlay_images(body: &Value) -> Result<()> {
    let present = |field: &str| {
        body.get(field)
            .and_then(Value::as_str)
            .map_or(false, |value| !value.trim().is_empty())
    };

    if present("human_image_url") && present("garment_image_url") {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Both model and garment images are required".to_string(),
        ))
    }
}

/// HTTP status mirroring an envelope code
fn status_for_code(code: i64) -> StatusCode {
    if code == 0 {
        return StatusCode::OK;
    }
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Envelope>> {
    if body.is_empty() {
        return Err(AppError::Validation("Upload body is empty".to_string()));
    }

    let limit = state.settings.transcoding.max_image_bytes;
    if body.len() > limit {
        return Err(AppError::Validation(format!(
            "Image is {} bytes, limit is {}",
            body.len(),
            limit
        )));
    }

    let declared = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let artifact = state.proxy.uploads().save(&body, declared).await?;
    info!(reference = %artifact, size = body.len(), "Stored upload");

    Ok(Json(Envelope::success(EnvelopeData {
        images: Some(vec![artifact.to_wire()]),
        ..EnvelopeData::default()
    })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
