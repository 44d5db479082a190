//! Functional tests for the orchestrator session: exclusion, timeouts and HTTP wiring

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vton_studio::artifact::ImageArtifact;
use vton_studio::backend::traits::{Envelope, EnvelopeData, GenerationBackend};
use vton_studio::config::PipelineConfig;
use vton_studio::error::{ErrorKind, Result};
use vton_studio::pipeline::{
    CampaignRequest, GenerationRequest, ModelRequest, OverlayRequest, Platform, Session,
};
use vton_studio::prompt::{Descriptor, PromptState};
use vton_studio::provider::{GarmentClass, ModelChoice};
use vton_studio::stage::Stage;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Holds every request until released, recording what it saw
struct GatedBackend {
    gate: Arc<Notify>,
    seen: Mutex<Vec<(Stage, Value)>>,
    reply: Envelope,
}

impl GatedBackend {
    fn new(reply: Envelope) -> Self {
        Self {
            gate: Arc::new(Notify::new()),
            seen: Mutex::new(Vec::new()),
            reply,
        }
    }
}

#[async_trait]
impl GenerationBackend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    async fn submit(&self, stage: Stage, body: Value) -> Result<Envelope> {
        self.seen.lock().push((stage, body));
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}

fn garment() -> Option<ImageArtifact> {
    Some(ImageArtifact::Ephemeral("blob:shirt.png".to_string()))
}

fn model_request() -> GenerationRequest {
    let mut state = PromptState::new(Descriptor::default());
    state.set_pose("walking on a runway");
    ModelRequest::new(&state, ModelChoice::Kling, garment()).into()
}

fn model_image() -> Envelope {
    Envelope::success(EnvelopeData {
        images: Some(vec!["data:image/png;base64,TU9ERUw=".to_string()]),
        ..EnvelopeData::default()
    })
}

async fn wait_until_busy(session: &Session) {
    while !session.is_busy() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_second_trigger_rejected_while_busy() {
    let backend = Arc::new(GatedBackend::new(model_image()));
    let session = Arc::new(Session::new(backend.clone(), Duration::from_secs(5)));

    let running = tokio::spawn({
        let session = session.clone();
        async move { session.trigger(model_request()).await }
    });
    wait_until_busy(&session).await;

    let rejected = session
        .trigger(CampaignRequest::new("Launch", vec![Platform::Instagram], garment()).into())
        .await;
    assert_eq!(rejected.error_kind(), Some(ErrorKind::ConcurrencyRejection));
    assert!(session.result(Stage::Campaign).is_none());

    backend.gate.notify_one();
    let finished = running.await.unwrap();

    assert!(finished.is_fulfilled());
    assert!(!session.is_busy());
    assert_eq!(backend.seen.lock().len(), 1);
}

#[tokio::test]
async fn test_overlay_waits_for_model_image() {
    let backend = Arc::new(GatedBackend::new(model_image()));
    let session = Session::new(backend.clone(), Duration::from_secs(5));
    let overlay = || -> GenerationRequest {
        OverlayRequest::new(garment(), ModelChoice::Leffa, GarmentClass::Upper).into()
    };

    let early = session.trigger(overlay()).await;
    assert_eq!(early.error_kind(), Some(ErrorKind::ValidationError));
    assert!(backend.seen.lock().is_empty());

    backend.gate.notify_one();
    assert!(session.trigger(model_request()).await.is_fulfilled());

    backend.gate.notify_one();
    assert!(session.trigger(overlay()).await.is_fulfilled());

    let seen = backend.seen.lock();
    let (stage, body) = &seen[1];
    assert_eq!(*stage, Stage::Overlay);
    assert_eq!(body["human_image_url"], "data:image/png;base64,TU9ERUw=");
    assert_eq!(body["garment_type"], "upper");
}

#[tokio::test]
async fn test_stage_timeout_releases_session() {
    let backend = Arc::new(GatedBackend::new(model_image()));
    let session = Session::new(backend.clone(), Duration::from_millis(50));

    let result = session.trigger(model_request()).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::UpstreamError));
    assert!(result.error_message().unwrap().contains("did not finish"));
    assert!(!session.is_busy());
    assert!(session.view(Stage::Model).error.is_some());
}

#[tokio::test]
async fn test_abandoned_trigger_releases_session() {
    let backend = Arc::new(GatedBackend::new(model_image()));
    let session = Session::new(backend.clone(), Duration::from_secs(5));
    let mut updates = session.subscribe();

    let outer = Duration::from_millis(20);
    let dropped = tokio::time::timeout(outer, session.trigger(model_request())).await;
    assert!(dropped.is_err());

    assert!(!session.is_busy());
    let view = session.view(Stage::Model);
    assert!(!view.pending);
    assert!(view.error.is_some());
    assert_eq!(
        session.result(Stage::Model).unwrap().error_kind(),
        Some(ErrorKind::UpstreamError)
    );

    assert!(updates.try_recv().unwrap().pending);
    let released = updates.try_recv().unwrap();
    assert!(!released.pending);
    assert!(!released.busy);

    backend.gate.notify_one();
    assert!(session.trigger(model_request()).await.is_fulfilled());
    assert_eq!(backend.seen.lock().len(), 2);
}

#[tokio::test]
async fn test_session_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Stage::Campaign.route_path()))
        .and(header("authorization", "Bearer session-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "Success",
            "data": { "campaign_content": "### Overview\nLight layers for long days." }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(Stage::Model.route_path()))
        .and(header("authorization", "Bearer session-key"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({
            "code": 1001,
            "message": "Failed to fetch result image",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = PipelineConfig {
        proxy_url: server.uri(),
        bearer_token: Some("session-key".to_string()),
        stage_timeout_ms: 5_000,
    };
    let session = Session::from_config(&config).unwrap();

    let campaign = session
        .trigger(CampaignRequest::new("Linen", vec![Platform::Twitter, Platform::Youtube], garment()).into())
        .await;
    assert_eq!(campaign.text(), Some("### Overview\nLight layers for long days."));

    let model = session.trigger(model_request()).await;
    assert_eq!(model.error_kind(), Some(ErrorKind::TranscodingError));
    assert_eq!(model.error_message(), Some("Failed to fetch result image"));

    assert!(session.result(Stage::Campaign).unwrap().is_fulfilled());
}
