//! Stage requests and their preconditions

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::artifact::ImageArtifact;
use crate::error::{AppError, Result};
use crate::prompt::{decompose, Descriptor, PromptState};
use crate::provider::{resolve_stage, GarmentClass, ModelChoice, ProviderConfig};
use crate::stage::Stage;

/// Social platform targeted by a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Twitter,
    Facebook,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "twitter" => Ok(Platform::Twitter),
            "facebook" => Ok(Platform::Facebook),
            "youtube" => Ok(Platform::Youtube),
            other => Err(AppError::Validation(format!("Unknown platform: {}", other))),
        }
    }
}

/// Text-to-image request for the synthetic model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    pub provider_config: ProviderConfig,
    pub demographic: Descriptor,
    /// Lets the backend describe the garment in the prompt
    pub garment: Option<ImageArtifact>,
}

impl ModelRequest {
    pub fn new(state: &PromptState, model_choice: ModelChoice, garment: Option<ImageArtifact>) -> Self {
        Self {
            prompt: state.prompt(),
            provider_config: resolve_stage(Stage::Model, model_choice, GarmentClass::default()),
            demographic: *state.descriptor(),
            garment,
        }
    }

    fn validate(&self) -> Result<()> {
        let parts = decompose(&self.prompt, &self.demographic.to_string());
        if parts.pose.is_empty() && parts.background.is_empty() {
            return Err(AppError::Validation(
                "Please enter a prompt before generating".to_string(),
            ));
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let config = &self.provider_config;
        let mut body = Map::new();
        body.insert("prompt".into(), json!(self.prompt));
        insert_provider(&mut body, config);
        if let Some(garment) = &self.garment {
            body.insert("garment_image_url".into(), json!(garment.to_wire()));
        }
        body.insert("settings".into(), self.demographic.settings_json());
        Value::Object(body)
    }
}

/// Try-on request dressing the generated model in the garment
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRequest {
    /// Filled from the latest fulfilled model result when left empty
    pub model_artifact: Option<ImageArtifact>,
    pub garment: Option<ImageArtifact>,
    pub model_choice: ModelChoice,
    pub garment_class: GarmentClass,
}

impl OverlayRequest {
    pub fn new(garment: Option<ImageArtifact>, model_choice: ModelChoice, garment_class: GarmentClass) -> Self {
        Self {
            model_artifact: None,
            garment,
            model_choice,
            garment_class,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.model_artifact.is_none() || self.garment.is_none() {
            return Err(AppError::Validation(
                "Both model and garment images are required".to_string(),
            ));
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let config = resolve_stage(Stage::Overlay, self.model_choice, self.garment_class);
        let mut body = Map::new();
        if let Some(model) = &self.model_artifact {
            body.insert("human_image_url".into(), json!(model.to_wire()));
        }
        if let Some(garment) = &self.garment {
            body.insert("garment_image_url".into(), json!(garment.to_wire()));
        }
        insert_provider(&mut body, &config);
        Value::Object(body)
    }
}

/// Marketing copy request
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRequest {
    pub brief: String,
    pub platforms: Vec<Platform>,
    pub garment: Option<ImageArtifact>,
}

impl CampaignRequest {
    pub fn new(brief: impl Into<String>, platforms: Vec<Platform>, garment: Option<ImageArtifact>) -> Self {
        Self {
            brief: brief.into(),
            platforms,
            garment,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.brief.trim().is_empty() || self.platforms.is_empty() {
            return Err(AppError::Validation(
                "Please select platforms and enter campaign type".to_string(),
            ));
        }
        if self.garment.is_none() {
            return Err(AppError::Validation("Please upload a garment image".to_string()));
        }
        Ok(())
    }

    /// Instruction text sent to the copywriting model
    pub fn instructions(&self) -> String {
        let platforms = self
            .platforms
            .iter()
            .map(Platform::as_str)
            .collect::<Vec<_>>()
            .join(" and ");

        format!(
            "Create a concise marketing campaign for {}. Include:\n\
             1. A brief, impactful overview (2-3 sentences)\n\
             2. 3 catchy slogans that highlight the unique features\n\
             Focus on {} platforms. Keep it crisp and memorable.",
            self.brief.trim(),
            platforms
        )
    }

    fn body(&self) -> Value {
        let config = resolve_stage(Stage::Campaign, ModelChoice::default(), GarmentClass::default());
        let mut body = Map::new();
        body.insert("prompt".into(), json!(self.instructions()));
        if let Some(garment) = &self.garment {
            body.insert("garment_image_url".into(), json!(garment.to_wire()));
        }
        insert_provider(&mut body, &config);
        Value::Object(body)
    }
}

fn insert_provider(body: &mut Map<String, Value>, config: &ProviderConfig) {
    body.insert("provider".into(), json!(config.provider()));
    body.insert("model".into(), json!(config.model()));

    let params = config.params();
    if let Some(guidance) = params.guidance {
        body.insert("guidance".into(), json!(guidance));
    }
    if let Some(width) = params.width {
        body.insert("width".into(), json!(width));
    }
    if let Some(height) = params.height {
        body.insert("height".into(), json!(height));
    }
    if let Some(garment_type) = params.garment_type {
        body.insert("garment_type".into(), json!(garment_type.as_str()));
    }
}

/// A request for one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Model(ModelRequest),
    Overlay(OverlayRequest),
    Campaign(CampaignRequest),
}

impl GenerationRequest {
    pub fn stage(&self) -> Stage {
        match self {
            GenerationRequest::Model(_) => Stage::Model,
            GenerationRequest::Overlay(_) => Stage::Overlay,
            GenerationRequest::Campaign(_) => Stage::Campaign,
        }
    }

    /// Check the request's own preconditions
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationRequest::Model(request) => request.validate(),
            GenerationRequest::Overlay(request) => request.validate(),
            GenerationRequest::Campaign(request) => request.validate(),
        }
    }

    /// Wire body for the stage endpoint
    pub fn body(&self) -> Value {
        match self {
            GenerationRequest::Model(request) => request.body(),
            GenerationRequest::Overlay(request) => request.body(),
            GenerationRequest::Campaign(request) => request.body(),
        }
    }
}

impl From<ModelRequest> for GenerationRequest {
    fn from(request: ModelRequest) -> Self {
        GenerationRequest::Model(request)
    }
}

impl From<OverlayRequest> for GenerationRequest {
    fn from(request: OverlayRequest) -> Self {
        GenerationRequest::Overlay(request)
    }
}

impl From<CampaignRequest> for GenerationRequest {
    fn from(request: CampaignRequest) -> Self {
        GenerationRequest::Campaign(request)
    }
}
