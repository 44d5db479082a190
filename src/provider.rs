//! Provider adapter table
//!
//! Maps a logical stage, model choice and garment class to the concrete
//! provider, model identifier and parameters sent to the generation service.
//! Lookups are pure; nothing here touches the network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::stage::Stage;

const MODEL_PROVIDER: &str = "replicate";
const MODEL_IDENTIFIER: &str = "flux-dev";
const MODEL_GUIDANCE: f32 = 3.5;

const CAMPAIGN_PROVIDER: &str = "openai";
const CAMPAIGN_MODEL: &str = "gpt-4o";

const OVERLAY_PROVIDER: &str = "tryon";

/// Output size sent with Kling try-on requests
const FIXED_DIMENSION: u32 = 1024;

/// Try-on model selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelChoice {
    #[serde(rename = "leffa")]
    Leffa,
    #[default]
    #[serde(rename = "cat-vton")]
    CatVton,
    #[serde(rename = "kling")]
    Kling,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [ModelChoice::Leffa, ModelChoice::CatVton, ModelChoice::Kling];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Leffa => "leffa",
            ModelChoice::CatVton => "cat-vton",
            ModelChoice::Kling => "kling",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "leffa" => Ok(ModelChoice::Leffa),
            "cat-vton" | "catvton" => Ok(ModelChoice::CatVton),
            "kling" => Ok(ModelChoice::Kling),
            other => Err(AppError::Validation(format!("Unknown model choice: {}", other))),
        }
    }
}

/// Which part of the body the garment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentClass {
    #[default]
    Upper,
    Lower,
    Overall,
}

impl GarmentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentClass::Upper => "upper",
            GarmentClass::Lower => "lower",
            GarmentClass::Overall => "overall",
        }
    }
}

impl fmt::Display for GarmentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentClass {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "upper" => Ok(GarmentClass::Upper),
            "lower" => Ok(GarmentClass::Lower),
            "overall" => Ok(GarmentClass::Overall),
            other => Err(AppError::Validation(format!("Unknown garment class: {}", other))),
        }
    }
}

/// Provider-specific parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Forwarded untouched to the try-on backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment_type: Option<GarmentClass>,
}

/// Immutable provider selection for one stage request
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    stage: Stage,
    provider: &'static str,
    model: String,
    params: ProviderParams,
}

impl ProviderConfig {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn provider(&self) -> &str {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn params(&self) -> &ProviderParams {
        &self.params
    }
}

/// Resolve a stage given by name. Fails only when the stage is unknown.
pub fn resolve(stage: &str, model_choice: ModelChoice, garment_class: GarmentClass) -> Result<ProviderConfig> {
    let stage = stage.parse::<Stage>()?;
    Ok(resolve_stage(stage, model_choice, garment_class))
}

/// Resolve a typed stage; total over every known input
pub fn resolve_stage(stage: Stage, model_choice: ModelChoice, garment_class: GarmentClass) -> ProviderConfig {
    let (provider, model, mut params) = match stage {
        // Every model choice shares one text-to-image provider for now
        Stage::Model => (
            MODEL_PROVIDER,
            MODEL_IDENTIFIER.to_string(),
            ProviderParams {
                guidance: Some(MODEL_GUIDANCE),
                ..ProviderParams::default()
            },
        ),
        Stage::Overlay => (
            OVERLAY_PROVIDER,
            model_choice.as_str().to_string(),
            ProviderParams {
                garment_type: Some(garment_class),
                ..ProviderParams::default()
            },
        ),
        Stage::Campaign => (
            CAMPAIGN_PROVIDER,
            CAMPAIGN_MODEL.to_string(),
            ProviderParams::default(),
        ),
    };

    if stage == Stage::Overlay && model_choice == ModelChoice::Kling {
        params.width = Some(FIXED_DIMENSION);
        params.height = Some(FIXED_DIMENSION);
    }

    ProviderConfig {
        stage,
        provider,
        model,
        params,
    }
}
