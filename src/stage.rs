//! Pipeline stages shared by the orchestrator, provider table and proxy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// An independent phase of the generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Synthetic model image from a prompt
    Model,
    /// Garment overlaid onto the generated model
    Overlay,
    /// Marketing copy for the garment
    Campaign,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Model, Stage::Overlay, Stage::Campaign];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Model => "model",
            Stage::Overlay => "overlay",
            Stage::Campaign => "campaign",
        }
    }

    /// Route used by both the backend service and the proxy for this stage
    pub fn route_path(&self) -> &'static str {
        match self {
            Stage::Model => "/api/image-generation/generate-image",
            Stage::Overlay => "/api/image-generation/virtual-try-on",
            Stage::Campaign => "/api/image-generation/generate-campaign",
        }
    }

    /// Whether a fulfilled result of this stage is an image rather than text
    pub fn produces_image(&self) -> bool {
        !matches!(self, Stage::Campaign)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Stage::Model => 0,
            Stage::Overlay => 1,
            Stage::Campaign => 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(Stage::Model),
            "overlay" => Ok(Stage::Overlay),
            "campaign" => Ok(Stage::Campaign),
            other => Err(AppError::InvalidRequest(format!("Unknown stage: {}", other))),
        }
    }
}
