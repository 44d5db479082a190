//! Prompt composition
//!
//! A model prompt has the shape `"A person <descriptor>, <pose>, <background>"`.
//! [`compose`] builds it from structured fields and [`decompose`] recovers pose and
//! background from a full prompt. Pose text sometimes carries a garment description
//! instead of a pose; the product-marker heuristic below detects that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Opening words of every composed prompt
pub const PROMPT_SUBJECT: &str = "A person";

/// Background forced when pose text turns out to describe the product
pub const DEFAULT_BACKGROUND: &str = "white background";

/// Tokens that mark garment-description text. Matched case-insensitively;
/// kept verbatim for compatibility with prompts saved by earlier clients.
const PRODUCT_MARKERS: [&str; 5] = ["wearing", "content:", "%", "gsm", "fabric"];

const SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    #[default]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBand {
    Children,
    #[default]
    Youth,
    Elderly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkinTone {
    #[default]
    Light,
    Medium,
    Dark,
    VeryDark,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl AgeBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBand::Children => "children",
            AgeBand::Youth => "youth",
            AgeBand::Elderly => "elderly",
        }
    }
}

impl SkinTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkinTone::Light => "light",
            SkinTone::Medium => "medium",
            SkinTone::Dark => "dark",
            SkinTone::VeryDark => "very-dark",
        }
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(AppError::Validation(format!("Unknown gender: {}", other))),
        }
    }
}

impl FromStr for AgeBand {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "children" => Ok(AgeBand::Children),
            "youth" => Ok(AgeBand::Youth),
            "elderly" => Ok(AgeBand::Elderly),
            other => Err(AppError::Validation(format!("Unknown age band: {}", other))),
        }
    }
}

impl FromStr for SkinTone {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(SkinTone::Light),
            "medium" => Ok(SkinTone::Medium),
            "dark" => Ok(SkinTone::Dark),
            "very-dark" | "very dark" => Ok(SkinTone::VeryDark),
            other => Err(AppError::Validation(format!("Unknown skin tone: {}", other))),
        }
    }
}

/// Demographic of the synthetic model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Descriptor {
    pub gender: Gender,
    pub age: AgeBand,
    pub skin_tone: SkinTone,
}

impl Descriptor {
    pub fn new(gender: Gender, age: AgeBand, skin_tone: SkinTone) -> Self {
        Self {
            gender,
            age,
            skin_tone,
        }
    }

    /// Settings object sent alongside a model request
    pub fn settings_json(&self) -> serde_json::Value {
        serde_json::json!({
            "gender": self.gender.as_str(),
            "age": self.age.as_str(),
            "skinTone": self.skin_tone.as_str(),
        })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a {} {} with {} skin tone",
            self.gender.as_str(),
            self.age.as_str(),
            self.skin_tone.as_str()
        )
    }
}

/// Pose and background recovered from a prompt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptParts {
    pub pose: String,
    pub background: String,
}

/// Whether text contains garment-description markers
pub fn contains_product_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRODUCT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Build `"A person <descriptor>, <pose>, <background>"`, eliding empty segments
pub fn compose(descriptor: &str, pose: &str, background: &str) -> String {
    let head = subject(descriptor);

    let mut segments = vec![head.clone()];
    for field in [pose, background] {
        let normalized = normalize(strip_subject(field, &head));
        if !normalized.is_empty() {
            segments.push(normalized);
        }
    }

    segments.join(", ")
}

/// Split a prompt back into pose and background
pub fn decompose(prompt: &str, descriptor: &str) -> PromptParts {
    let head = subject(descriptor);
    let segments = split_segments(strip_subject(prompt, &head));

    if segments.is_empty() {
        return PromptParts::default();
    }

    if let Some(last_marker) = segments.iter().rposition(|s| contains_product_marker(s)) {
        return PromptParts {
            pose: segments[..=last_marker].join(", "),
            background: DEFAULT_BACKGROUND.to_string(),
        };
    }

    match segments.split_last() {
        Some((last, rest)) if !rest.is_empty() => PromptParts {
            pose: rest.join(", "),
            background: last.to_string(),
        },
        _ => PromptParts {
            pose: segments.join(", "),
            background: String::new(),
        },
    }
}

fn subject(descriptor: &str) -> String {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        PROMPT_SUBJECT.to_string()
    } else {
        format!("{} {}", PROMPT_SUBJECT, descriptor)
    }
}

fn strip_subject<'a>(text: &'a str, head: &str) -> &'a str {
    let text = text.trim();
    match text.strip_prefix(head) {
        Some(rest) => rest.trim_start_matches(|c: char| c == SEPARATOR || c.is_whitespace()),
        None => text,
    }
}

fn split_segments(text: &str) -> Vec<&str> {
    text.split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize(text: &str) -> String {
    split_segments(text).join(", ")
}

/// Editable prompt fields as held by the composer form
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptState {
    descriptor: Descriptor,
    pose: String,
    background: String,
}

impl PromptState {
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            ..Self::default()
        }
    }

    /// Rebuild fields from a previously composed prompt
    pub fn from_prompt(descriptor: Descriptor, prompt: &str) -> Self {
        let parts = decompose(prompt, &descriptor.to_string());
        Self {
            descriptor,
            pose: parts.pose,
            background: parts.background,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn pose(&self) -> &str {
        &self.pose
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn set_descriptor(&mut self, descriptor: Descriptor) {
        self.descriptor = descriptor;
    }

    /// Update the pose. Product text in the pose always resets the background.
    pub fn set_pose(&mut self, pose: impl Into<String>) {
        self.pose = pose.into();
        if contains_product_marker(&self.pose) {
            self.background = DEFAULT_BACKGROUND.to_string();
        }
    }

    pub fn set_background(&mut self, background: impl Into<String>) {
        self.background = background.into();
    }

    /// Full prompt for the model stage
    pub fn prompt(&self) -> String {
        compose(&self.descriptor.to_string(), &self.pose, &self.background)
    }

    /// True when neither pose nor background has been filled in
    pub fn is_blank(&self) -> bool {
        self.pose.trim().is_empty() && self.background.trim().is_empty()
    }
}
