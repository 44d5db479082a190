//! Stage state machine
//!
//! Pure bookkeeping: the orchestrator never performs I/O. Each transition
//! returns the commands the driver must carry out, so every rule about
//! sequencing and mutual exclusion can be exercised without a network.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::artifact::ImageArtifact;
use crate::backend::traits::Envelope;
use crate::error::{AppError, ErrorKind, Result, TRANSCODING_ERROR_CODE};
use crate::stage::Stage;

use super::request::GenerationRequest;

/// Output of a fulfilled stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    Image(ImageArtifact),
    Text(String),
}

/// Outcome of one stage request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Pending,
    Fulfilled { output: StageOutput },
    Failed { kind: ErrorKind, message: String },
}

impl GenerationResult {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        GenerationResult::Failed {
            kind,
            message: message.into(),
        }
    }

    fn from_error(error: &AppError) -> Self {
        Self::failed(error.kind(), error.to_string())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GenerationResult::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, GenerationResult::Fulfilled { .. })
    }

    pub fn image(&self) -> Option<&ImageArtifact> {
        match self {
            GenerationResult::Fulfilled {
                output: StageOutput::Image(image),
            } => Some(image),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationResult::Fulfilled {
                output: StageOutput::Text(text),
            } => Some(text),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            GenerationResult::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            GenerationResult::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Identifies one in-flight stage request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    stage: Stage,
    seq: u64,
}

impl Ticket {
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send `body` to the stage endpoint and report back with `complete`
    Submit { ticket: Ticket, body: Value },
    /// Observable state of `Stage` changed
    Publish(Stage),
    /// Final answer for the caller that triggered the request
    Reply(GenerationResult),
}

/// Snapshot of one stage for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub pending: bool,
    pub result: Option<StageOutput>,
    pub error: Option<String>,
    /// Some stage is in flight, so triggers are disabled
    pub busy: bool,
}

/// Owns per-stage results and the single in-flight slot
#[derive(Debug, Default)]
pub struct Orchestrator {
    running: Option<Ticket>,
    results: [Option<GenerationResult>; 3],
    next_seq: u64,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    pub fn running_stage(&self) -> Option<Stage> {
        self.running.map(|ticket| ticket.stage)
    }

    /// Latest result for `stage`, if it has ever been triggered
    pub fn result(&self, stage: Stage) -> Option<&GenerationResult> {
        self.results[stage.index()].as_ref()
    }

    pub fn view(&self, stage: Stage) -> StageView {
        let result = self.result(stage);
        StageView {
            stage,
            pending: result.map_or(false, GenerationResult::is_pending),
            result: match result {
                Some(GenerationResult::Fulfilled { output }) => Some(output.clone()),
                _ => None,
            },
            error: result.and_then(GenerationResult::error_message).map(str::to_string),
            busy: self.is_busy(),
        }
    }

    /// Start a stage request.
    ///
    /// Rejected without any state change while another stage is in flight.
    /// A request failing its preconditions records the failure and never
    /// reaches the network.
    pub fn trigger(&mut self, request: GenerationRequest) -> Vec<Command> {
        let stage = request.stage();

        if let Some(running) = self.running {
            debug!(stage = %stage, running = %running.stage, "Rejected trigger while busy");
            let error = AppError::ConcurrencyRejection(running.stage.to_string());
            return vec![Command::Reply(GenerationResult::from_error(&error))];
        }

        let request = match self.prepare(request) {
            Ok(request) => request,
            Err(error) => {
                let result = GenerationResult::from_error(&error);
                self.results[stage.index()] = Some(result.clone());
                return vec![Command::Publish(stage), Command::Reply(result)];
            }
        };

        let ticket = Ticket {
            stage,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.running = Some(ticket);
        self.results[stage.index()] = Some(GenerationResult::Pending);

        vec![
            Command::Publish(stage),
            Command::Submit {
                ticket,
                body: request.body(),
            },
        ]
    }

    /// Record the outcome of a submitted request
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<Envelope>) -> Vec<Command> {
        if self.running != Some(ticket) {
            warn!(stage = %ticket.stage, "Ignoring completion for a request that is not in flight");
            return Vec::new();
        }
        self.running = None;

        let result = match outcome {
            Ok(envelope) => Self::extract(ticket.stage, envelope),
            Err(error) => GenerationResult::from_error(&error),
        };
        self.results[ticket.stage.index()] = Some(result.clone());

        vec![Command::Publish(ticket.stage), Command::Reply(result)]
    }

    /// Release a request whose caller went away before it completed
    pub fn abandon(&mut self, ticket: Ticket) -> Vec<Command> {
        self.complete(
            ticket,
            Err(AppError::Internal("stage request abandoned".to_string())),
        )
    }

    fn prepare(&self, request: GenerationRequest) -> Result<GenerationRequest> {
        let request = match request {
            GenerationRequest::Overlay(mut overlay) => {
                if overlay.model_artifact.is_none() {
                    overlay.model_artifact = self
                        .result(Stage::Model)
                        .and_then(GenerationResult::image)
                        .cloned();
                }
                GenerationRequest::Overlay(overlay)
            }
            other => other,
        };

        request.validate()?;
        Ok(request)
    }

    fn extract(stage: Stage, envelope: Envelope) -> GenerationResult {
        if !envelope.is_success() {
            let kind = if envelope.code == TRANSCODING_ERROR_CODE {
                ErrorKind::TranscodingError
            } else {
                ErrorKind::UpstreamError
            };
            let message = if envelope.message.is_empty() {
                format!("Failed to generate {}", stage)
            } else {
                envelope.message
            };
            return GenerationResult::failed(kind, message);
        }

        if !stage.produces_image() {
            return match envelope.campaign_content() {
                Some(text) if !text.trim().is_empty() => GenerationResult::Fulfilled {
                    output: StageOutput::Text(text.to_string()),
                },
                _ => GenerationResult::failed(ErrorKind::UpstreamError, "No campaign content received"),
            };
        }

        match envelope.first_image().map(ImageArtifact::parse) {
            Some(Ok(image)) => GenerationResult::Fulfilled {
                output: StageOutput::Image(image),
            },
            Some(Err(e)) => GenerationResult::failed(
                ErrorKind::UpstreamError,
                format!("Invalid image in response: {}", e),
            ),
            None => GenerationResult::failed(ErrorKind::UpstreamError, "No image was generated"),
        }
    }
}
