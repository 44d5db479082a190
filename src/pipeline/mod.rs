//! Generation orchestration: sequencing the three stages for one user

pub mod orchestrator;
pub mod request;
pub mod session;

pub use orchestrator::{Command, GenerationResult, Orchestrator, StageOutput, StageView, Ticket};
pub use request::{CampaignRequest, GenerationRequest, ModelRequest, OverlayRequest, Platform};
pub use session::Session;
