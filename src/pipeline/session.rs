//! Async driver for the orchestrator

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::backend::http_backend::HttpBackend;
use crate::backend::traits::{Envelope, GenerationBackend};
use crate::config::PipelineConfig;
use crate::error::{AppError, ErrorKind, Result};
use crate::stage::Stage;

use super::orchestrator::{Command, GenerationResult, Orchestrator, StageView, Ticket};
use super::request::GenerationRequest;

const UPDATE_CAPACITY: usize = 64;

/// One user's pipeline: the orchestrator plus the client it submits through
pub struct Session {
    orchestrator: Mutex<Orchestrator>,
    client: Arc<dyn GenerationBackend>,
    stage_timeout: Duration,
    updates: broadcast::Sender<StageView>,
}

impl Session {
    pub fn new(client: Arc<dyn GenerationBackend>, stage_timeout: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            orchestrator: Mutex::new(Orchestrator::new()),
            client,
            stage_timeout,
            updates,
        }
    }

    /// Session talking to a transcoding proxy over HTTP
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let client = HttpBackend::new(
            "transcoding-proxy",
            &config.proxy_url,
            config.bearer_token.clone(),
            config.stage_timeout_ms,
        )?;
        Ok(Self::new(
            Arc::new(client),
            Duration::from_millis(config.stage_timeout_ms),
        ))
    }

    /// Stage views published after every state change
    pub fn subscribe(&self) -> broadcast::Receiver<StageView> {
        self.updates.subscribe()
    }

    pub fn view(&self, stage: Stage) -> StageView {
        self.orchestrator.lock().view(stage)
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.lock().is_busy()
    }

    pub fn result(&self, stage: Stage) -> Option<GenerationResult> {
        self.orchestrator.lock().result(stage).cloned()
    }

    /// Run one stage request to completion.
    ///
    /// Returns immediately with a concurrency rejection if another stage is in flight.
    pub async fn trigger(&self, request: GenerationRequest) -> GenerationResult {
        let commands = self.orchestrator.lock().trigger(request);
        self.run(commands).await
    }

    async fn run(&self, commands: Vec<Command>) -> GenerationResult {
        let mut queue: VecDeque<Command> = commands.into();
        let mut reply = None;

        while let Some(command) = queue.pop_front() {
            match command {
                Command::Publish(stage) => self.publish(stage),
                Command::Submit { ticket, body } => {
                    let in_flight = InFlight::new(self, ticket);
                    let outcome = self.call(ticket.stage(), body).await;
                    in_flight.disarm();
                    let next = self.orchestrator.lock().complete(ticket, outcome);
                    queue.extend(next);
                }
                Command::Reply(result) => reply = Some(result),
            }
        }

        reply.unwrap_or_else(|| {
            GenerationResult::failed(ErrorKind::UpstreamError, "Stage finished without a result")
        })
    }

    fn publish(&self, stage: Stage) {
        let view = self.view(stage);
        // No subscribers is fine
        let _ = self.updates.send(view);
    }

    async fn call(&self, stage: Stage, body: Value) -> Result<Envelope> {
        info!(stage = %stage, client = self.client.name(), "Submitting stage request");

        match tokio::time::timeout(self.stage_timeout, self.client.submit(stage, body)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(stage = %stage, timeout_ms = self.stage_timeout.as_millis() as u64, "Stage request timed out");
                Err(AppError::Timeout(format!(
                    "{} generation did not finish within {}ms",
                    stage,
                    self.stage_timeout.as_millis()
                )))
            }
        }
    }
}

/// Releases the busy slot if the `trigger` future is dropped mid-request
struct InFlight<'a> {
    session: &'a Session,
    ticket: Option<Ticket>,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a Session, ticket: Ticket) -> Self {
        Self {
            session,
            ticket: Some(ticket),
        }
    }

    fn disarm(mut self) {
        self.ticket = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            warn!(stage = %ticket.stage(), "Stage request dropped before completion");
            let commands = self.session.orchestrator.lock().abandon(ticket);
            for command in commands {
                if let Command::Publish(stage) = command {
                    self.session.publish(stage);
                }
            }
        }
    }
}
