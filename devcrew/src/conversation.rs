//! Conversation driver: one request to one role, bounded by a turn cap.

use std::time::Duration;

use tokio::sync::watch;

use crate::llm::{ChatModel, LlmError, Message};
use crate::roles::Role;

/// Sent on our side between model turns when a role gets more than one.
pub const AUTO_REPLY: &str = "Continue.";

/// One model turn as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub role: Role,
    pub prompt: String,
    pub reply: String,
}

/// Drives requests against a [`ChatModel`] and keeps the transcript.
pub struct Conversation<'a> {
    model: &'a dyn ChatModel,
    timeout: Duration,
    cancel: Option<watch::Receiver<bool>>,
    transcript: Vec<Exchange>,
}

impl<'a> Conversation<'a> {
    pub fn new(model: &'a dyn ChatModel, timeout: Duration) -> Self {
        Self {
            model,
            timeout,
            cancel: None,
            transcript: Vec::new(),
        }
    }

    /// Abandon in-flight calls once `cancel` reads `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// Number of model calls made to `role` so far.
    pub fn calls_to(&self, role: Role) -> usize {
        self.transcript.iter().filter(|e| e.role == role).count()
    }

    /// Send `message` to `role` and return its last reply.
    ///
    /// Up to `turn_cap` replies are requested (at least one); between turns
    /// the driver answers with [`AUTO_REPLY`]. A reply that signals
    /// termination ends the exchange early.
    pub async fn ask(
        &mut self,
        role: Role,
        message: &str,
        turn_cap: usize,
    ) -> Result<String, LlmError> {
        let turns = turn_cap.max(1);
        let mut messages = vec![Message::user(message)];
        let mut prompt = message.to_string();

        let mut turn = 0;
        loop {
            tracing::debug!(%role, turn, "Calling model");
            let reply = self.call(role, &messages).await?;
            self.transcript.push(Exchange {
                role,
                prompt: prompt.clone(),
                reply: reply.clone(),
            });

            turn += 1;
            if turn == turns || is_termination(&reply) {
                return Ok(reply);
            }

            messages.push(Message::assistant(reply));
            messages.push(Message::user(AUTO_REPLY));
            prompt = AUTO_REPLY.to_string();
        }
    }

    async fn call(&mut self, role: Role, messages: &[Message]) -> Result<String, LlmError> {
        let model = self.model;
        let limit = self.timeout;
        let call = tokio::time::timeout(limit, model.chat(role.system_prompt(), messages));

        let outcome = match self.cancel.as_mut() {
            Some(rx) => {
                tokio::select! {
                    biased;
                    _ = cancelled(rx) => return Err(LlmError::Cancelled),
                    r = call => r,
                }
            }
            None => call.await,
        };

        outcome.map_err(|_| LlmError::Timeout(limit))?
    }
}

/// Resolves once the flag is set. A sender dropped without setting it
/// never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let set = rx.wait_for(|flag| *flag).await.is_ok();
    if !set {
        std::future::pending::<()>().await;
    }
}

fn is_termination(reply: &str) -> bool {
    reply.trim().ends_with("TERMINATE") || reply.contains("exitcode")
}
