// ABOUTME: Session controller wiring transcript, completion client and pricing
// Handles one submitted prompt per call and records the turn's cost

use crate::app::state::{ApiKey, Notice, Session, SessionSettings, SessionSummary, TurnCost};
use crate::chat::client::{CompletionClient, CompletionRequest};
use crate::chat::transcript::Message;
use crate::utils::cost_calculator::CostCalculator;
use crate::utils::error::{ChatError, Result};
use chrono::Local;
use std::sync::Arc;

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub reply: String,
    pub cost: TurnCost,
}

pub struct SessionController {
    client: Box<dyn CompletionClient>,
    pricing: Arc<CostCalculator>,
    session: Session,
}

impl SessionController {
    pub fn new(
        client: Box<dyn CompletionClient>,
        pricing: Arc<CostCalculator>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            client,
            pricing,
            session: Session::start(settings),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pricing(&self) -> &CostCalculator {
        &self.pricing
    }

    /// Returns false (and clears the key) for blank input
    pub fn set_api_key(&mut self, raw: &str) -> bool {
        self.session.settings.api_key = ApiKey::parse(raw);
        if self.session.has_api_key() {
            if matches!(self.session.notice, Some(Notice::Info(_))) {
                self.session.notice = None;
            }
            true
        } else {
            false
        }
    }

    /// Affects only turns submitted after this call
    pub fn select_model(&mut self, model: &str) -> Result<()> {
        if !self.pricing.contains(model) {
            return Err(ChatError::UnknownModel(model.to_string()));
        }
        if self.session.settings.selected_model != model {
            tracing::debug!(from = %self.session.settings.selected_model, to = %model, "Model changed");
            self.session.settings.selected_model = model.to_string();
        }
        Ok(())
    }

    /// End the current session and start a fresh one with the same settings
    pub fn reset(&mut self) -> SessionSummary {
        let settings = self.session.settings.clone();
        let previous = std::mem::replace(&mut self.session, Session::start(settings));
        previous.end()
    }

    pub fn end(self) -> SessionSummary {
        self.session.end()
    }

    /// Handle one user submission.
    ///
    /// Blank input is ignored (`Ok(None)`). On any error the transcript is
    /// left as it was and the error is also stored as the session notice.
    pub async fn on_submit(&mut self, text: &str) -> Result<Option<TurnReport>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        self.session.notice = None;

        match self.run_turn(text).await {
            Ok(report) => Ok(Some(report)),
            Err(err) => {
                if err.is_rejection() {
                    tracing::info!(error = %err, "Turn rejected");
                } else {
                    tracing::warn!(error = %err, "Turn failed");
                }
                self.session.notice = Some(Notice::from(&err));
                Err(err)
            }
        }
    }

    async fn run_turn(&mut self, text: &str) -> Result<TurnReport> {
        let api_key = self
            .session
            .settings
            .api_key
            .clone()
            .ok_or(ChatError::MissingCredential)?;

        let model = self.session.settings.selected_model.clone();
        if !self.pricing.contains(&model) {
            return Err(ChatError::UnknownModel(model));
        }

        let user = Message::user(text);
        let request = CompletionRequest {
            model: model.clone(),
            messages: self.session.transcript.with_pending(&user),
            max_tokens: self.session.settings.max_tokens,
        };

        let completion = self.client.complete(api_key.expose(), &request).await?;
        let cost = self.pricing.calculate_cost(&completion.usage, &model)?;

        let message_index = self
            .session
            .transcript
            .append_exchange(user, Message::assistant(completion.content.clone()));

        let turn = TurnCost {
            model,
            usage: completion.usage,
            cost,
            at: Local::now(),
            message_index,
        };
        self.session.costs.push(turn.clone());

        tracing::info!(
            model = %turn.model,
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            cost = %turn.formatted(),
            "Turn completed"
        );

        Ok(TurnReport {
            reply: completion.content,
            cost: turn,
        })
    }
}
