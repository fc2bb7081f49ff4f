// ABOUTME: Session-scoped chat context with explicit start and end
// Owns the credential, model choice, transcript and per-turn costs

use chrono::{DateTime, Local};

use super::config::AppConfig;
use crate::chat::transcript::Transcript;
use crate::utils::cost_calculator::{CostCalculator, TokenUsage};
use crate::utils::error::ChatError;

/// Provider API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns None for empty or whitespace-only input
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Bullets with the last four characters visible for long keys
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            "•".repeat(chars.len())
        } else {
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}{}", "•".repeat(chars.len() - 4), tail)
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub api_key: Option<ApiKey>,
    pub selected_model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    pub greeting: Option<String>,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.as_deref().and_then(ApiKey::parse),
            selected_model: config.default_model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            greeting: config.greeting.clone(),
        }
    }
}

/// Cost of one completed turn, fixed at the time it was computed
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCost {
    pub model: String,
    pub usage: TokenUsage,
    pub cost: f64,
    pub at: DateTime<Local>,
    /// Transcript index of the assistant reply this cost belongs to
    pub message_index: usize,
}

impl TurnCost {
    pub fn formatted(&self) -> String {
        CostCalculator::format_cost(self.cost)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }
}

impl From<&ChatError> for Notice {
    fn from(err: &ChatError) -> Self {
        match err {
            ChatError::MissingCredential => Notice::Info(err.to_string()),
            _ => Notice::Error(err.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub settings: SessionSettings,
    pub transcript: Transcript,
    pub costs: Vec<TurnCost>,
    pub notice: Option<Notice>,
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub turns: usize,
    pub messages: usize,
    pub total_cost: f64,
    pub duration: chrono::Duration,
}

impl Session {
    pub fn start(settings: SessionSettings) -> Self {
        let transcript =
            Transcript::seeded(settings.system_prompt.as_deref(), settings.greeting.as_deref());

        tracing::debug!(model = %settings.selected_model, "Session started");

        Self {
            settings,
            transcript,
            costs: Vec::new(),
            notice: None,
            started_at: Local::now(),
        }
    }

    /// Tear the session down; the transcript is dropped with it
    pub fn end(self) -> SessionSummary {
        let summary = SessionSummary {
            turns: self.costs.len(),
            messages: self.transcript.len(),
            total_cost: self.total_cost(),
            duration: Local::now() - self.started_at,
        };

        tracing::info!(
            turns = summary.turns,
            total_cost = %CostCalculator::format_cost(summary.total_cost),
            "Session ended"
        );

        summary
    }

    pub fn has_api_key(&self) -> bool {
        self.settings.api_key.is_some()
    }

    pub fn selected_model(&self) -> &str {
        &self.settings.selected_model
    }

    pub fn total_cost(&self) -> f64 {
        self.costs.iter().map(|c| c.cost).sum()
    }

    pub fn last_cost(&self) -> Option<&TurnCost> {
        self.costs.last()
    }

    pub fn cost_for_message(&self, index: usize) -> Option<&TurnCost> {
        self.costs.iter().find(|c| c.message_index == index)
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Input(crossterm::event::KeyEvent),
    Resize(u16, u16),
}
