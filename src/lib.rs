// ABOUTME: Main library module that exports the public API
// Central module for the token-chat terminal client

pub mod app;
pub mod chat;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use app::{AppConfig, AppEvent, Session, SessionSettings, TurnCost};
pub use chat::{CompletionClient, OpenAiClient, SessionController, Transcript};
pub use utils::{ChatError, CostCalculator, Result};
