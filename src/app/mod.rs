pub mod config;
pub mod state;

pub use config::AppConfig;
pub use state::{ApiKey, AppEvent, Notice, Session, SessionSettings, SessionSummary, TurnCost};
