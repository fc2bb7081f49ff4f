pub mod client;
pub mod controller;
pub mod transcript;

pub use client::{Completion, CompletionClient, CompletionRequest, OpenAiClient};
pub use controller::{SessionController, TurnReport};
pub use transcript::{Message, Role, Transcript};
