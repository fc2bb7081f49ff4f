pub mod cost_calculator;
pub mod error;

pub use cost_calculator::{CostCalculator, ModelPricing, TokenUsage};
pub use error::{ChatError, Result};
