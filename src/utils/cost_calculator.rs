// ABOUTME: cost_calculator holds the versioned per-model pricing table
// Prices each completed turn from the token counts the provider reports

use crate::utils::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Version of the built-in pricing table
pub const BUILTIN_PRICING_VERSION: u32 = 1;

/// Model pricing information in USD per token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
}

impl ModelPricing {
    /// Create pricing from cost per million tokens (common format)
    pub fn from_million_tokens(input_cost_per_million: f64, output_cost_per_million: f64) -> Self {
        Self {
            input_cost_per_token: input_cost_per_million / 1_000_000.0,
            output_cost_per_token: output_cost_per_million / 1_000_000.0,
        }
    }

    fn is_valid(&self) -> bool {
        [self.input_cost_per_token, self.output_cost_per_token]
            .iter()
            .all(|p| p.is_finite() && *p >= 0.0)
    }
}

/// Token counts reported by the provider for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// On-disk layout: prices per million tokens, keyed by model id
#[derive(Debug, Deserialize)]
struct PricingFile {
    version: u32,
    models: BTreeMap<String, PricingFileEntry>,
}

#[derive(Debug, Deserialize)]
struct PricingFileEntry {
    input_per_million: f64,
    output_per_million: f64,
}

/// Versioned pricing table, read-only after load
#[derive(Debug, Clone)]
pub struct CostCalculator {
    version: u32,
    pricing_data: BTreeMap<String, ModelPricing>,
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CostCalculator {
    /// Create a new cost calculator with the built-in pricing
    pub fn new() -> Self {
        let mut pricing_data = BTreeMap::new();

        pricing_data.insert(
            "gpt-3.5-turbo".to_string(),
            ModelPricing::from_million_tokens(0.5, 1.5),
        );
        pricing_data.insert(
            "gpt-4o".to_string(),
            ModelPricing::from_million_tokens(5.0, 15.0),
        );
        pricing_data.insert(
            "gpt-4o-mini".to_string(),
            ModelPricing::from_million_tokens(0.15, 0.6),
        );

        // Reasoning models
        pricing_data.insert(
            "o1-mini".to_string(),
            ModelPricing::from_million_tokens(3.0, 12.0),
        );
        pricing_data.insert(
            "o1-preview".to_string(),
            ModelPricing::from_million_tokens(15.0, 60.0),
        );

        Self {
            version: BUILTIN_PRICING_VERSION,
            pricing_data,
        }
    }

    pub fn with_models(version: u32, pricing_data: BTreeMap<String, ModelPricing>) -> Self {
        Self {
            version,
            pricing_data,
        }
    }

    /// Load a pricing table from a TOML or JSON file (chosen by extension)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let file: PricingFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        let pricing_data = file
            .models
            .into_iter()
            .map(|(model, entry)| {
                let pricing =
                    ModelPricing::from_million_tokens(entry.input_per_million, entry.output_per_million);
                (model, pricing)
            })
            .collect();

        tracing::debug!(path = %path.display(), version = file.version, "Loaded pricing table");

        Ok(Self {
            version: file.version,
            pricing_data,
        })
    }

    /// Check the table is usable for the given selectable models
    pub fn validate(&self, selectable: &[String]) -> Result<()> {
        if self.version == 0 {
            return Err(ChatError::Config(
                "pricing table version must be at least 1".to_string(),
            ));
        }

        if let Some((model, _)) = self.pricing_data.iter().find(|(_, p)| !p.is_valid()) {
            return Err(ChatError::Config(format!(
                "pricing for '{}' must be finite and non-negative",
                model
            )));
        }

        let missing: Vec<&str> = selectable
            .iter()
            .filter(|m| !self.pricing_data.contains_key(m.as_str()))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(ChatError::Config(format!(
                "pricing table v{} has no entry for: {}",
                self.version,
                missing.join(", ")
            )));
        }

        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn contains(&self, model: &str) -> bool {
        self.pricing_data.contains_key(model)
    }

    pub fn get_model_pricing(&self, model: &str) -> Result<ModelPricing> {
        self.pricing_data
            .get(model)
            .copied()
            .ok_or_else(|| ChatError::UnknownModel(model.to_string()))
    }

    /// Cost of one completion: input * input price + output * output price
    pub fn calculate_cost(&self, tokens: &TokenUsage, model: &str) -> Result<f64> {
        let pricing = self.get_model_pricing(model)?;
        Ok(tokens.input_tokens as f64 * pricing.input_cost_per_token
            + tokens.output_tokens as f64 * pricing.output_cost_per_token)
    }

    /// Get all available model names
    pub fn available_models(&self) -> Vec<String> {
        self.pricing_data.keys().cloned().collect()
    }

    /// Format cost as USD string
    pub fn format_cost(cost: f64) -> String {
        format!("${:.6}", cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn usage(input_tokens: u64, output_tokens: u64) -> TokenUsage {
        TokenUsage {
            input_tokens,
            output_tokens,
        }
    }

    #[test]
    fn test_cost_calculation_gpt4o() {
        let calculator = CostCalculator::new();
        let cost = calculator.calculate_cost(&usage(10, 1), "gpt-4o").unwrap();

        // Expected: (10 * 5/1M) + (1 * 15/1M) = 0.00005 + 0.000015
        assert!((cost - 0.000065).abs() < 1e-12);
        assert_eq!(CostCalculator::format_cost(cost), "$0.000065");
    }

    #[test]
    fn test_cost_calculation_o1_preview() {
        let calculator = CostCalculator::new();
        let cost = calculator
            .calculate_cost(&usage(1_000_000, 1_000_000), "o1-preview")
            .unwrap();

        assert!((cost - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_matches_formula_for_every_model() {
        let calculator = CostCalculator::new();
        let samples = [(0, 0), (1, 0), (0, 1), (1234, 567), (250_000, 4_000)];

        for model in calculator.available_models() {
            let pricing = calculator.get_model_pricing(&model).unwrap();
            for (i, o) in samples {
                let cost = calculator.calculate_cost(&usage(i, o), &model).unwrap();
                let expected = i as f64 * pricing.input_cost_per_token
                    + o as f64 * pricing.output_cost_per_token;
                assert!((cost - expected).abs() < 1e-12, "{} {} {}", model, i, o);
            }
        }
    }

    #[test]
    fn test_unknown_model_fails() {
        let calculator = CostCalculator::new();
        let result = calculator.calculate_cost(&usage(10, 10), "gpt-5-ultra");
        assert!(matches!(result, Err(ChatError::UnknownModel(m)) if m == "gpt-5-ultra"));
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(CostCalculator::format_cost(0.0), "$0.000000");
        assert_eq!(CostCalculator::format_cost(1.5), "$1.500000");
        assert_eq!(CostCalculator::format_cost(0.0000004), "$0.000000");
    }

    #[test]
    fn test_available_models_sorted() {
        let models = CostCalculator::new().available_models();
        assert_eq!(
            models,
            vec!["gpt-3.5-turbo", "gpt-4o", "gpt-4o-mini", "o1-mini", "o1-preview"]
        );
    }

    #[test]
    fn test_validate_missing_model() {
        let calculator = CostCalculator::new();
        let err = calculator
            .validate(&["gpt-4o".to_string(), "gpt-4-turbo".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("gpt-4-turbo"));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut models = BTreeMap::new();
        models.insert("cheap".to_string(), ModelPricing::from_million_tokens(-1.0, 1.0));
        let calculator = CostCalculator::with_models(1, models);
        assert!(matches!(
            calculator.validate(&["cheap".to_string()]),
            Err(ChatError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
version = 3

[models."gpt-4o"]
input_per_million = 2.5
output_per_million = 10.0
"#
        )
        .unwrap();

        let calculator = CostCalculator::load_from_file(file.path()).unwrap();
        assert_eq!(calculator.version(), 3);
        assert!(calculator.validate(&["gpt-4o".to_string()]).is_ok());

        let cost = calculator.calculate_cost(&usage(1_000_000, 0), "gpt-4o").unwrap();
        assert!((cost - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"version": 0, "models": {{"o1-mini": {{"input_per_million": 3.0, "output_per_million": 12.0}}}}}}"#
        )
        .unwrap();

        let calculator = CostCalculator::load_from_file(file.path()).unwrap();
        assert!(calculator.contains("o1-mini"));
        // Version 0 loads but does not validate
        assert!(calculator.validate(&[]).is_err());
    }
}
