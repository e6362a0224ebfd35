//! Per-model token pricing.
//!
//! Grounded on `original_source/crawler_engine/ai/cost_tracker.py`'s
//! `model_pricing` table: USD per 1K tokens, with an optional flat
//! per-image surcharge for vision models.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub per_image: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PricingTable {
    entries: HashMap<String, ModelPricing>,
    default_model: String,
}

impl PricingTable {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            default_model: default_model.into(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.entries.insert(model.into(), pricing);
        self
    }

    pub fn set_model(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.entries.insert(model.into(), pricing);
    }

    fn pricing_for(&self, model: &str) -> Option<&ModelPricing> {
        self.entries.get(model)
    }

    /// Used by `estimate`: split pricing when both token counts
    /// are known, else a blended average over the total. Falls back to
    /// the default model's pricing for an unknown model, logging once.
    pub fn estimate(
        &self,
        model: &str,
        tokens: u64,
        has_image: bool,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    ) -> f64 {
        let pricing = match self.pricing_for(model) {
            Some(p) => p,
            None => {
                tracing::warn!(model, default = %self.default_model, "unknown model, using default pricing");
                match self.pricing_for(&self.default_model) {
                    Some(p) => p,
                    None => return 0.0,
                }
            }
        };

        let mut cost = match (input_tokens, output_tokens) {
            (Some(i), Some(o)) => {
                (i as f64 / 1000.0) * pricing.input_per_1k + (o as f64 / 1000.0) * pricing.output_per_1k
            }
            _ => {
                let avg = (pricing.input_per_1k + pricing.output_per_1k) / 2.0;
                (tokens as f64 / 1000.0) * avg
            }
        };

        if has_image {
            if let Some(per_image) = pricing.per_image {
                cost += per_image;
            }
        }

        (cost * 1_000_000.0).round() / 1_000_000.0
    }
}

impl Default for PricingTable {
    /// The built-in vision/text model lineup from the original tracker.
    fn default() -> Self {
        Self::new("gpt-4-turbo")
            .with_model(
                "gpt-4-vision-preview",
                ModelPricing {
                    input_per_1k: 0.01,
                    output_per_1k: 0.03,
                    per_image: Some(0.00765),
                },
            )
            .with_model(
                "gpt-4-turbo",
                ModelPricing {
                    input_per_1k: 0.01,
                    output_per_1k: 0.03,
                    per_image: None,
                },
            )
            .with_model(
                "gpt-4",
                ModelPricing {
                    input_per_1k: 0.03,
                    output_per_1k: 0.06,
                    per_image: None,
                },
            )
            .with_model(
                "gpt-3.5-turbo",
                ModelPricing {
                    input_per_1k: 0.0015,
                    output_per_1k: 0.002,
                    per_image: None,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tokens_use_split_pricing() {
        let table = PricingTable::default();
        let cost = table.estimate("gpt-4", 0, false, Some(1000), Some(1000));
        assert!((cost - 0.09).abs() < 1e-9);
    }

    #[test]
    fn blended_average_used_without_split() {
        let table = PricingTable::default();
        let cost = table.estimate("gpt-3.5-turbo", 2000, false, None, None);
        // avg = (0.0015 + 0.002) / 2 = 0.00175; 2 * 0.00175 = 0.0035
        assert!((cost - 0.0035).abs() < 1e-9);
    }

    #[test]
    fn image_surcharge_applied_once() {
        let table = PricingTable::default();
        let with_image = table.estimate("gpt-4-vision-preview", 0, true, Some(100), Some(100));
        let without = table.estimate("gpt-4-vision-preview", 0, false, Some(100), Some(100));
        assert!((with_image - without - 0.00765).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let table = PricingTable::default();
        let unknown = table.estimate("made-up-model", 0, false, Some(1000), Some(1000));
        let default = table.estimate("gpt-4-turbo", 0, false, Some(1000), Some(1000));
        assert_eq!(unknown, default);
    }
}
