//! Token-based cost calculation
//!
//! Prices are USD per 1000 tokens, matched by model-name prefix.

/// Price tier for one model family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    pub prefix: &'static str,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Known model prices. The first entry in declared order whose prefix
/// matches wins, so `gpt-4` also covers `gpt-4o` and `gpt-4-turbo` variants.
pub const PRICING: &[ModelPrice] = &[
    ModelPrice { prefix: "gpt-4", input_per_1k: 0.03, output_per_1k: 0.06 },
    ModelPrice { prefix: "gpt-4-turbo", input_per_1k: 0.01, output_per_1k: 0.03 },
    ModelPrice { prefix: "gpt-4o", input_per_1k: 0.0025, output_per_1k: 0.01 },
    ModelPrice { prefix: "gpt-3.5-turbo", input_per_1k: 0.0005, output_per_1k: 0.0015 },
    ModelPrice { prefix: "gpt-4-32k", input_per_1k: 0.06, output_per_1k: 0.12 },
];

/// Tier used for models missing from [`PRICING`]; same as its first entry
pub const DEFAULT_PRICE: ModelPrice = PRICING[0];

/// Look up the price tier for a model
pub fn price_for(model: &str) -> ModelPrice {
    PRICING
        .iter()
        .find(|price| model.starts_with(price.prefix))
        .copied()
        .unwrap_or(DEFAULT_PRICE)
}

/// Cost in USD of one call, rounded to 6 decimal places
pub fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let price = price_for(model);
    let input_cost = f64::from(input_tokens) / 1000.0 * price.input_per_1k;
    let output_cost = f64::from(output_tokens) / 1000.0 * price.output_per_1k;
    round_to_micros(input_cost + output_cost)
}

fn round_to_micros(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_known_models() {
        assert_close(calculate_cost("gpt-4", 1000, 1000), 0.09);
        assert_close(calculate_cost("gpt-3.5-turbo-0125", 2000, 1000), 0.0025);
        assert_close(calculate_cost("gpt-4o", 1000, 1000), 0.09);
        assert_close(calculate_cost("gpt-4-turbo", 1000, 1000), 0.09);
    }

    #[test]
    fn test_declared_order_decides_between_prefixes() {
        assert_eq!(price_for("gpt-4o-mini").prefix, "gpt-4");
        assert_eq!(price_for("gpt-4-turbo-preview").prefix, "gpt-4");
        assert_eq!(price_for("gpt-4-32k-0613").prefix, "gpt-4");
        assert_eq!(price_for("gpt-3.5-turbo").prefix, "gpt-3.5-turbo");
    }

    #[test]
    fn test_unknown_model_uses_default_tier() {
        assert_eq!(price_for("custom-model"), DEFAULT_PRICE);
        assert_eq!(DEFAULT_PRICE, PRICING[0]);
        assert_close(calculate_cost("custom-model", 1000, 500), 0.06);
        assert_eq!(
            calculate_cost("custom-model", 1000, 500),
            calculate_cost("custom-model", 1000, 500)
        );
    }

    #[test]
    fn test_rounding_to_six_places() {
        assert_close(calculate_cost("gpt-4", 1, 1), 0.00009);
        assert_close(calculate_cost("gpt-4", 1234, 567), 0.07104);
        assert_close(calculate_cost("gpt-4", 0, 0), 0.0);
    }
}
