//! WASM bindings for browser integration.
//!
//! Configurations are passed in the same text format as configuration
//! files; results come back as JSON.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::prelude::*;

use crate::config_file::parse_config;
use crate::evaluator::TrussEvaluator;
use crate::genotype::Genotype;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Genotype length in bits for a configuration.
#[wasm_bindgen]
pub fn genotype_length(config_text: &str) -> Result<usize, JsValue> {
    let parsed = parse_config(config_text).map_err(to_js)?;
    Ok(parsed.config.genotype_len())
}

/// Evaluate one genotype (a `0`/`1` string) against a configuration.
///
/// # Returns
/// JSON object with node positions, loads, per-strut force and length,
/// total cost, the four penalties and the fitness.
#[wasm_bindgen]
pub fn evaluate_genotype_json(config_text: &str, genotype: &str) -> Result<String, JsValue> {
    let parsed = parse_config(config_text).map_err(to_js)?;
    let genotype: Genotype = genotype.parse().map_err(to_js)?;
    let evaluation = TrussEvaluator::new(&parsed.config)
        .try_evaluate(&genotype)
        .map_err(to_js)?;
    evaluation
        .to_json()
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
