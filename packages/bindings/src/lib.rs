use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use hccl_core::concentration::{ConcentrationInput, SecurityRow};
use hccl_core::template::TemplateLayout;
use hccl_core::RuleConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Concentration limits
// ---------------------------------------------------------------------------

#[napi]
pub fn concentration_limit(input_json: String) -> NapiResult<String> {
    let input: ConcentrationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = hccl_core::concentration::calculate_concentration_limits(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct EvaluateSecurityInput {
    row: SecurityRow,
    #[serde(default)]
    config: RuleConfig,
}

#[napi]
pub fn evaluate_security(input_json: String) -> NapiResult<String> {
    let input: EvaluateSecurityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.config.validate().map_err(to_napi_error)?;
    hccl_core::concentration::validate_security(&input.row, &input.config)
        .map_err(to_napi_error)?;
    let output = hccl_core::concentration::evaluate_security(&input.row, &input.config);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_rule_config() -> NapiResult<String> {
    serde_json::to_string(&RuleConfig::default()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Report template
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TemplateCellsInput {
    #[serde(flatten)]
    input: ConcentrationInput,
    #[serde(default)]
    layout: TemplateLayout,
}

#[napi]
pub fn template_cells(input_json: String) -> NapiResult<String> {
    let input: TemplateCellsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = hccl_core::concentration::calculate_concentration_limits(&input.input)
        .map_err(to_napi_error)?;
    let cells = hccl_core::template::template_cells(&output.result.rows, &input.layout)
        .map_err(to_napi_error)?;
    serde_json::to_string(&cells).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Lendable limits
// ---------------------------------------------------------------------------

#[napi]
pub fn lendable_limit(input_json: String) -> NapiResult<String> {
    let input: hccl_core::lendable::LendableLimitInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        hccl_core::lendable::calculate_lendable_limits(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Repo daily position
// ---------------------------------------------------------------------------

#[napi]
pub fn repo_daily_position(input_json: String) -> NapiResult<String> {
    let input: hccl_core::repo::RepoDailyInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        hccl_core::repo::calculate_repo_daily_position(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
