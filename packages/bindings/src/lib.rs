use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

/// Single-range return by calculator name (`TrueTwrCalculator`, `MwrCalculator`, ...).
#[napi]
pub fn calculate_return(input_json: String) -> NapiResult<String> {
    let input: investperf_core::input::CalcInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = investperf_core::input::run_calculation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn annualize_return(input_json: String) -> NapiResult<String> {
    let input: investperf_core::input::AnnualizeInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = investperf_core::input::run_annualization(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_performance(input_json: String) -> NapiResult<String> {
    let input: investperf_core::input::AnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = investperf_core::input::run_analysis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
