use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{PredictionRecord, WeatherSnapshot};

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The nested shape reports battery state of charge in kWh without a
/// capacity; the service's packs are sized at 500 kWh.
pub(crate) const ASSUMED_BATTERY_CAPACITY_KWH: f64 = 500.0;

pub(crate) const BACKEND_UNAVAILABLE: &str =
    "Backend server is unavailable. Please ensure the prediction service is running.";

const SERVER_ERROR_FALLBACK: &str = "Server error occurred";

/// Display is the user-facing text; the variants carry the taxonomy.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    /// Transport could not reach the service (connect failure or timeout).
    #[error("{}", BACKEND_UNAVAILABLE)]
    Unreachable,
    /// Non-2xx answer with whatever the error body said.
    #[error("{0}")]
    Server(String),
    /// Malformed payload or any other failure.
    #[error("{0}")]
    Other(String),
}

/* ----------------------------
   Raw response shapes
---------------------------- */

#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    pub(crate) energy_flow: Option<EnergyFlow>,
    pub(crate) predicted_load: Option<f64>,
    pub(crate) predicted_solar: Option<f64>,
    pub(crate) predicted_wind: Option<f64>,
    pub(crate) solar_used: Option<f64>,
    pub(crate) wind_used: Option<f64>,
    pub(crate) grid_import: Option<f64>,
    pub(crate) grid_export: Option<f64>,
    pub(crate) weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnergyFlow {
    pub(crate) grid_load_demand_kw: Option<f64>,
    pub(crate) solar_pv_output_kw: Option<f64>,
    pub(crate) wind_power_output_kw: Option<f64>,
    pub(crate) grid_import_kw: Option<f64>,
    pub(crate) grid_export_kw: Option<f64>,
    pub(crate) battery_soc_kw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Maps either backend shape onto the canonical record. Which mapping
/// applies is keyed on the presence of the `energy_flow` container; absent
/// fields stay `None`.
pub(crate) fn normalize(raw: RawResponse) -> PredictionRecord {
    match raw.energy_flow {
        Some(flow) => PredictionRecord {
            predicted_load: flow.grid_load_demand_kw,
            predicted_solar: flow.solar_pv_output_kw,
            predicted_wind: flow.wind_power_output_kw,
            // The nested shape does not distinguish used from generated;
            // full utilization is assumed, not computed.
            solar_used: flow.solar_pv_output_kw,
            wind_used: flow.wind_power_output_kw,
            grid_import: flow.grid_import_kw,
            grid_export: flow.grid_export_kw,
            battery_soc_percent: flow
                .battery_soc_kw
                .map(|soc| soc / ASSUMED_BATTERY_CAPACITY_KWH * 100.0),
            weather: raw.weather,
        },
        None => PredictionRecord {
            predicted_load: raw.predicted_load,
            predicted_solar: raw.predicted_solar,
            predicted_wind: raw.predicted_wind,
            solar_used: raw.solar_used,
            wind_used: raw.wind_used,
            grid_import: raw.grid_import,
            grid_export: raw.grid_export,
            battery_soc_percent: None,
            weather: raw.weather,
        },
    }
}

fn server_error_text(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string())
}

fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() || err.is_connect() {
        ApiError::Unreachable
    } else {
        ApiError::Other(err.to_string())
    }
}

/* ----------------------------
   Client
---------------------------- */

#[derive(Clone)]
pub(crate) struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub(crate) fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// One logical request; no retries here, the poll loop is the retry.
    pub(crate) async fn fetch_prediction(
        &self,
        location: &str,
    ) -> Result<PredictionRecord, ApiError> {
        let url = format!("{}/predict", self.base_url);
        debug!(%location, "requesting prediction");

        let resp = self
            .http
            .get(&url)
            .query(&[("location", location)])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server(server_error_text(&body)));
        }

        let raw: RawResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Other(format!("invalid prediction payload: {e}")))?;

        Ok(normalize(raw))
    }
}
