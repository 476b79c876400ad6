use crate::config::toml_config::{DefaultsConfig, MAX_TOP_STORES};
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ExtraFields = Map<String, Value>;

/// Where a stage payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    #[default]
    Script,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preprocess,
    Train,
    Predict,
    Route,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Preprocess, Stage::Train, Stage::Predict, Stage::Route];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Train => "train",
            Stage::Predict => "predict",
            Stage::Route => "route",
        }
    }
}

fn default_status() -> String {
    "success".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionRequest {
    pub category: Option<String>,
    pub store: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: String,
    pub store_id: String,
    pub cat_id: String,
    pub prediction: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub predictions: Vec<PredictionPoint>,
    #[serde(default)]
    pub total_predictions: usize,
    #[serde(default)]
    pub prediction_period: String,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub features_used: Vec<String>,
    #[serde(default)]
    pub source: ResultSource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mape: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metrics: ModelMetrics,
    #[serde(default)]
    pub training_time_seconds: f64,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub features_used: Vec<String>,
    #[serde(default)]
    pub source: ResultSource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessReport {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub rows_processed: u64,
    #[serde(default)]
    pub stores: u32,
    #[serde(default)]
    pub categories: u32,
    #[serde(default)]
    pub date_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default)]
    pub source: ResultSource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRequest {
    pub demand_threshold: Option<f64>,
    pub top_stores: Option<u32>,
    pub include_map: bool,
}

/// Route request with configuration defaults filled in; this is what the
/// route script receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteParams {
    pub demand_threshold: f64,
    pub top_stores: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub order: u32,
    pub store: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub demand: f64,
    /// Kilometres from the previous stop; zero for the first.
    #[serde(default)]
    pub leg_distance: f64,
}

/// Distances in km, time in hours, emissions in kg, efficiency in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub total_distance: f64,
    #[serde(default)]
    pub total_time: f64,
    #[serde(default)]
    pub co2_emissions: f64,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub stops: Vec<RouteStop>,
    #[serde(default)]
    pub demand_threshold: f64,
    #[serde(default)]
    pub top_stores: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_html: Option<String>,
    #[serde(default)]
    pub source: ResultSource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageInfo {
    pub step: u32,
    pub id: &'static str,
    pub title: &'static str,
    pub method: &'static str,
    pub endpoint: &'static str,
    /// Whether a script backs this stage; `None` for stages with no script concept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripted: Option<bool>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Longest accepted prediction window, in days (inclusive).
pub const MAX_PREDICTION_DAYS: i64 = 366;
pub const DEFAULT_START_DATE: &str = "2024-01-01";
pub const DEFAULT_END_DATE: &str = "2024-01-07";

impl PredictionRequest {
    pub fn category(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn store(&self) -> Option<&str> {
        non_blank(&self.store)
    }

    /// Inclusive date window. Falls back to the default week unless both
    /// dates are given.
    pub fn window(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = non_blank(&self.start_date)
            .map(|d| validation::parse_request_date("start_date", d))
            .transpose()?;
        let end = non_blank(&self.end_date)
            .map(|d| validation::parse_request_date("end_date", d))
            .transpose()?;

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => (
                validation::parse_request_date("start_date", DEFAULT_START_DATE)?,
                validation::parse_request_date("end_date", DEFAULT_END_DATE)?,
            ),
        };

        if start > end {
            return Err(DashboardError::validation(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }
        let days = (end - start).num_days() + 1;
        if days > MAX_PREDICTION_DAYS {
            return Err(DashboardError::validation(format!(
                "prediction window spans {} days, the maximum is {}",
                days, MAX_PREDICTION_DAYS
            )));
        }

        Ok((start, end))
    }
}

impl Validate for PredictionRequest {
    fn validate(&self) -> Result<()> {
        self.window().map(|_| ())
    }
}

impl RouteRequest {
    pub fn resolve(&self, defaults: &DefaultsConfig) -> Result<RouteParams> {
        let params = RouteParams {
            demand_threshold: self.demand_threshold.unwrap_or(defaults.demand_threshold),
            top_stores: self.top_stores.unwrap_or(defaults.top_stores),
        };
        params.validate()?;
        Ok(params)
    }
}

impl Validate for RouteParams {
    fn validate(&self) -> Result<()> {
        if !self.demand_threshold.is_finite() || self.demand_threshold < 0.0 {
            return Err(DashboardError::validation(format!(
                "demand_threshold must be a non-negative number (got {})",
                self.demand_threshold
            )));
        }
        if self.top_stores == 0 || self.top_stores > MAX_TOP_STORES {
            return Err(DashboardError::validation(format!(
                "top_stores must be between 1 and {} (got {})",
                MAX_TOP_STORES, self.top_stores
            )));
        }
        Ok(())
    }
}
