//! Deterministic stand-in payloads, served when a stage has no script.

use crate::domain::model::{
    ExtraFields, ModelMetrics, PredictionPoint, PredictionRequest, PredictionResult,
    PreprocessReport, ResultSource, RouteParams, RouteStop, RouteSummary, TrainingReport,
};
use crate::utils::error::{DashboardError, Result};
use chrono::Datelike;

pub const MODEL_VERSION: &str = "LightGBM_v1.2";
pub const DEFAULT_FEATURES: [&str; 4] = ["sell_price", "weekday", "month", "year"];
pub const DEFAULT_STORE: &str = "CA_1";
pub const DEFAULT_CATEGORY: &str = "HOBBIES";

pub const EMISSION_FACTOR_KG_PER_KM: f64 = 0.27;
pub const AVERAGE_SPEED_KMH: f64 = 55.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

struct CatalogueStore {
    name: &'static str,
    state: &'static str,
    latitude: f64,
    longitude: f64,
    demand: f64,
}

static STORE_CATALOGUE: [CatalogueStore; 10] = [
    CatalogueStore { name: "CA_1", state: "CA", latitude: 34.0522, longitude: -118.2437, demand: 42.0 },
    CatalogueStore { name: "CA_2", state: "CA", latitude: 32.7157, longitude: -117.1611, demand: 35.5 },
    CatalogueStore { name: "CA_3", state: "CA", latitude: 37.7749, longitude: -122.4194, demand: 38.2 },
    CatalogueStore { name: "CA_4", state: "CA", latitude: 38.5816, longitude: -121.4944, demand: 21.7 },
    CatalogueStore { name: "TX_1", state: "TX", latitude: 29.7604, longitude: -95.3698, demand: 30.4 },
    CatalogueStore { name: "TX_2", state: "TX", latitude: 32.7767, longitude: -96.7970, demand: 27.9 },
    CatalogueStore { name: "TX_3", state: "TX", latitude: 30.2672, longitude: -97.7431, demand: 24.1 },
    CatalogueStore { name: "WI_1", state: "WI", latitude: 43.0389, longitude: -87.9065, demand: 18.6 },
    CatalogueStore { name: "WI_2", state: "WI", latitude: 43.0731, longitude: -89.4012, demand: 22.3 },
    CatalogueStore { name: "WI_3", state: "WI", latitude: 44.5133, longitude: -88.0133, demand: 15.2 },
];

fn category_multiplier(category: &str) -> f64 {
    match category {
        "HOBBIES" => 1.2,
        "HOUSEHOLD" => 0.9,
        "FOODS" => 1.5,
        "ELECTRONICS" => 0.8,
        "CLOTHING" => 1.1,
        "SPORTS" => 1.0,
        _ => 1.0,
    }
}

fn store_multiplier(store: &str) -> f64 {
    match store {
        "CA_1" => 1.3,
        "CA_2" => 1.1,
        "CA_3" => 0.9,
        "TX_1" => 1.2,
        "TX_2" => 1.0,
        "TX_3" => 0.8,
        "WI_1" => 0.9,
        "WI_2" => 1.1,
        "WI_3" => 1.0,
        _ => 1.0,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn default_features() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect()
}

/// One point per day of the request window.
pub fn mock_predictions(request: &PredictionRequest) -> Result<PredictionResult> {
    let (start, end) = request.window()?;
    let store = request.store().unwrap_or(DEFAULT_STORE);
    let category = request.category().unwrap_or(DEFAULT_CATEGORY);
    let multiplier = category_multiplier(category) * store_multiplier(store);

    let predictions: Vec<PredictionPoint> = start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            let weekday = f64::from(date.weekday().num_days_from_monday());
            let base = 180.0 + 22.0 * weekday + 6.0 * f64::from(date.month());
            let confidence = 0.85 + (f64::from(date.ordinal() % 5) - 2.0) * 0.02;

            PredictionPoint {
                date: date.format("%Y-%m-%d").to_string(),
                store_id: store.to_string(),
                cat_id: category.to_string(),
                prediction: (base * multiplier).max(0.0).round(),
                confidence: round_to(confidence.clamp(0.7, 0.95), 3),
            }
        })
        .collect();

    Ok(PredictionResult {
        status: "success".to_string(),
        message: "Predictions generated successfully (using mock data)".to_string(),
        total_predictions: predictions.len(),
        predictions,
        prediction_period: format!("{} to {}", start, end),
        model_version: MODEL_VERSION.to_string(),
        features_used: default_features(),
        source: ResultSource::Mock,
        extra: ExtraFields::new(),
    })
}

pub fn mock_training_report() -> TrainingReport {
    TrainingReport {
        status: "success".to_string(),
        message: "Model trained successfully (using mock data)".to_string(),
        metrics: ModelMetrics {
            rmse: 2.143,
            mae: 1.587,
            r2: 0.871,
            mape: Some(12.4),
        },
        training_time_seconds: 45.2,
        model_version: MODEL_VERSION.to_string(),
        features_used: default_features(),
        source: ResultSource::Mock,
        extra: ExtraFields::new(),
    }
}

pub fn mock_preprocess_report() -> PreprocessReport {
    PreprocessReport {
        status: "success".to_string(),
        message: "Data preprocessed successfully (using mock data)".to_string(),
        rows_processed: 100_000,
        stores: STORE_CATALOGUE.len() as u32,
        categories: 3,
        date_range: "2011-01-29 to 2016-06-19".to_string(),
        output_file: Some("data/processed/m5_preprocessed_sample.csv".to_string()),
        source: ResultSource::Mock,
        extra: ExtraFields::new(),
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

fn state_demand(state: &str) -> f64 {
    STORE_CATALOGUE
        .iter()
        .filter(|s| s.state == state)
        .map(|s| s.demand)
        .sum()
}

/// Keeps the stores of every state whose aggregated demand exceeds the
/// threshold and visits the first `top_stores` of them in catalogue order.
pub fn mock_route(params: &RouteParams) -> Result<RouteSummary> {
    let eligible: Vec<&CatalogueStore> = STORE_CATALOGUE
        .iter()
        .filter(|s| state_demand(s.state) > params.demand_threshold)
        .collect();

    if eligible.is_empty() {
        return Err(DashboardError::NoStoresSelected {
            threshold: params.demand_threshold,
        });
    }

    let selected = &eligible[..eligible.len().min(params.top_stores as usize)];

    let mut stops = Vec::with_capacity(selected.len());
    let mut total_distance = 0.0;
    let mut previous: Option<&CatalogueStore> = None;
    for (idx, store) in selected.iter().copied().enumerate() {
        let leg = previous
            .map(|p| haversine_km(p.latitude, p.longitude, store.latitude, store.longitude))
            .unwrap_or(0.0);
        total_distance += leg;
        stops.push(RouteStop {
            order: idx as u32 + 1,
            store: store.name.to_string(),
            state: store.state.to_string(),
            latitude: store.latitude,
            longitude: store.longitude,
            demand: store.demand,
            leg_distance: round_to(leg, 1),
        });
        previous = Some(store);
    }

    let eligible_demand: f64 = eligible.iter().map(|s| s.demand).sum();
    let served_demand: f64 = selected.iter().map(|s| s.demand).sum();

    Ok(RouteSummary {
        status: "success".to_string(),
        message: format!("Route optimized for {} stores (using mock data)", stops.len()),
        total_distance: round_to(total_distance, 1),
        total_time: round_to(total_distance / AVERAGE_SPEED_KMH, 2),
        co2_emissions: round_to(total_distance * EMISSION_FACTOR_KG_PER_KM, 1),
        efficiency: round_to(served_demand / eligible_demand * 100.0, 1),
        stops,
        demand_threshold: params.demand_threshold,
        top_stores: params.top_stores,
        map_html: None,
        source: ResultSource::Mock,
        extra: ExtraFields::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(demand_threshold: f64, top_stores: u32) -> RouteParams {
        RouteParams {
            demand_threshold,
            top_stores,
        }
    }

    #[test]
    fn test_default_prediction_week() {
        let result = mock_predictions(&PredictionRequest::default()).unwrap();

        assert_eq!(result.total_predictions, 7);
        assert_eq!(result.predictions.len(), 7);
        assert_eq!(result.prediction_period, "2024-01-01 to 2024-01-07");
        assert_eq!(result.predictions[0].date, "2024-01-01");
        assert_eq!(result.predictions[6].date, "2024-01-07");
        assert!(result.predictions.iter().all(|p| p.store_id == "CA_1" && p.cat_id == "HOBBIES"));
        assert!(result
            .predictions
            .iter()
            .all(|p| (0.7..=0.95).contains(&p.confidence)));
        assert_eq!(result.source, ResultSource::Mock);
    }

    #[test]
    fn test_multipliers_scale_predictions() {
        let foods = PredictionRequest {
            category: Some("FOODS".to_string()),
            store: Some("TX_3".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
        };
        let unknown = PredictionRequest {
            category: Some("GARDEN".to_string()),
            store: Some("NY_9".to_string()),
            ..foods.clone()
        };

        let foods = mock_predictions(&foods).unwrap();
        let unknown = mock_predictions(&unknown).unwrap();

        // 2024-01-01 is a Monday in January: base 186.
        assert_eq!(unknown.predictions[0].prediction, 186.0);
        assert_eq!(foods.predictions[0].prediction, (186.0_f64 * 1.5 * 0.8).round());
        assert_eq!(foods.predictions[0].store_id, "TX_3");
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let request = PredictionRequest {
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            mock_predictions(&request),
            Err(DashboardError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_haversine_known_distance() {
        // Los Angeles to San Diego is roughly 179 km.
        let km = haversine_km(34.0522, -118.2437, 32.7157, -117.1611);
        assert!((km - 179.0).abs() < 3.0, "got {}", km);
        assert_eq!(haversine_km(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_route_selects_top_stores() {
        let summary = mock_route(&params(10.0, 3)).unwrap();

        let names: Vec<&str> = summary.stops.iter().map(|s| s.store.as_str()).collect();
        assert_eq!(names, vec!["CA_1", "CA_2", "CA_3"]);
        assert_eq!(summary.stops[0].leg_distance, 0.0);
        assert!(summary.total_distance > 0.0);
        assert!((summary.co2_emissions - summary.total_distance * EMISSION_FACTOR_KG_PER_KM).abs() < 0.1);
        assert!(summary.efficiency > 0.0 && summary.efficiency < 100.0);
        assert!(summary.map_html.is_none());
    }

    #[test]
    fn test_route_threshold_filters_states() {
        // CA aggregates 137.4, TX 82.4, WI 56.1.
        let summary = mock_route(&params(100.0, 50)).unwrap();
        assert!(summary.stops.iter().all(|s| s.state == "CA"));
        assert_eq!(summary.stops.len(), 4);
        assert_eq!(summary.efficiency, 100.0);

        let err = mock_route(&params(500.0, 5)).unwrap_err();
        assert!(matches!(err, DashboardError::NoStoresSelected { .. }));
    }
}
