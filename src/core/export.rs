use crate::config::AppConfig;
use crate::core::mock;
use crate::domain::model::{PredictionPoint, PredictionRequest, RouteRequest, RouteStop};
use crate::utils::error::{DashboardError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

pub const PREDICTIONS_FILENAME: &str = "predictions.csv";
pub const ROUTES_FILENAME: &str = "routes.csv";

#[derive(Debug, Serialize)]
struct RouteRow<'a> {
    order: u32,
    store: &'a str,
    state: &'a str,
    latitude: f64,
    longitude: f64,
    demand: f64,
    leg_distance_km: f64,
    leg_co2_kg: f64,
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| DashboardError::IoError(e.into_error()))
}

pub fn render_predictions_csv(points: &[PredictionPoint]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if points.is_empty() {
        writer.write_record(["date", "store_id", "cat_id", "prediction", "confidence"])?;
    }
    for point in points {
        writer.serialize(point)?;
    }
    finish_csv(writer)
}

pub fn render_routes_csv(stops: &[RouteStop]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if stops.is_empty() {
        writer.write_record([
            "order",
            "store",
            "state",
            "latitude",
            "longitude",
            "demand",
            "leg_distance_km",
            "leg_co2_kg",
        ])?;
    }
    for stop in stops {
        writer.serialize(RouteRow {
            order: stop.order,
            store: &stop.store,
            state: &stop.state,
            latitude: stop.latitude,
            longitude: stop.longitude,
            demand: stop.demand,
            leg_distance_km: stop.leg_distance,
            leg_co2_kg: (stop.leg_distance * mock::EMISSION_FACTOR_KG_PER_KM * 10.0).round() / 10.0,
        })?;
    }
    finish_csv(writer)
}

/// Serves the file verbatim when it exists, `None` otherwise.
async fn read_if_present(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !tokio::fs::try_exists(path).await? {
        tracing::debug!("Export source {} missing, using mock rows", path.display());
        return Ok(None);
    }
    Ok(Some(tokio::fs::read(path).await?))
}

pub async fn predictions_csv(config: &AppConfig) -> Result<Vec<u8>> {
    if let Some(bytes) = read_if_present(config.data.predictions_csv.as_deref()).await? {
        return Ok(bytes);
    }
    let result = mock::mock_predictions(&PredictionRequest::default())?;
    render_predictions_csv(&result.predictions)
}

pub async fn routes_csv(config: &AppConfig) -> Result<Vec<u8>> {
    if let Some(bytes) = read_if_present(config.data.routes_csv.as_deref()).await? {
        return Ok(bytes);
    }
    let params = RouteRequest::default().resolve(&config.defaults)?;
    let summary = mock::mock_route(&params)?;
    render_routes_csv(&summary.stops)
}

pub async fn bundle_zip(config: &AppConfig) -> Result<Vec<u8>> {
    let predictions = predictions_csv(config).await?;
    let routes = routes_csv(config).await?;

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>(PREDICTIONS_FILENAME, FileOptions::default())?;
    zip.write_all(&predictions)?;

    zip.start_file::<_, ()>(ROUTES_FILENAME, FileOptions::default())?;
    zip.write_all(&routes)?;

    let cursor = zip.finish()?;
    tracing::debug!("Built export bundle with 2 files");
    Ok(cursor.into_inner())
}
