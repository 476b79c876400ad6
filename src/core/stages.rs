use crate::config::{AppConfig, ScriptEntry};
use crate::core::mock;
use crate::domain::model::{
    PredictionRequest, PredictionResult, PreprocessReport, ResultSource, RouteRequest,
    RouteSummary, Stage, StageInfo, TrainingReport,
};
use crate::domain::ports::{ScriptInvocation, ScriptRunner};
use crate::utils::error::{DashboardError, Result};
use crate::utils::validation::Validate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Payloads that record whether a script or the mock generator produced them.
pub trait StagePayload {
    fn set_source(&mut self, source: ResultSource);
}

macro_rules! impl_stage_payload {
    ($($ty:ty),*) => {
        $(impl StagePayload for $ty {
            fn set_source(&mut self, source: ResultSource) {
                self.source = source;
            }
        })*
    };
}

impl_stage_payload!(PreprocessReport, TrainingReport, PredictionResult, RouteSummary);

/// Runs each dashboard stage through its configured script, or serves mock data.
pub struct StageService {
    config: Arc<AppConfig>,
    runner: Arc<dyn ScriptRunner>,
}

impl StageService {
    pub fn new(config: Arc<AppConfig>, runner: Arc<dyn ScriptRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn script_for(&self, stage: Stage) -> Option<ScriptEntry> {
        if self.config.scripts.force_mock {
            return None;
        }
        let scripts = &self.config.scripts;
        match stage {
            Stage::Preprocess => scripts.preprocess.clone(),
            Stage::Train => scripts.train.clone(),
            Stage::Predict => scripts.predict.clone(),
            Stage::Route => scripts.route.as_ref().map(|r| r.as_entry()),
        }
    }

    pub fn is_scripted(&self, stage: Stage) -> bool {
        self.script_for(stage).is_some()
    }

    fn invocation(&self, stage: Stage, entry: ScriptEntry, params: Option<Value>) -> ScriptInvocation {
        ScriptInvocation {
            name: stage.name().to_string(),
            interpreter: self.config.scripts.interpreter.clone(),
            script: entry.path,
            args: entry.args,
            params,
            working_dir: self.config.scripts.working_dir.clone(),
            timeout: self.config.scripts.timeout_seconds.map(Duration::from_secs),
        }
    }

    async fn run_script<T: DeserializeOwned>(
        &self,
        stage: Stage,
        entry: ScriptEntry,
        params: Option<Value>,
    ) -> Result<T> {
        let output = self.runner.run(self.invocation(stage, entry, params)).await?;
        serde_json::from_value(output.value).map_err(|e| DashboardError::ScriptOutputError {
            script: stage.name().to_string(),
            message: format!("unexpected result shape: {}", e),
        })
    }

    async fn run_or_mock<T, F>(&self, stage: Stage, params: Option<Value>, mock: F) -> Result<T>
    where
        T: DeserializeOwned + StagePayload,
        F: FnOnce() -> Result<T>,
    {
        let Some(entry) = self.script_for(stage) else {
            debug!("{} stage has no script, serving mock data", stage.name());
            return mock();
        };

        match self.run_script::<T>(stage, entry, params).await {
            Ok(mut payload) => {
                payload.set_source(ResultSource::Script);
                Ok(payload)
            }
            Err(e) if self.config.scripts.fallback_to_mock => {
                warn!(
                    "⚠️ {} script failed ({}), falling back to mock data",
                    stage.name(),
                    e
                );
                mock()
            }
            Err(e) => Err(e),
        }
    }

    pub async fn preprocess(&self) -> Result<PreprocessReport> {
        self.run_or_mock(Stage::Preprocess, None, || Ok(mock::mock_preprocess_report()))
            .await
    }

    pub async fn train(&self) -> Result<TrainingReport> {
        let report = self
            .run_or_mock(Stage::Train, None, || Ok(mock::mock_training_report()))
            .await?;
        info!(
            "Training finished: rmse={:.3}, mae={:.3}, r2={:.3}",
            report.metrics.rmse, report.metrics.mae, report.metrics.r2
        );
        Ok(report)
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        request.validate()?;
        let params = serde_json::to_value(request)?;
        let result = self
            .run_or_mock(Stage::Predict, Some(params), || mock::mock_predictions(request))
            .await?;
        info!("Generated {} predictions", result.total_predictions);
        Ok(result)
    }

    pub async fn route(&self, request: &RouteRequest) -> Result<RouteSummary> {
        let params = request.resolve(&self.config.defaults)?;
        let mut summary = self
            .run_or_mock(Stage::Route, Some(serde_json::to_value(&params)?), || {
                mock::mock_route(&params)
            })
            .await?;

        if !request.include_map {
            summary.map_html = None;
        } else if summary.map_html.is_none() && summary.source == ResultSource::Script {
            summary.map_html = self.read_route_map().await?;
        }

        info!(
            "Route summary: {:.1} km, {:.1} kg CO2 over {} stops",
            summary.total_distance,
            summary.co2_emissions,
            summary.stops.len()
        );
        Ok(summary)
    }

    async fn read_route_map(&self) -> Result<Option<String>> {
        let Some(path) = self
            .config
            .scripts
            .route
            .as_ref()
            .and_then(|r| r.map_output.as_ref())
        else {
            return Ok(None);
        };

        let path = match &self.config.scripts.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        };

        if !tokio::fs::try_exists(&path).await? {
            warn!("Route map {} does not exist", path.display());
            return Ok(None);
        }
        Ok(Some(tokio::fs::read_to_string(&path).await?))
    }

    /// Dashboard stages in the order the UI walks through them.
    pub fn stage_catalogue(&self) -> Vec<StageInfo> {
        vec![
            StageInfo {
                step: 1,
                id: "preprocess",
                title: "Preprocess data",
                method: "POST",
                endpoint: "/api/preprocess",
                scripted: Some(self.is_scripted(Stage::Preprocess)),
            },
            StageInfo {
                step: 2,
                id: "train",
                title: "Train forecasting model",
                method: "POST",
                endpoint: "/api/train",
                scripted: Some(self.is_scripted(Stage::Train)),
            },
            StageInfo {
                step: 3,
                id: "predict",
                title: "Generate predictions",
                method: "POST",
                endpoint: "/api/predict",
                scripted: Some(self.is_scripted(Stage::Predict)),
            },
            StageInfo {
                step: 4,
                id: "route",
                title: "Optimize delivery route",
                method: "POST",
                endpoint: "/api/route",
                scripted: Some(self.is_scripted(Stage::Route)),
            },
            StageInfo {
                step: 5,
                id: "map",
                title: "View route map",
                method: "GET",
                endpoint: "/api/export/map",
                scripted: None,
            },
            StageInfo {
                step: 6,
                id: "export",
                title: "Export CSV results",
                method: "GET",
                endpoint: "/api/export/bundle",
                scripted: None,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteScriptEntry, ScriptEntry};
    use crate::domain::ports::ScriptOutput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records invocations and answers with a canned result.
    struct CannedRunner {
        reply: std::result::Result<Value, String>,
        calls: Mutex<Vec<ScriptInvocation>>,
    }

    impl CannedRunner {
        fn ok(value: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(value),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(stderr.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ScriptRunner for CannedRunner {
        async fn run(&self, invocation: ScriptInvocation) -> Result<ScriptOutput> {
            let name = invocation.name.clone();
            self.calls.lock().unwrap().push(invocation);
            match &self.reply {
                Ok(value) => Ok(ScriptOutput {
                    value: value.clone(),
                    stderr: String::new(),
                    duration: Duration::from_millis(5),
                }),
                Err(stderr) => Err(DashboardError::ScriptFailed {
                    script: name,
                    code: Some(1),
                    stderr: stderr.clone(),
                }),
            }
        }
    }

    fn scripted_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.scripts.predict = Some(ScriptEntry {
            path: PathBuf::from("python/pred.py"),
            args: vec![],
        });
        config.scripts.route = Some(RouteScriptEntry {
            path: PathBuf::from("python/route.py"),
            args: vec!["--quiet".to_string()],
            map_output: None,
        });
        config
    }

    #[tokio::test]
    async fn test_unscripted_stage_serves_mock() {
        let runner = CannedRunner::ok(json!({}));
        let service = StageService::new(Arc::new(AppConfig::default()), runner.clone());

        let report = service.train().await.unwrap();
        assert_eq!(report.source, ResultSource::Mock);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_predict_passes_request_as_json_argument() {
        let runner = CannedRunner::ok(json!({
            "status": "success",
            "message": "Predictions generated successfully",
            "predictions": [
                {"date": "2024-01-01", "store_id": "CA_1", "cat_id": "FOODS", "prediction": 312.0, "confidence": 0.88}
            ],
            "total_predictions": 1,
            "model_version": "LightGBM_v1.2"
        }));
        let service = StageService::new(Arc::new(scripted_config()), runner.clone());

        let request = PredictionRequest {
            category: Some("FOODS".to_string()),
            store: Some("CA_1".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
        };
        let result = service.predict(&request).await.unwrap();

        assert_eq!(result.source, ResultSource::Script);
        assert_eq!(result.predictions[0].prediction, 312.0);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "predict");
        assert_eq!(calls[0].interpreter, "python3");
        assert_eq!(calls[0].params.as_ref().unwrap()["category"], "FOODS");
    }

    #[tokio::test]
    async fn test_invalid_prediction_request_never_reaches_script() {
        let runner = CannedRunner::ok(json!({}));
        let service = StageService::new(Arc::new(scripted_config()), runner.clone());

        let request = PredictionRequest {
            start_date: Some("2024-02-02".to_string()),
            end_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.predict(&request).await,
            Err(DashboardError::ValidationError { .. })
        ));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_script_failure_propagates_without_fallback() {
        let service = StageService::new(
            Arc::new(scripted_config()),
            CannedRunner::failing("Traceback: KeyError"),
        );

        let err = service.route(&RouteRequest::default()).await.unwrap_err();
        assert!(matches!(err, DashboardError::ScriptFailed { .. }));
    }

    #[tokio::test]
    async fn test_script_failure_falls_back_to_mock_when_enabled() {
        let mut config = scripted_config();
        config.scripts.fallback_to_mock = true;
        let service = StageService::new(Arc::new(config), CannedRunner::failing("boom"));

        let summary = service.route(&RouteRequest::default()).await.unwrap();
        assert_eq!(summary.source, ResultSource::Mock);
        assert_eq!(summary.top_stores, 5);
    }

    #[tokio::test]
    async fn test_route_params_use_config_defaults() {
        let runner = CannedRunner::ok(json!({"total_distance": 88.4, "map_html": "<div>map</div>"}));
        let mut config = scripted_config();
        config.defaults.demand_threshold = 42.0;
        let service = StageService::new(Arc::new(config), runner.clone());

        let summary = service.route(&RouteRequest::default()).await.unwrap();
        // Map markup is only kept when asked for.
        assert!(summary.map_html.is_none());
        assert_eq!(summary.total_distance, 88.4);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].args, vec!["--quiet".to_string()]);
        assert_eq!(calls[0].params, Some(json!({"demand_threshold": 42.0, "top_stores": 5})));
    }

    #[tokio::test]
    async fn test_missing_route_map_file_yields_no_map() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = scripted_config();
        config.scripts.working_dir = Some(dir.path().to_path_buf());
        if let Some(route) = config.scripts.route.as_mut() {
            route.map_output = Some(PathBuf::from("optimal_route_map.html"));
        }
        let runner = CannedRunner::ok(json!({"total_distance": 120.0}));
        let service = StageService::new(Arc::new(config), runner);

        let request = RouteRequest {
            include_map: true,
            ..Default::default()
        };
        let summary = service.route(&request).await.unwrap();

        assert_eq!(summary.source, ResultSource::Script);
        assert!(summary.map_html.is_none());
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_output_error() {
        let runner = CannedRunner::ok(json!({"predictions": "not a list"}));
        let service = StageService::new(Arc::new(scripted_config()), runner);

        let err = service.predict(&PredictionRequest::default()).await.unwrap_err();
        assert!(matches!(err, DashboardError::ScriptOutputError { .. }));
    }

    #[test]
    fn test_force_mock_disables_scripts() {
        let mut config = scripted_config();
        assert!(StageService::new(Arc::new(config.clone()), CannedRunner::ok(json!({})))
            .is_scripted(Stage::Predict));

        config.scripts.force_mock = true;
        let service = StageService::new(Arc::new(config), CannedRunner::ok(json!({})));
        assert!(Stage::ALL.iter().all(|stage| !service.is_scripted(*stage)));
        assert_eq!(service.stage_catalogue().len(), 6);
    }
}
