use crate::utils::error::{DashboardError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DEMAND_THRESHOLD: f64 = 10.0;
pub const DEFAULT_TOP_STORES: u32 = 5;
pub const MAX_TOP_STORES: u32 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scripts: ScriptsConfig,
    pub data: DataConfig,
    pub defaults: DefaultsConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Directory holding the compiled dashboard UI.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: Vec::new(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub interpreter: String,
    pub working_dir: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
    pub fallback_to_mock: bool,
    /// Ignore configured scripts and always serve mock payloads.
    pub force_mock: bool,
    pub preprocess: Option<ScriptEntry>,
    pub train: Option<ScriptEntry>,
    pub predict: Option<ScriptEntry>,
    pub route: Option<RouteScriptEntry>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            working_dir: None,
            timeout_seconds: None,
            fallback_to_mock: false,
            force_mock: false,
            preprocess: None,
            train: None,
            predict: None,
            route: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteScriptEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// HTML map written by the route script, embedded on request.
    pub map_output: Option<PathBuf>,
}

impl RouteScriptEntry {
    pub fn as_entry(&self) -> ScriptEntry {
        ScriptEntry {
            path: self.path.clone(),
            args: self.args.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub predictions_csv: Option<PathBuf>,
    pub routes_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub demand_threshold: f64,
    pub top_stores: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            demand_threshold: DEFAULT_DEMAND_THRESHOLD,
            top_stores: DEFAULT_TOP_STORES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_format: "compact".to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DashboardError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DashboardError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SCRIPT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DashboardError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_positive_number("server.port", u64::from(self.server.port), 1)?;

        for origin in &self.server.allowed_origins {
            validation::validate_url("server.allowed_origins", origin)?;
        }

        if let Some(dir) = &self.server.static_dir {
            validation::validate_path("server.static_dir", &dir.to_string_lossy())?;
        }

        validation::validate_non_empty_string("scripts.interpreter", &self.scripts.interpreter)?;

        if let Some(timeout) = self.scripts.timeout_seconds {
            validation::validate_positive_number("scripts.timeout_seconds", timeout, 1)?;
        }

        let entries = [
            ("scripts.preprocess.path", self.scripts.preprocess.as_ref().map(|s| &s.path)),
            ("scripts.train.path", self.scripts.train.as_ref().map(|s| &s.path)),
            ("scripts.predict.path", self.scripts.predict.as_ref().map(|s| &s.path)),
            ("scripts.route.path", self.scripts.route.as_ref().map(|s| &s.path)),
        ];
        for (field, path) in entries {
            if let Some(path) = path {
                validation::validate_path(field, &path.to_string_lossy())?;
            }
        }

        if !self.defaults.demand_threshold.is_finite() {
            return Err(DashboardError::InvalidConfigValueError {
                field: "defaults.demand_threshold".to_string(),
                value: self.defaults.demand_threshold.to_string(),
                reason: "Value must be a finite number".to_string(),
            });
        }
        validation::validate_range(
            "defaults.demand_threshold",
            self.defaults.demand_threshold,
            0.0,
            f64::MAX,
        )?;
        validation::validate_range("defaults.top_stores", self.defaults.top_stores, 1, MAX_TOP_STORES)?;

        if LogFormat::from_name(&self.monitoring.log_format).is_none() {
            return Err(DashboardError::InvalidConfigValueError {
                field: "monitoring.log_format".to_string(),
                value: self.monitoring.log_format.clone(),
                reason: "Valid formats: compact, json".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_name(&self.monitoring.log_format).unwrap_or_default()
    }

    /// True when no stage would ever reach a script.
    pub fn is_mock_only(&self) -> bool {
        self.scripts.force_mock
            || (self.scripts.preprocess.is_none()
                && self.scripts.train.is_none()
                && self.scripts.predict.is_none()
                && self.scripts.route.is_none())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
