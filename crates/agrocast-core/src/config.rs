use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Default lifetime of the aggregated weather cache entry.
pub const DEFAULT_CACHE_TTL_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Loading is refused
    Error,
    /// Logged; the setting is usable but probably wrong
    Warning,
}

/// One problem found in a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
    pub severity: Severity,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

/// Everything `Config::validate` found, in check order.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ConfigIssue>,
}

impl ValidationResult {
    /// No issue of `Severity::Error`; warnings don't count
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConfigIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ConfigIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, field: &'static str, message: impl Into<String>) {
        self.issues.push(ConfigIssue {
            field,
            message: message.into(),
            severity,
        });
    }

    pub fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.push(Severity::Error, field, message);
    }

    pub fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.push(Severity::Warning, field, message);
    }

    /// Errors joined into one line, for the load failure message
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self.errors().map(ToString::to_string).collect();
        parts.join(", ")
    }

    /// Has an issue for `field` at `severity`
    pub fn flags(&self, field: &str, severity: Severity) -> bool {
        self.issues
            .iter()
            .any(|i| i.field == field && i.severity == severity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather and geocoding service settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Advisory agent settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Fixed location, used when no system location is available
    #[serde(default)]
    pub location: LocationConfig,

    /// Persisted cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,

    /// Base URL for the weather and reverse-geocoding endpoints
    #[serde(default = "default_weather_base_url")]
    pub api_base_url: String,

    /// How long an aggregated result is served from cache
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u32,

    /// Per-request timeout for every upstream call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_cache_ttl_minutes() -> u32 {
    DEFAULT_CACHE_TTL_MINUTES
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: "YOUR_OPENWEATHERMAP_API_KEY".to_string(),
            api_base_url: default_weather_base_url(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// Check if the API key is set (not a placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

/// Advisory agent session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    /// Endpoint answering weather warning prompts
    pub weather_url: String,
    /// Endpoint answering soil/crop/fertilizer prompts
    pub grower_url: String,
    /// Endpoint answering free-form questions
    #[serde(default = "default_agent_url")]
    pub ask_url: String,
    /// Endpoint diagnosing crop disease from photos
    #[serde(default = "default_agent_url")]
    pub diagnosis_url: String,
}

fn default_agent_url() -> String {
    "http://localhost:8000/run".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: "agrocast".to_string(),
            user_id: "user".to_string(),
            session_id: "session".to_string(),
            weather_url: default_agent_url(),
            grower_url: default_agent_url(),
            ask_url: default_agent_url(),
            diagnosis_url: default_agent_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// Both halves of the coordinate, if configured
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// File name of the persisted cache record inside `config_dir`
    #[serde(default = "default_cache_file_name")]
    pub file_name: String,
}

fn default_cache_file_name() -> String {
    "weather_cache.json".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_name: default_cache_file_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agrocast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            agent: AgentConfig::default(),
            location: LocationConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Read `<config_dir>/agrocast/config.toml`, writing defaults there first if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_file()?)
    }

    /// Read the config at `path`; a missing file is created from defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}; writing defaults", path.display());
            let defaults = Self::default();
            defaults.save_to(path)?;
            return Ok(defaults);
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// [`Config::load`] followed by [`Config::validate`].
    ///
    /// Any error-level issue fails the load; warnings are logged and returned.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let report = config.validate();

        if !report.is_valid() {
            return Err(ConfigError::Invalid(report.summary()).into());
        }
        report
            .warnings()
            .for_each(|issue| tracing::warn!("Config: {}", issue));

        Ok((config, report))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut report = ValidationResult::default();

        check_endpoint(&mut report, "weather.api_base_url", &self.weather.api_base_url);
        check_endpoint(&mut report, "agent.weather_url", &self.agent.weather_url);
        check_endpoint(&mut report, "agent.grower_url", &self.agent.grower_url);
        check_endpoint(&mut report, "agent.ask_url", &self.agent.ask_url);
        check_endpoint(&mut report, "agent.diagnosis_url", &self.agent.diagnosis_url);

        self.weather.check(&mut report);
        self.location.check(&mut report);

        if self.cache.file_name.trim().is_empty() {
            report.error("cache.file_name", "must name a file");
        }

        report
    }

    /// Path of the persisted weather cache record
    pub fn cache_path(&self) -> PathBuf {
        self.config_dir.join(&self.cache.file_name)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn default_file() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("agrocast").join("config.toml"))
    }
}

fn check_endpoint(report: &mut ValidationResult, field: &'static str, value: &str) {
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(e) => {
            report.error(field, format!("not a URL ({})", e));
            return;
        }
    };
    if !matches!(url.scheme(), "http" | "https") {
        report.error(field, format!("scheme '{}' is not http or https", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        report.error(field, "has no host");
    }
}

impl WeatherConfig {
    fn check(&self, report: &mut ValidationResult) {
        if !self.has_api_key() {
            report.warn(
                "weather.api_key",
                "placeholder key; the weather provider will reject requests",
            );
        }
        match self.cache_ttl_minutes {
            0 => report.error("weather.cache_ttl_minutes", "must be at least 1"),
            m if m > 24 * 60 => report.warn("weather.cache_ttl_minutes", "longer than a day"),
            _ => {}
        }
        if self.request_timeout_secs == 0 {
            report.error("weather.request_timeout_secs", "must be at least 1");
        }
    }
}

impl LocationConfig {
    fn check(&self, report: &mut ValidationResult) {
        match (self.latitude, self.longitude) {
            (None, None) => {}
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    report.error("location.latitude", format!("{} is outside [-90, 90]", lat));
                }
                if !(-180.0..=180.0).contains(&lon) {
                    report.error("location.longitude", format!("{} is outside [-180, 180]", lon));
                }
            }
            _ => report.error("location", "set both latitude and longitude, or neither"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn checked(edit: impl FnOnce(&mut Config)) -> ValidationResult {
        let mut config = Config::default();
        edit(&mut config);
        config.validate()
    }

    #[test]
    fn test_defaults_pass_with_key_warning() {
        let report = checked(|_| {});
        assert!(report.is_valid(), "{}", report.summary());
        assert!(report.flags("weather.api_key", Severity::Warning));
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn test_real_key_has_no_warning() {
        let report = checked(|c| c.weather.api_key = "0123abcd".into());
        assert_eq!(report.warnings().count(), 0);
    }

    #[test]
    fn test_endpoint_must_parse() {
        let report = checked(|c| c.agent.weather_url = "localhost run".into());
        assert!(!report.is_valid());
        assert!(report.flags("agent.weather_url", Severity::Error));
    }

    #[test]
    fn test_endpoint_scheme() {
        let report = checked(|c| c.weather.api_base_url = "ftp://api.openweathermap.org".into());
        assert!(report.flags("weather.api_base_url", Severity::Error));
        assert!(report.summary().contains("ftp"));
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(checked(|c| c.weather.cache_ttl_minutes = 0)
            .flags("weather.cache_ttl_minutes", Severity::Error));
        assert!(checked(|c| c.weather.cache_ttl_minutes = 3 * 24 * 60)
            .flags("weather.cache_ttl_minutes", Severity::Warning));
    }

    #[test]
    fn test_location_ranges() {
        let report = checked(|c| {
            c.location.latitude = Some(91.0);
            c.location.longitude = Some(-181.0);
        });
        assert!(report.flags("location.latitude", Severity::Error));
        assert!(report.flags("location.longitude", Severity::Error));
    }

    #[test]
    fn test_location_needs_both_halves() {
        let mut config = Config::default();
        config.location.latitude = Some(12.97);
        assert!(config.validate().flags("location", Severity::Error));
        assert!(config.location.coordinate().is_none());
    }

    #[test]
    fn test_summary_lists_only_errors() {
        let mut report = ValidationResult::default();
        report.error("a.b", "broken");
        report.warn("c.d", "odd");
        report.error("e.f", "also broken");
        assert_eq!(report.summary(), "[a.b] broken, [e.f] also broken");
    }

    #[test]
    fn test_load_from_writes_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(first.weather.cache_ttl_minutes, DEFAULT_CACHE_TTL_MINUTES);

        let mut edited = first.clone();
        edited.location.latitude = Some(12.9716);
        edited.location.longitude = Some(77.5946);
        edited.save_to(&path).unwrap();

        let reread = Config::load_from(&path).unwrap();
        assert_eq!(reread.location.coordinate(), Some((12.9716, 77.5946)));
    }

    #[test]
    fn test_agent_section_without_ask_and_diagnosis_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/agrocast\"\n\n[agent]\napp_name = \"farm\"\nuser_id = \"u\"\n\
             session_id = \"s\"\nweather_url = \"http://agent.local/weather\"\n\
             grower_url = \"http://agent.local/grower\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.agent.grower_url, "http://agent.local/grower");
        assert_eq!(config.agent.ask_url, "http://localhost:8000/run");
        assert!(checked(|c| c.agent.diagnosis_url = "nowhere".into())
            .flags("agent.diagnosis_url", Severity::Error));
    }

    #[test]
    fn test_sparse_file_fills_in_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = \"/tmp/agrocast\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cache.file_name, "weather_cache.json");
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/agrocast/weather_cache.json"));
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "weather = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
