use super::{DEFAULT_ARCHIVE, DEFAULT_TIMEOUT_SECONDS, DEFAULT_TIMEZONE};
use crate::core::{ConfigProvider, OutputFormat, ScheduleSource};
use crate::domain::model::RecordErrorPolicy;
use crate::utils::error::{Result, SlotError};
use crate::utils::validation::{self, Validate};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Api,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceType,
    pub endpoint: Option<String>,
    pub path: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<OutputFormat>,
    pub print_result: Option<bool>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_record_error: Option<RecordErrorPolicy>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SlotError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SlotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        let (endpoint, path) = match self.source.r#type {
            SourceType::Api => (self.source.endpoint.as_deref(), None),
            SourceType::File => (None, self.source.path.as_deref()),
        };
        validation::validate_single_source(("source.endpoint", endpoint), ("source.path", path))?;

        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }
        if let Some(retries) = self.source.retry_attempts {
            validation::validate_range("source.retry_attempts", retries, 0, 10)?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(SlotError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        if let Some(name) = self.archive_name() {
            validation::validate_non_empty_string("load.compression.filename", name)?;
            validation::validate_file_extensions("load.compression.filename", &[name], &["zip"])?;
        }

        self.time_zone().map(|_| ())
    }

    pub fn log_format(&self) -> LogFormat {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format)
            .unwrap_or_default()
    }

    pub fn verbose_logging(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"))
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> Result<ScheduleSource<'_>> {
        let missing = |field: &str| SlotError::MissingConfigError {
            field: field.to_string(),
        };
        match self.source.r#type {
            SourceType::Api => self
                .source
                .endpoint
                .as_deref()
                .map(ScheduleSource::Api)
                .ok_or_else(|| missing("source.endpoint")),
            SourceType::File => self
                .source
                .path
                .as_deref()
                .map(ScheduleSource::File)
                .ok_or_else(|| missing("source.path")),
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn retry_attempts(&self) -> u32 {
        self.source.retry_attempts.unwrap_or(0)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.source.retry_delay_seconds.unwrap_or(1))
    }

    fn headers(&self) -> Option<&HashMap<String, String>> {
        self.source.headers.as_ref()
    }

    fn time_zone(&self) -> Result<Tz> {
        validation::parse_time_zone(
            "transform.timezone",
            self.transform.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE),
        )
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.load.output_formats
    }

    fn archive_name(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_deref().unwrap_or(DEFAULT_ARCHIVE))
    }

    fn print_result(&self) -> bool {
        self.load.print_result.unwrap_or(false)
    }

    fn on_record_error(&self) -> RecordErrorPolicy {
        self.error_handling
            .as_ref()
            .and_then(|e| e.on_record_error)
            .unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[pipeline]
name = "test-pipeline"
description = "Test pipeline"
version = "1.0.0"

[source]
type = "api"
endpoint = "https://api.example.com/schedules"
retry_attempts = 3

[transform]
timezone = "Europe/Oslo"

[load]
output_path = "./test-output"
output_formats = ["csv", "json"]
print_result = true

[load.compression]
enabled = true

[error_handling]
on_record_error = "skip"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "test-pipeline");
        assert_eq!(
            config.source().unwrap(),
            ScheduleSource::Api("https://api.example.com/schedules")
        );
        assert_eq!(config.retry_attempts(), 3);
        assert_eq!(config.time_zone().unwrap(), chrono_tz::Europe::Oslo);
        assert_eq!(config.output_formats(), &[OutputFormat::Csv, OutputFormat::Json]);
        assert_eq!(config.archive_name(), Some("slots.zip"));
        assert!(config.print_result());
        assert_eq!(config.on_record_error(), RecordErrorPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_are_sparse() {
        let toml_content = r#"
[pipeline]
name = "sparse"
description = "sparse"
version = "1.0"

[source]
type = "file"
path = "schedules.json"

[load]
output_path = "./output"
output_formats = ["json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.time_zone().unwrap(), chrono_tz::Europe::Stockholm);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.archive_name(), None);
        assert_eq!(config.on_record_error(), RecordErrorPolicy::Fail);
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert!(!config.verbose_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SLOT_ETL_TEST_ENDPOINT", "https://test.api.com");

        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
type = "api"
endpoint = "${SLOT_ETL_TEST_ENDPOINT}"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.endpoint.as_deref(), Some("https://test.api.com"));

        std::env::remove_var("SLOT_ETL_TEST_ENDPOINT");
    }

    #[test]
    fn test_unknown_output_format_fails_to_parse() {
        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
type = "api"
endpoint = "https://api.example.com"

[load]
output_path = "./output"
output_formats = ["xml"]
"#;

        assert!(matches!(
            TomlConfig::from_toml_str(toml_content),
            Err(SlotError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
type = "api"
endpoint = "invalid-url"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_zone_and_missing_path() {
        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
type = "file"

[transform]
timezone = "Europe/Stockholm"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SlotError::MissingConfigError { .. })
        ));

        let bad_zone = toml_content
            .replace("type = \"file\"", "type = \"file\"\npath = \"s.json\"")
            .replace("Europe/Stockholm", "Nowhere/Special");
        let config = TomlConfig::from_toml_str(&bad_zone).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SlotError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"
description = "File test"
version = "1.0"

[source]
type = "api"
endpoint = "https://api.example.com"

[monitoring]
log_level = "debug"
log_format = "json"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.verbose_logging());
    }
}
