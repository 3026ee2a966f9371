pub mod cli;
pub mod toml_config;

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Europe/Stockholm";
pub const DEFAULT_ARCHIVE: &str = "slots.zip";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[cfg(feature = "cli")]
pub use self::command_line::CliConfig;

#[cfg(feature = "cli")]
mod command_line {
    use super::{DEFAULT_ARCHIVE, DEFAULT_TIMEZONE};
    use crate::core::{ConfigProvider, OutputFormat, ScheduleSource};
    use crate::domain::model::RecordErrorPolicy;
    use crate::utils::error::{Result, SlotError};
    use crate::utils::validation::{self, Validate};
    use chrono_tz::Tz;
    use clap::Parser;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "slot-etl")]
    #[command(about = "Turn staff schedules into bookable 15-minute slots")]
    pub struct CliConfig {
        /// Scheduling API returning a JSON array of schedule records
        #[arg(long)]
        pub api_endpoint: Option<String>,

        /// Local JSON file with schedule records, instead of the API
        #[arg(long)]
        pub input_file: Option<String>,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![OutputFormat::Csv, OutputFormat::Json])]
        pub formats: Vec<OutputFormat>,

        /// IANA time zone the schedule times are read in
        #[arg(long, default_value = DEFAULT_TIMEZONE)]
        pub timezone: String,

        #[arg(long, default_value_t = super::DEFAULT_TIMEOUT_SECONDS)]
        pub timeout_seconds: u64,

        #[arg(long, default_value_t = 0)]
        pub retry_attempts: u32,

        #[arg(long, help = "Bundle output files into slots.zip")]
        pub compress: bool,

        #[arg(long, help = "Print the slot list to stdout")]
        pub print: bool,

        #[arg(long, help = "Skip schedules with unreadable times instead of aborting")]
        pub skip_invalid: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl ConfigProvider for CliConfig {
        fn source(&self) -> Result<ScheduleSource<'_>> {
            match (&self.api_endpoint, &self.input_file) {
                (Some(endpoint), _) => Ok(ScheduleSource::Api(endpoint)),
                (None, Some(path)) => Ok(ScheduleSource::File(path)),
                (None, None) => Err(SlotError::MissingConfigError {
                    field: "--api-endpoint or --input-file".to_string(),
                }),
            }
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(self.timeout_seconds)
        }

        fn retry_attempts(&self) -> u32 {
            self.retry_attempts
        }

        fn retry_delay(&self) -> Duration {
            Duration::from_secs(1)
        }

        fn headers(&self) -> Option<&HashMap<String, String>> {
            None
        }

        fn time_zone(&self) -> Result<Tz> {
            validation::parse_time_zone("--timezone", &self.timezone)
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_formats(&self) -> &[OutputFormat] {
            &self.formats
        }

        fn archive_name(&self) -> Option<&str> {
            self.compress.then_some(DEFAULT_ARCHIVE)
        }

        fn print_result(&self) -> bool {
            self.print
        }

        fn on_record_error(&self) -> RecordErrorPolicy {
            if self.skip_invalid {
                RecordErrorPolicy::Skip
            } else {
                RecordErrorPolicy::Fail
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_single_source(
                ("--api-endpoint", self.api_endpoint.as_deref()),
                ("--input-file", self.input_file.as_deref()),
            )?;
            validation::validate_path("--output-path", &self.output_path)?;
            validation::validate_range("--timeout-seconds", self.timeout_seconds, 1, 300)?;
            if self.formats.is_empty() {
                return Err(SlotError::MissingConfigError {
                    field: "--formats".to_string(),
                });
            }
            self.time_zone().map(|_| ())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cli_defaults() {
            let config =
                CliConfig::parse_from(["slot-etl", "--api-endpoint", "https://api.example.com/s"]);

            assert_eq!(config.formats, vec![OutputFormat::Csv, OutputFormat::Json]);
            assert_eq!(config.time_zone().unwrap(), chrono_tz::Europe::Stockholm);
            assert_eq!(config.archive_name(), None);
            assert_eq!(config.on_record_error(), RecordErrorPolicy::Fail);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_cli_flags() {
            let config = CliConfig::parse_from([
                "slot-etl",
                "--input-file",
                "schedules.json",
                "--formats",
                "json",
                "--timezone",
                "Europe/Helsinki",
                "--compress",
                "--skip-invalid",
            ]);

            assert_eq!(config.source().unwrap(), ScheduleSource::File("schedules.json"));
            assert_eq!(config.output_formats(), &[OutputFormat::Json]);
            assert_eq!(config.archive_name(), Some("slots.zip"));
            assert_eq!(config.on_record_error(), RecordErrorPolicy::Skip);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_cli_requires_a_source() {
            let config = CliConfig::parse_from(["slot-etl"]);

            assert!(config.source().is_err());
            match config.validate() {
                Err(SlotError::MissingConfigError { field }) => {
                    assert_eq!(field, "--api-endpoint or --input-file")
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn test_cli_names_flag_of_bad_input_file() {
            let config = CliConfig::parse_from(["slot-etl", "--input-file", "schedules.csv"]);

            match config.validate() {
                Err(SlotError::InvalidConfigValueError { field, .. }) => {
                    assert_eq!(field, "--input-file")
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn test_cli_rejects_unknown_zone() {
            let config = CliConfig::parse_from([
                "slot-etl",
                "--api-endpoint",
                "https://api.example.com/s",
                "--timezone",
                "Europe/Atlantis",
            ]);

            assert!(config.validate().is_err());
        }
    }
}
