use crate::domain::model::{OutputFormat, RecordErrorPolicy, ScheduleSource, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> Result<ScheduleSource<'_>>;
    fn request_timeout(&self) -> Duration;
    fn retry_attempts(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn headers(&self) -> Option<&HashMap<String, String>>;
    fn time_zone(&self) -> Result<Tz>;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[OutputFormat];
    /// `Some(name)` bundles every output file into one ZIP archive.
    fn archive_name(&self) -> Option<&str>;
    fn print_result(&self) -> bool;
    fn on_record_error(&self) -> RecordErrorPolicy;
}

/// Records travel from `extract` to `transform` undecoded, so a single bad
/// element is judged by the record-error policy rather than failing the batch.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<serde_json::Value>>;
    async fn transform(&self, data: Vec<serde_json::Value>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
