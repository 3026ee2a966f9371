use crate::core::slots::build_slots;
use crate::core::{
    ConfigProvider, OutputFormat, Pipeline, ScheduleSource, SlotRow, Storage, TransformResult,
};
use crate::utils::error::{Result, SlotError};
use reqwest::Client;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const CSV_HEADER: [&str; 4] = ["date", "startTime", "endTime", "employee"];
const REJECTED_FILE: &str = "rejected.json";

pub struct SlotPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> SlotPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    async fn fetch_schedules(&self, endpoint: &str) -> Result<Vec<u8>> {
        let attempts = self.config.retry_attempts() + 1;
        let mut attempt = 1;

        loop {
            match self.request_schedules(endpoint).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Schedule request {}/{} failed: {}, retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        self.config.retry_delay()
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_schedules(&self, endpoint: &str) -> Result<Vec<u8>> {
        tracing::debug!("Making API request to: {}", endpoint);
        let mut request = self
            .client
            .get(endpoint)
            .timeout(self.config.request_timeout());
        if let Some(headers) = self.config.headers() {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());
        let response = response.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Parses an upstream payload, which must be a JSON array. Elements are left
/// undecoded; each one becomes a schedule record during transform.
pub fn parse_schedule_payload(payload: &[u8]) -> Result<Vec<serde_json::Value>> {
    match serde_json::from_slice(payload)? {
        serde_json::Value::Array(records) => Ok(records),
        _ => Err(SlotError::ProcessingError {
            message: "Expected a JSON array of schedule records".to_string(),
        }),
    }
}

pub fn render_csv(rows: &[SlotRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| SlotError::IoError(e.into_error()))
}

pub fn render_json(rows: &[SlotRow]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(rows)?)
}

fn bundle_zip(files: &[(&str, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(*name, FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SlotPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<serde_json::Value>> {
        let payload = match self.config.source()? {
            ScheduleSource::Api(endpoint) => self.fetch_schedules(endpoint).await?,
            ScheduleSource::File(path) => {
                tracing::debug!("Reading schedules from: {}", path);
                self.storage.read_file(path).await?
            }
        };

        parse_schedule_payload(&payload)
    }

    async fn transform(&self, data: Vec<serde_json::Value>) -> Result<TransformResult> {
        let tz = self.config.time_zone()?;
        tracing::debug!("Building slots for {} record(s) in {}", data.len(), tz.name());
        build_slots(data, tz, self.config.on_record_error())
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let rows = result.rows();

        if self.config.print_result() {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }

        let mut files: Vec<(&str, Vec<u8>)> = Vec::new();
        for format in self.config.output_formats() {
            let data = match format {
                OutputFormat::Csv => render_csv(&rows)?,
                OutputFormat::Json => render_json(&rows)?,
            };
            files.push((format.file_name(), data));
        }
        // Always written, so a report left by an earlier run never outlives it.
        files.push((REJECTED_FILE, serde_json::to_vec_pretty(&result.rejected)?));

        if let Some(archive) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = bundle_zip(&files)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive, &zip_data).await?;
            return Ok(format!("{}/{}", self.config.output_path(), archive));
        }

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes) to storage", name, data.len());
            self.storage.write_file(name, data).await?;
        }
        Ok(self.config.output_path().to_string())
    }
}
