use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: String,
    pub record_count: usize,
    pub slot_count: usize,
    pub rejected_count: usize,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting slot ETL process");

        let records = self.pipeline.extract().await?;
        let record_count = records.len();
        tracing::info!("Extracted {} schedule records in {:?}", record_count, started.elapsed());

        let result = self.pipeline.transform(records).await?;
        let slot_count = result.slots.len();
        let rejected_count = result.rejected.len();
        tracing::info!("Generated {} bookable slots", slot_count);
        if rejected_count > 0 {
            tracing::warn!("{} schedule records were skipped", rejected_count);
        }

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {} ({:?} total)", output_path, started.elapsed());

        Ok(RunSummary {
            output_path,
            record_count,
            slot_count,
            rejected_count,
        })
    }
}
