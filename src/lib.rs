pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{
    etl::{EtlEngine, RunSummary},
    pipeline::SlotPipeline,
};
pub use domain::model::{BookableSlot, ScheduleRecord, SlotRow};
pub use utils::error::{Result, SlotError};
