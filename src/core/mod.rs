pub mod etl;
pub mod pipeline;
pub mod slots;

pub use crate::domain::model::{
    BookableSlot, OutputFormat, ScheduleRecord, ScheduleSource, SlotRow, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
