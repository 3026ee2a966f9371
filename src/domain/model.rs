use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike};
use crate::utils::error::{Result, SlotError};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream marker for a break slot that is not in use.
pub const UNSET_BREAK: &str = "00:00:00";

fn unset_break() -> String {
    UNSET_BREAK.to_string()
}

/// One staff member's bookable day, as delivered by the scheduling API.
///
/// Dates and times stay as raw strings so that a bad value can be reported
/// against the record it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub schedule_id: i64,
    pub start_date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_date: String,
    pub end_time: String,
    #[serde(default = "unset_break")]
    pub start_break: String,
    #[serde(default = "unset_break")]
    pub end_break: String,
    #[serde(default = "unset_break")]
    pub start_break2: String,
    #[serde(default = "unset_break")]
    pub end_break2: String,
    #[serde(default = "unset_break")]
    pub start_break3: String,
    #[serde(default = "unset_break")]
    pub end_break3: String,
    #[serde(default = "unset_break")]
    pub start_break4: String,
    #[serde(default = "unset_break")]
    pub end_break4: String,
    pub employee_id: i64,
    pub employee_name: String,
}

/// Raw break fields of one break slot, with the wire names used in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakFields<'a> {
    pub start_field: &'static str,
    pub start: &'a str,
    pub end_field: &'static str,
    pub end: &'a str,
}

impl BreakFields<'_> {
    pub fn is_unset(&self) -> bool {
        self.start == UNSET_BREAK
    }
}

impl ScheduleRecord {
    /// Decodes one element of the upstream array. Failures keep the
    /// `scheduleId` when the element still carries a readable one.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let schedule_id = value.get("scheduleId").and_then(serde_json::Value::as_i64);
        serde_json::from_value(value).map_err(|e| SlotError::RecordDecodeError {
            schedule_id,
            reason: e.to_string(),
        })
    }

    /// The four break slots in declaration order.
    pub fn break_fields(&self) -> [BreakFields<'_>; 4] {
        [
            BreakFields {
                start_field: "startBreak",
                start: &self.start_break,
                end_field: "endBreak",
                end: &self.end_break,
            },
            BreakFields {
                start_field: "startBreak2",
                start: &self.start_break2,
                end_field: "endBreak2",
                end: &self.end_break2,
            },
            BreakFields {
                start_field: "startBreak3",
                start: &self.start_break3,
                end_field: "endBreak3",
                end: &self.end_break3,
            },
            BreakFields {
                start_field: "startBreak4",
                start: &self.start_break4,
                end_field: "endBreak4",
                end: &self.end_break4,
            },
        ]
    }

    pub fn owner(&self) -> SlotOwner {
        SlotOwner {
            schedule_id: self.schedule_id,
            employee_id: self.employee_id,
            name: self.employee_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOwner {
    pub schedule_id: i64,
    pub employee_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Bookable time between breaks. May be empty or inverted when breaks touch
/// the window edges or each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl FreeInterval {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookableSlot {
    pub schedule_id: i64,
    pub employee_id: i64,
    pub employee: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl BookableSlot {
    /// Calendar date of the slot's own start, in the slot's zone.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end.time()
    }

    pub fn to_row(&self) -> SlotRow {
        SlotRow {
            date: format!(
                "{} {}",
                self.date().format("%Y-%m-%d"),
                self.start_time().format("%H:%M:%S")
            ),
            start_time: hour_minute(self.start_time()),
            end_time: hour_minute(self.end_time()),
            employee: self.employee.clone(),
        }
    }
}

fn hour_minute(at: NaiveTime) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

/// Published shape of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRow {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub employee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    /// `None` when the record was too broken to carry a readable id.
    pub schedule_id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub slots: Vec<BookableSlot>,
    pub rejected: Vec<RejectedRecord>,
}

impl TransformResult {
    pub fn rows(&self) -> Vec<SlotRow> {
        self.slots.iter().map(BookableSlot::to_row).collect()
    }
}

/// What to do with a record whose dates or times cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorPolicy {
    /// Abort the whole batch.
    #[default]
    Fail,
    /// Report the record and keep going.
    Skip,
}

impl FromStr for RecordErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown record error policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "slots.csv",
            OutputFormat::Json => "slots.json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Where schedule records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSource<'a> {
    Api(&'a str),
    File(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Stockholm;

    #[test]
    fn test_deserialize_api_record() {
        let json = serde_json::json!({
            "scheduleId": 4711,
            "startDate": "2020-04-29",
            "startTime": "10:00:00",
            "endDate": "2020-04-29",
            "endTime": "14:30:00",
            "startBreak": "12:00:00",
            "endBreak": "12:30:00",
            "startBreak2": "00:00:00",
            "endBreak2": "00:00:00",
            "startBreak3": "00:00:00",
            "endBreak3": "00:00:00",
            "startBreak4": "00:00:00",
            "endBreak4": "00:00:00",
            "employeeId": 4712,
            "employeeName": "John Doe"
        });

        let record: ScheduleRecord = serde_json::from_value(json).unwrap();

        assert_eq!(record.schedule_id, 4711);
        assert_eq!(record.start_break, "12:00:00");
        assert_eq!(record.employee_name, "John Doe");

        let fields = record.break_fields();
        assert!(!fields[0].is_unset());
        assert!(fields[1..].iter().all(BreakFields::is_unset));
        assert_eq!(fields[3].start_field, "startBreak4");
    }

    #[test]
    fn test_missing_break_fields_default_to_unset() {
        let json = serde_json::json!({
            "scheduleId": 1,
            "startDate": "2020-04-29",
            "startTime": "08:00:00",
            "endTime": "09:00:00",
            "employeeId": 2,
            "employeeName": "Ann"
        });

        let record: ScheduleRecord = serde_json::from_value(json).unwrap();

        assert!(record.break_fields().iter().all(BreakFields::is_unset));
        assert_eq!(record.end_date, "");
    }

    #[test]
    fn test_from_value_reports_bad_field_against_record() {
        let json = serde_json::json!({
            "scheduleId": 2,
            "startDate": "2020-04-29",
            "startTime": null,
            "endTime": "09:00:00",
            "employeeId": 3,
            "employeeName": "Bob"
        });

        let err = ScheduleRecord::from_value(json).unwrap_err();

        assert!(matches!(
            err,
            SlotError::RecordDecodeError {
                schedule_id: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_from_value_without_readable_id() {
        let json = serde_json::json!({
            "scheduleId": "two",
            "startDate": "2020-04-29",
            "startTime": "08:00:00",
            "endTime": "09:00:00",
            "employeeId": 3,
            "employeeName": "Bob"
        });

        let err = ScheduleRecord::from_value(json).unwrap_err();

        assert_eq!(err.schedule_id(), None);
    }

    #[test]
    fn test_slot_row_reads_local_wall_clock() {
        let start = Stockholm.with_ymd_and_hms(2020, 4, 29, 9, 45, 0).unwrap();
        let slot = BookableSlot {
            schedule_id: 1,
            employee_id: 2,
            employee: "Jane Doe".to_string(),
            start,
            end: start + Duration::minutes(15),
        };

        let row = slot.to_row();

        assert_eq!(row.date, "2020-04-29 09:45:00");
        assert_eq!(row.start_time, "09:45");
        assert_eq!(row.end_time, "10:00");
        assert_eq!(row.employee, "Jane Doe");
        assert_eq!(slot.date(), NaiveDate::from_ymd_opt(2020, 4, 29).unwrap());
        assert_eq!(slot.end_time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn test_slot_row_serializes_with_wire_names() {
        let row = SlotRow {
            date: "2020-04-29 10:00:00".to_string(),
            start_time: "10:00".to_string(),
            end_time: "10:15".to_string(),
            employee: "John Doe".to_string(),
        };

        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["startTime"], "10:00");
        assert_eq!(value["endTime"], "10:15");
    }

    #[test]
    fn test_record_error_policy_from_str() {
        assert_eq!("skip".parse::<RecordErrorPolicy>(), Ok(RecordErrorPolicy::Skip));
        assert_eq!("fail".parse::<RecordErrorPolicy>(), Ok(RecordErrorPolicy::Fail));
        assert!("retry".parse::<RecordErrorPolicy>().is_err());
    }
}
