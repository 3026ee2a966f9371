//! Schedule-to-slot conversion.
//!
//! A record's working window is cut at its breaks into free intervals, and
//! each free interval is cut into back-to-back 15-minute slots. Whatever is
//! left at the tail of an interval that cannot hold a full slot is dropped.
//!
//! Breaks are taken in declaration order. Callers must supply them sorted by
//! start time and non-overlapping; nothing here reorders or checks them, and
//! out-of-order breaks yield inverted free intervals (which carry no slots).

use crate::domain::model::{
    BookableSlot, BreakInterval, FreeInterval, RecordErrorPolicy, RejectedRecord,
    ScheduleRecord, SlotOwner, TransformResult,
};
use crate::utils::error::{Result, SlotError};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

pub const SLOT_MINUTES: i64 = 15;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Combines a `YYYY-MM-DD` date and an `HH:MM:SS` wall-clock time into an
/// instant in `tz`.
///
/// On a DST fold the earlier instant wins. A wall-clock time inside a DST gap
/// does not exist and is reported like any other unreadable value.
pub fn parse_timestamp(
    tz: Tz,
    schedule_id: i64,
    date: &str,
    field: &str,
    time: &str,
) -> Result<DateTime<Tz>> {
    let day = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
        SlotError::TimestampError {
            schedule_id,
            field: "startDate".to_string(),
            value: date.to_string(),
            reason: e.to_string(),
        }
    })?;
    let clock =
        NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|e| SlotError::TimestampError {
            schedule_id,
            field: field.to_string(),
            value: time.to_string(),
            reason: e.to_string(),
        })?;

    tz.from_local_datetime(&day.and_time(clock))
        .earliest()
        .ok_or_else(|| SlotError::TimestampError {
            schedule_id,
            field: field.to_string(),
            value: time.to_string(),
            reason: format!("{} {} does not exist in {}", date, time, tz.name()),
        })
}

/// Reads the record's real breaks, skipping any whose start is `00:00:00`.
pub fn extract_breaks(record: &ScheduleRecord, tz: Tz) -> Result<Vec<BreakInterval>> {
    record
        .break_fields()
        .iter()
        .filter(|fields| !fields.is_unset())
        .map(|fields| -> Result<BreakInterval> {
            Ok(BreakInterval {
                start: parse_timestamp(
                    tz,
                    record.schedule_id,
                    &record.start_date,
                    fields.start_field,
                    fields.start,
                )?,
                end: parse_timestamp(
                    tz,
                    record.schedule_id,
                    &record.start_date,
                    fields.end_field,
                    fields.end,
                )?,
            })
        })
        .collect()
}

/// The window `[window_start, window_end)` minus `breaks`.
///
/// Yields `breaks.len() + 1` intervals, degenerate ones included.
pub fn split_free(
    window_start: DateTime<Tz>,
    window_end: DateTime<Tz>,
    breaks: &[BreakInterval],
) -> Vec<FreeInterval> {
    let (first, last) = match (breaks.first(), breaks.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return vec![FreeInterval::new(window_start, window_end)],
    };

    let mut free = Vec::with_capacity(breaks.len() + 1);
    free.push(FreeInterval::new(window_start, first.start));
    free.extend(
        breaks
            .windows(2)
            .map(|pair| FreeInterval::new(pair[0].end, pair[1].start)),
    );
    free.push(FreeInterval::new(last.end, window_end));
    free
}

/// Number of whole slots that fit in `interval`. Negative for inverted
/// intervals.
pub fn slot_count(interval: &FreeInterval) -> i64 {
    // Round half up to whole minutes before dividing.
    let minutes = (interval.duration().num_milliseconds() + 30_000).div_euclid(60_000);
    minutes.div_euclid(SLOT_MINUTES)
}

pub fn generate_slots(interval: &FreeInterval, owner: &SlotOwner) -> Vec<BookableSlot> {
    (0..slot_count(interval).max(0))
        .map(|i| {
            let start = interval.start + Duration::minutes(i * SLOT_MINUTES);
            BookableSlot {
                schedule_id: owner.schedule_id,
                employee_id: owner.employee_id,
                employee: owner.name.clone(),
                start,
                end: start + Duration::minutes(SLOT_MINUTES),
            }
        })
        .collect()
}

/// All slots of one record, in the order of its free intervals.
///
/// The window end is read against `startDate`; `endDate` is not consulted.
pub fn build_record_slots(record: &ScheduleRecord, tz: Tz) -> Result<Vec<BookableSlot>> {
    let window_start = parse_timestamp(
        tz,
        record.schedule_id,
        &record.start_date,
        "startTime",
        &record.start_time,
    )?;
    let window_end = parse_timestamp(
        tz,
        record.schedule_id,
        &record.start_date,
        "endTime",
        &record.end_time,
    )?;

    let breaks = extract_breaks(record, tz)?;
    let free = split_free(window_start, window_end, &breaks);
    tracing::debug!(
        "Schedule {}: {} break(s), {} free interval(s)",
        record.schedule_id,
        breaks.len(),
        free.len()
    );

    let owner = record.owner();
    Ok(free
        .iter()
        .flat_map(|interval| generate_slots(interval, &owner))
        .collect())
}

/// Concatenates per-record slot lists and sorts by start instant. The sort is
/// stable, so slots starting at the same instant keep their input order.
pub fn merge_slots<I>(per_record: I) -> Vec<BookableSlot>
where
    I: IntoIterator<Item = Vec<BookableSlot>>,
{
    let mut merged: Vec<BookableSlot> = per_record.into_iter().flatten().collect();
    merged.sort_by_key(|slot| slot.start);
    merged
}

/// Decodes and converts each upstream element in turn. Under
/// [`RecordErrorPolicy::Skip`] an element that fails either step is reported
/// in `rejected` and the rest of the batch carries on.
pub fn build_slots(
    records: Vec<serde_json::Value>,
    tz: Tz,
    policy: RecordErrorPolicy,
) -> Result<TransformResult> {
    let mut per_record = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for value in records {
        let slots = ScheduleRecord::from_value(value)
            .and_then(|record| build_record_slots(&record, tz));
        match slots {
            Ok(slots) => per_record.push(slots),
            Err(e) if policy == RecordErrorPolicy::Skip => {
                tracing::warn!("Skipping schedule record: {}", e);
                rejected.push(RejectedRecord {
                    schedule_id: e.schedule_id(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(TransformResult {
        slots: merge_slots(per_record),
        rejected,
    })
}
