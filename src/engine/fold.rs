use super::timeline::EntityTimeline;
use super::types::{EntityKey, EntityState, OccupancyRecord, StatusEvent, TimeWindow};
use chrono::{DateTime, Utc};

const BUCKET_MS: i64 = 3_600_000;

/// Folds one entity's ordered events across every bucket of the window,
/// carrying state from bucket to bucket. Preconditions (window validated,
/// events sorted and inside the window) are the caller's job; the fold
/// performs no I/O and raises no errors.
pub fn fold_entity(
    key: &EntityKey,
    timeline: &EntityTimeline,
    mut state: EntityState,
    window: &TimeWindow,
) -> Vec<OccupancyRecord> {
    let hours = window.hours();
    let mut records = Vec::with_capacity(hours as usize);
    for index in 0..hours {
        let (bucket_start, bucket_end) = window.bucket(index);
        let events = timeline.slice(bucket_start, bucket_end);
        let occupied_ms = charge_bucket(&mut state, events, bucket_start, bucket_end);
        tracing::trace!(
            entity = %key.entity_id,
            partition = %key.partition_key,
            bucket = %bucket_start,
            occupied_ms,
            "bucket charged"
        );
        records.push(OccupancyRecord {
            bucket_start,
            entity_id: key.entity_id.clone(),
            entity_type: state.entity_type.clone(),
            partition_key: key.partition_key.clone(),
            name: state.name.clone(),
            ref_device: state.ref_device.clone(),
            occupancy_percent: percent(occupied_ms),
        });
    }
    records
}

/// Walks the n+1 sub-intervals delimited by the bucket edges and the event
/// timestamps. Each sub-interval is charged with the status carried in from
/// before it began; the event at its right edge takes effect only afterwards.
/// Null-status events split the duration without changing state, and sticky
/// fields absorb every event's non-null values independently of status.
fn charge_bucket(
    state: &mut EntityState,
    events: &[StatusEvent],
    bucket_start: DateTime<Utc>,
    bucket_end: DateTime<Utc>,
) -> i64 {
    if events.is_empty() {
        return if state.is_occupied() { BUCKET_MS } else { 0 };
    }

    let mut occupied_ms = 0;
    let mut cursor = bucket_start;
    for event in events {
        if state.is_occupied() {
            occupied_ms += (event.timestamp - cursor).num_milliseconds();
        }
        state.absorb_fields(event);
        state.apply_status(event);
        cursor = event.timestamp;
    }
    if state.is_occupied() {
        occupied_ms += (bucket_end - cursor).num_milliseconds();
    }
    occupied_ms
}

/// Fractional occupied time rounds up, so any occupancy at all shows as at
/// least 1%.
fn percent(occupied_ms: i64) -> i32 {
    ((occupied_ms as f64 / BUCKET_MS as f64) * 100.0).ceil() as i32
}
