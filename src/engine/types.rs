use super::{STATUS_FREE, STATUS_OCCUPIED};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// One status-change row as loaded from the spot table. `status` is None when
/// the row reported no state change; placeholder statuses never reach this
/// type (the loader's SQL filter excludes them).
#[derive(Clone, Debug)]
pub struct StatusEvent {
    pub partition_key: String,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: Option<String>,
    pub entity_type: Option<String>,
    pub name: Option<String>,
    pub ref_device: Option<String>,
}

/// Entity IDs are scoped per service path, so both parts identify a spot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub partition_key: String,
    pub entity_id: String,
}

/// Hour-aligned half-open computation window, split into `hours()` buckets
/// `[start + i·1h, start + (i+1)·1h)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }

    pub fn bucket(&self, index: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start + ChronoDuration::hours(index);
        (start, start + ChronoDuration::hours(1))
    }
}

/// Fold accumulator for one entity. Descriptive fields are sticky: once
/// non-null they are only ever replaced by a later non-null value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityState {
    pub status: String,
    pub entity_type: Option<String>,
    pub name: Option<String>,
    pub ref_device: Option<String>,
}

impl EntityState {
    /// Seed used when no event precedes the window.
    pub fn free() -> Self {
        Self {
            status: STATUS_FREE.to_string(),
            entity_type: None,
            name: None,
            ref_device: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.status == STATUS_OCCUPIED
    }

    /// Sticky-field update; null event fields leave the current values alone.
    pub fn absorb_fields(&mut self, event: &StatusEvent) {
        if let Some(entity_type) = &event.entity_type {
            self.entity_type = Some(entity_type.clone());
        }
        if let Some(name) = &event.name {
            self.name = Some(name.clone());
        }
        if let Some(ref_device) = &event.ref_device {
            self.ref_device = Some(ref_device.clone());
        }
    }

    /// A null status means "no state change reported" and is ignored.
    pub fn apply_status(&mut self, event: &StatusEvent) {
        if let Some(status) = &event.status {
            self.status = status.clone();
        }
    }
}

/// Write-once output row, one per entity per bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyRecord {
    pub bucket_start: DateTime<Utc>,
    pub entity_id: String,
    pub entity_type: Option<String>,
    pub partition_key: String,
    pub name: Option<String>,
    pub ref_device: Option<String>,
    pub occupancy_percent: i32,
}
