use super::types::{EntityKey, StatusEvent, TimeWindow};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One entity's events, ascending by timestamp. Load order is time order, so
/// grouping preserves it.
#[derive(Debug, Default)]
pub struct EntityTimeline {
    events: Vec<StatusEvent>,
}

impl EntityTimeline {
    #[cfg(test)]
    pub fn from_sorted(events: Vec<StatusEvent>) -> Self {
        Self { events }
    }

    /// Events with `start <= timestamp < end`, via binary search. An event
    /// exactly on a bucket boundary belongs to the bucket it starts.
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[StatusEvent] {
        let lo = self.events.partition_point(|e| e.timestamp < start);
        let hi = self.events.partition_point(|e| e.timestamp < end);
        &self.events[lo..hi]
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// All loaded events grouped once by (service path, entity), replacing the
/// per-bucket rescans of the full dataset with indexed lookups.
#[derive(Debug, Default)]
pub struct EventIndex {
    timelines: HashMap<EntityKey, EntityTimeline>,
    // First-seen order, for deterministic output.
    order: Vec<EntityKey>,
}

impl EventIndex {
    pub fn from_events(events: Vec<StatusEvent>) -> Self {
        let mut index = Self::default();
        for event in events {
            let key = EntityKey {
                partition_key: event.partition_key.clone(),
                entity_id: event.entity_id.clone(),
            };
            index
                .timelines
                .entry(key.clone())
                .or_insert_with(|| {
                    index.order.push(key);
                    EntityTimeline::default()
                })
                .events
                .push(event);
        }
        index
    }

    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &EntityTimeline)> {
        self.order.iter().map(|key| (key, &self.timelines[key]))
    }
}

/// Loader contract checks: rows must be ascending and inside the closed
/// requested range. Violations are caller bugs surfaced loudly, not data to
/// be repaired.
pub fn check_event_contract(
    event: &StatusEvent,
    window: &TimeWindow,
    last_seen: Option<DateTime<Utc>>,
) -> Result<(), ContractViolation> {
    if event.timestamp < window.start || event.timestamp > window.end {
        return Err(ContractViolation::OutOfWindow {
            partition_key: event.partition_key.clone(),
            entity_id: event.entity_id.clone(),
            timestamp: event.timestamp,
            start: window.start,
            end: window.end,
        });
    }
    if let Some(last_seen) = last_seen {
        if event.timestamp < last_seen {
            return Err(ContractViolation::OutOfOrder {
                partition_key: event.partition_key.clone(),
                entity_id: event.entity_id.clone(),
                timestamp: event.timestamp,
                last_seen,
            });
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ContractViolation {
    #[error(
        "event for {entity_id} in {partition_key} at {timestamp} \
         outside requested window [{start}, {end}]"
    )]
    OutOfWindow {
        partition_key: String,
        entity_id: String,
        timestamp: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error(
        "event for {entity_id} in {partition_key} at {timestamp} \
         arrived after a row at {last_seen}; loader must order by time ascending"
    )]
    OutOfOrder {
        partition_key: String,
        entity_id: String,
        timestamp: DateTime<Utc>,
        last_seen: DateTime<Utc>,
    },
}
