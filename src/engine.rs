mod fold;
pub mod timeline;
pub mod types;

use crate::config::RunContext;
use crate::store;
use anyhow::Result;
use futures::{StreamExt, TryStreamExt};
use sqlx::PgPool;
use self::timeline::EventIndex;
use self::types::OccupancyRecord;

pub const STATUS_OCCUPIED: &str = "occupied";
pub const STATUS_FREE: &str = "free";

#[derive(Debug)]
pub struct RunSummary {
    pub events: usize,
    pub entities: usize,
    pub records: usize,
}

/// One full computation run: load all events for the window, group them per
/// entity, seed each fold from the last pre-window status and emit one record
/// per entity per hour. Entities are independent, so their prior-state
/// lookups and folds run concurrently (bounded by `ctx.concurrency`) while
/// each entity's own bucket sequence stays strictly ordered.
pub async fn run(pool: &PgPool, ctx: &RunContext) -> Result<RunSummary> {
    let events = store::loader::load(pool, ctx).await?;
    let event_count = events.len();

    let index = EventIndex::from_events(events);
    let entity_count = index.entity_count();
    tracing::info!(
        events = event_count,
        entities = entity_count,
        "loaded status events"
    );

    let folds: Vec<Vec<OccupancyRecord>> =
        futures::stream::iter(index.iter().map(|(key, entity_timeline)| async move {
            let seed = store::prior::prior_state(pool, ctx, key).await?;
            Ok::<_, anyhow::Error>(fold::fold_entity(key, entity_timeline, seed, &ctx.window))
        }))
        .buffered(ctx.concurrency)
        .try_collect()
        .await?;

    let records: Vec<OccupancyRecord> = folds.into_iter().flatten().collect();
    tracing::info!(records = records.len(), "occupancy computed");

    store::sink::store(pool, ctx, &records).await?;

    Ok(RunSummary {
        events: event_count,
        entities: entity_count,
        records: records.len(),
    })
}
