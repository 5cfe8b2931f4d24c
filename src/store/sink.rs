use crate::config::RunContext;
use crate::engine::types::OccupancyRecord;
use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Persists the run's records in chunks of `ctx.chunk_size`. Chunking is a
/// throughput concern only; it carries no semantics. Batches are not
/// transactional across chunks: a mid-run failure can leave the window
/// partially stored, which is surfaced with enough detail for a targeted
/// re-run rather than retried.
pub async fn store(pool: &PgPool, ctx: &RunContext, records: &[OccupancyRecord]) -> Result<()> {
    if records.is_empty() {
        tracing::info!("no occupancy records to store");
        return Ok(());
    }
    if ctx.dry_run {
        tracing::info!(records = records.len(), "dry run mode, no data will be stored");
        return Ok(());
    }

    for (chunk_index, chunk) in records.chunks(ctx.chunk_size).enumerate() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {}.etparkingoccupancy \
             (occupancy, time_index, entity_id, entity_type, fiware_servicepath, name, refdevice) ",
            ctx.schema
        ));
        builder.push_values(chunk.iter(), |mut b, record| {
            b.push_bind(record.occupancy_percent)
                .push_bind(record.bucket_start)
                .push_bind(&record.entity_id)
                .push_bind(record.entity_type.as_deref())
                .push_bind(&record.partition_key)
                .push_bind(record.name.as_deref())
                .push_bind(record.ref_device.as_deref());
        });

        super::with_deadline(ctx, "occupancy insert", builder.build().execute(pool))
            .await
            .with_context(|| format!("storing chunk {chunk_index} ({})", chunk_span(chunk)))?;
        tracing::debug!(chunk = chunk_index, rows = chunk.len(), "stored occupancy chunk");
    }

    tracing::info!(records = records.len(), "occupancy stored");
    Ok(())
}

fn chunk_span(chunk: &[OccupancyRecord]) -> String {
    match (chunk.first(), chunk.last()) {
        (Some(first), Some(last)) => format!(
            "{} rows, {} in {} at {} through {} in {} at {}",
            chunk.len(),
            first.entity_id,
            first.partition_key,
            first.bucket_start,
            last.entity_id,
            last.partition_key,
            last.bucket_start
        ),
        _ => "empty chunk".to_string(),
    }
}
