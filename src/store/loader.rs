use crate::config::RunContext;
use crate::engine::timeline::check_event_contract;
use crate::engine::types::StatusEvent;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Loads every non-placeholder status event in the closed window, ascending
/// by time, paging until a page yields zero new rows. Rows are validated
/// against the loader contract as they arrive; a bad row fails the run
/// loudly instead of being dropped or misattributed.
pub async fn load(pool: &PgPool, ctx: &RunContext) -> Result<Vec<StatusEvent>> {
    let query = format!(
        "SELECT status, time_index, entity_id, entity_type, fiware_servicepath, name, refdevice \
         FROM {}.etparkingspot \
         WHERE time_index >= $1 AND time_index <= $2 \
           AND status != 'None' AND status != 'unknown' \
         ORDER BY time_index ASC LIMIT $3 OFFSET $4",
        ctx.schema
    );

    let mut events: Vec<StatusEvent> = Vec::new();
    let mut offset: i64 = 0;
    loop {
        let rows = super::with_deadline(
            ctx,
            "event page load",
            sqlx::query(&query)
                .bind(ctx.window.start)
                .bind(ctx.window.end)
                .bind(ctx.page_size)
                .bind(offset)
                .fetch_all(pool),
        )
        .await
        .with_context(|| format!("loading events from {} at offset {offset}", ctx.schema))?;

        if rows.is_empty() {
            break;
        }
        let page_len = rows.len();
        for row in rows {
            let event = row_to_event(&row)?;
            let last_seen = events.last().map(|e| e.timestamp);
            check_event_contract(&event, &ctx.window, last_seen)
                .context("event loader returned a row violating its contract")?;
            events.push(event);
        }
        tracing::debug!(
            offset,
            page = page_len,
            total = events.len(),
            "loaded event page"
        );
        offset += ctx.page_size;
    }

    Ok(events)
}

fn row_to_event(row: &PgRow) -> Result<StatusEvent> {
    Ok(StatusEvent {
        partition_key: row.try_get::<String, _>("fiware_servicepath")?,
        entity_id: row.try_get::<String, _>("entity_id")?,
        timestamp: row.try_get::<DateTime<Utc>, _>("time_index")?,
        status: row.try_get::<Option<String>, _>("status")?,
        entity_type: row.try_get::<Option<String>, _>("entity_type")?,
        name: row.try_get::<Option<String>, _>("name")?,
        ref_device: row.try_get::<Option<String>, _>("refdevice")?,
    })
}
