use crate::config::RunContext;
use crate::engine::types::{EntityKey, EntityState};
use anyhow::{Context, Result};
use sqlx::{PgPool, Row};

/// Most recent non-placeholder status strictly before the window start,
/// seeding the entity's fold. No matching row is the normal "assume free,
/// fields unset" branch, not an error. A row whose status is NULL reported
/// no state and also seeds "free", but its descriptive fields still stick.
pub async fn prior_state(pool: &PgPool, ctx: &RunContext, key: &EntityKey) -> Result<EntityState> {
    let query = format!(
        "SELECT status, entity_type, name, refdevice \
         FROM {}.etparkingspot \
         WHERE time_index < $1 AND entity_id = $2 AND fiware_servicepath = $3 \
           AND status != 'None' AND status != 'unknown' \
         ORDER BY time_index DESC LIMIT 1",
        ctx.schema
    );

    let row = super::with_deadline(
        ctx,
        "prior-state query",
        sqlx::query(&query)
            .bind(ctx.window.start)
            .bind(&key.entity_id)
            .bind(&key.partition_key)
            .fetch_optional(pool),
    )
    .await
    .with_context(|| {
        format!(
            "resolving prior state for {} in {}",
            key.entity_id, key.partition_key
        )
    })?;

    let Some(row) = row else {
        return Ok(EntityState::free());
    };

    let mut state = EntityState::free();
    if let Some(status) = row.try_get::<Option<String>, _>("status")? {
        state.status = status;
    }
    state.entity_type = row.try_get::<Option<String>, _>("entity_type")?;
    state.name = row.try_get::<Option<String>, _>("name")?;
    state.ref_device = row.try_get::<Option<String>, _>("refdevice")?;
    Ok(state)
}
