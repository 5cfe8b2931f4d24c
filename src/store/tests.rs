use crate::config::RunContext;
use crate::engine;
use crate::engine::types::TimeWindow;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::env;

async fn setup_test_pool(database_url: &str, schema: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
        .execute(&pool)
        .await?;
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&pool)
        .await?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE {}.etparkingspot (
            entity_id text not null,
            entity_type text null,
            time_index timestamptz not null,
            fiware_servicepath text not null,
            status text null,
            name text null,
            refdevice text null
        )
        "#,
        schema
    ))
    .execute(&pool)
    .await?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE {}.etparkingoccupancy (
            occupancy int not null,
            time_index timestamptz not null,
            entity_id text not null,
            entity_type text null,
            fiware_servicepath text not null,
            name text null,
            refdevice text null
        )
        "#,
        schema
    ))
    .execute(&pool)
    .await?;
    Ok(pool)
}

async fn insert_event(
    pool: &PgPool,
    schema: &str,
    entity_id: &str,
    time_index: DateTime<Utc>,
    status: Option<&str>,
    entity_type: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {}.etparkingspot \
         (entity_id, entity_type, time_index, fiware_servicepath, status, name, refdevice) \
         VALUES ($1, $2, $3, '/parking', $4, $5, NULL)",
        schema
    ))
    .bind(entity_id)
    .bind(entity_type)
    .bind(time_index)
    .bind(status)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_occupancy_end_to_end() -> Result<()> {
    if env::var("OCCUPANCY_INTEGRATION_TEST").ok().as_deref() != Some("1") {
        return Ok(());
    }
    let database_url = match env::var("OCCUPANCY_TEST_DATABASE_URL") {
        Ok(value) => value,
        Err(_) => return Ok(()),
    };

    let schema = format!("occupancy_test_{}", std::process::id());
    let pool = setup_test_pool(&database_url, &schema).await?;

    let end = Utc::now().duration_trunc(ChronoDuration::hours(1))?;
    let start = end - ChronoDuration::hours(2);

    // spot-1: occupied before the window, freed 30 minutes in.
    insert_event(
        &pool,
        &schema,
        "spot-1",
        start - ChronoDuration::minutes(30),
        Some("occupied"),
        Some("ParkingSpot"),
        Some("A-1"),
    )
    .await?;
    insert_event(
        &pool,
        &schema,
        "spot-1",
        start + ChronoDuration::minutes(30),
        Some("free"),
        None,
        None,
    )
    .await?;
    // spot-2: no prior state, becomes occupied halfway through hour two.
    insert_event(
        &pool,
        &schema,
        "spot-2",
        start + ChronoDuration::minutes(90),
        Some("occupied"),
        None,
        None,
    )
    .await?;
    // Placeholder rows must never reach the engine.
    insert_event(
        &pool,
        &schema,
        "spot-1",
        start + ChronoDuration::minutes(45),
        Some("unknown"),
        None,
        None,
    )
    .await?;

    let ctx = RunContext {
        database_url: database_url.clone(),
        schema: schema.clone(),
        window: TimeWindow { start, end },
        dry_run: false,
        // Small enough to exercise chunking and pagination.
        chunk_size: 3,
        page_size: 2,
        concurrency: 4,
        io_timeout_secs: 30,
    };

    let summary = engine::run(&pool, &ctx).await?;
    assert_eq!(summary.events, 2);
    assert_eq!(summary.entities, 2);
    assert_eq!(summary.records, 4);

    let rows = sqlx::query(&format!(
        "SELECT occupancy, entity_id, name FROM {}.etparkingoccupancy \
         ORDER BY entity_id, time_index",
        schema
    ))
    .fetch_all(&pool)
    .await?;

    let mut got: Vec<(String, i32, Option<String>)> = Vec::new();
    for row in &rows {
        got.push((
            row.try_get("entity_id")?,
            row.try_get("occupancy")?,
            row.try_get("name")?,
        ));
    }
    assert_eq!(
        got,
        vec![
            // Prior state "occupied", freed at +30m; name sticks from the
            // pre-window row.
            ("spot-1".to_string(), 50, Some("A-1".to_string())),
            ("spot-1".to_string(), 0, Some("A-1".to_string())),
            // No prior state: free until +90m.
            ("spot-2".to_string(), 0, None),
            ("spot-2".to_string(), 50, None),
        ]
    );

    // Dry run computes but stores nothing.
    sqlx::query(&format!("TRUNCATE {}.etparkingoccupancy", schema))
        .execute(&pool)
        .await?;
    let dry_ctx = RunContext {
        dry_run: true,
        ..ctx
    };
    let summary = engine::run(&pool, &dry_ctx).await?;
    assert_eq!(summary.records, 4);
    let count: i64 = sqlx::query(&format!(
        "SELECT count(*) AS n FROM {}.etparkingoccupancy",
        schema
    ))
    .fetch_one(&pool)
    .await?
    .try_get("n")?;
    assert_eq!(count, 0);

    sqlx::query(&format!("DROP SCHEMA {} CASCADE", schema))
        .execute(&pool)
        .await?;
    Ok(())
}
