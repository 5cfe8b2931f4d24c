mod cli;
mod config;
mod db;
mod engine;
mod store;

use crate::cli::Args;
use crate::config::RunContext;
use anyhow::Result;
use clap::Parser;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,occupancy_aggregator=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing()?;

    let ctx = RunContext::from_args(&args)?;
    tracing::info!(
        schema = %ctx.schema,
        start = %ctx.window.start,
        end = %ctx.window.end,
        hours = ctx.window.hours(),
        dry_run = ctx.dry_run,
        "computing occupancy"
    );

    let pool = db::build_pool(&ctx.database_url, ctx.concurrency as u32 + 2).await?;
    let summary = engine::run(&pool, &ctx).await?;
    tracing::info!(
        events = summary.events,
        entities = summary.entities,
        records = summary.records,
        "run complete"
    );
    Ok(())
}
