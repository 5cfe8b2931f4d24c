use chrono::{DateTime, Utc};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "occupancy-aggregator",
    version,
    about = "Hourly parking-spot occupancy from status events"
)]
pub struct Args {
    /// Database host; ignored when DATABASE_URL is set.
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    /// Tenant name; the schema is "mt" + lowercased tenant.
    #[arg(long, default_value = "dietikon")]
    pub tenant_name: String,
    /// Window start (RFC 3339); defaults to end minus --delta-hours.
    #[arg(long)]
    pub start_date: Option<DateTime<Utc>>,
    /// Window end (RFC 3339); defaults to now.
    #[arg(long)]
    pub end_date: Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 24)]
    pub delta_hours: i64,
    /// Compute occupancy but do not write results.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// Rows per INSERT batch.
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,
    /// Rows per SELECT page while loading events.
    #[arg(long, default_value_t = 1000)]
    pub page_size: i64,
    /// Entities folded concurrently (prior-state lookups overlap).
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
    /// Deadline for each database call.
    #[arg(long, default_value_t = 30)]
    pub io_timeout_secs: u64,
}
