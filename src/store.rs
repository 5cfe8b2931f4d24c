pub mod loader;
pub mod prior;
pub mod sink;

#[cfg(test)]
mod tests;

use crate::config::RunContext;
use anyhow::{bail, Context, Result};
use std::future::Future;

/// Every database call runs under the run's I/O deadline; expiry is fatal for
/// the run, never retried here.
pub(crate) async fn with_deadline<T, F>(ctx: &RunContext, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(ctx.io_timeout(), fut).await {
        Ok(result) => result.with_context(|| format!("{what} failed")),
        Err(_) => bail!("{what} timed out after {}s", ctx.io_timeout_secs),
    }
}
