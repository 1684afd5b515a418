//! Full-screen mode, started when no subcommand is given.

use anyhow::Result;
use sdesk_core::Config;

#[cfg(feature = "tui")]
pub async fn run(config: &Config) -> Result<()> {
    let auth = super::open_auth(config)?;
    sdesk_tui::run(config, auth).await
}

#[cfg(not(feature = "tui"))]
#[allow(clippy::unused_async)]
pub async fn run(_config: &Config) -> Result<()> {
    anyhow::bail!("This build has no interactive client. Use `sdesk --help`.")
}
