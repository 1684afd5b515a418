//! Full-screen terminal client for sdesk.

pub mod common;
pub mod effects;
pub mod events;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, Write, stderr, stdout};

use anyhow::Result;
pub use runtime::TuiRuntime;
use sdesk_core::config::{Config, paths};
use sdesk_core::{AuthContext, logging};

use crate::state::PageSizes;

/// Runs the interactive client until the user quits.
///
/// Logs go to a daily file under the sdesk home, since stderr belongs to
/// the alternate screen.
pub async fn run(config: &Config, auth: AuthContext) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The interactive client requires a terminal.\n\
             Use `sdesk --help` for the non-interactive commands."
        );
    }

    let _log_guard = logging::init_file(&config.log, &paths::logs_dir())?;
    tracing::info!(
        base_url = %auth.client().base_url(),
        authenticated = auth.session().is_authenticated(),
        "starting tui"
    );

    let mut runtime = TuiRuntime::new(auth, PageSizes::from_config(config))?;
    let result = runtime.run();
    drop(runtime);

    writeln!(stderr(), "Até logo!")?;
    result
}
