//! CLI command handlers.

pub mod auth;
pub mod companies;
pub mod config;
pub mod interactive;
pub mod navigation;
pub mod projects;

use anyhow::{Context, Result, anyhow};
use comfy_table::{ContentArrangement, Table};
use sdesk_core::session::Principal;
use sdesk_core::{ApiClient, ApiError, AuthContext, Config, Session, SessionStore};

const NOT_LOGGED_IN: &str = "Você não está autenticado. Execute `sdesk login`.";

/// Hydrates the stored session and wires the client around it.
pub fn open_auth(config: &Config) -> Result<AuthContext> {
    let session = Session::open(SessionStore::default_location()).context("open session")?;
    let client = ApiClient::from_config(config, session).context("create api client")?;
    Ok(AuthContext::new(client))
}

pub fn require_principal(auth: &AuthContext) -> Result<Principal> {
    auth.principal().ok_or_else(|| anyhow!(NOT_LOGGED_IN))
}

/// Turns a backend failure into the message the user sees, followed by
/// one line per invalid field.
pub fn api_error(err: &ApiError, fallback: &str) -> anyhow::Error {
    let mut message = err.user_message(fallback);
    if let Some(fields) = err.field_errors() {
        for (field, problem) in fields {
            message.push_str(&format!("\n  {field}: {problem}"));
        }
    }
    anyhow!(message)
}

pub fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn status_label(active: bool) -> &'static str {
    if active { "Ativo" } else { "Inativo" }
}
