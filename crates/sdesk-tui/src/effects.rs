//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! Every backend call carries the task id the reducer claimed for it.

use sdesk_core::models::{CompanyQuery, ProjectQuery, TicketQuery};
use tokio_util::sync::CancellationToken;

use crate::common::TaskId;

#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Cancel a task that no screen is waiting for anymore.
    CancelTask { token: CancellationToken },

    /// Authenticate with the typed credentials.
    Login {
        task: TaskId,
        email: String,
        password: String,
    },

    /// Ask the backend to mail a password reset link.
    RequestPasswordReset { task: TaskId, email: String },

    /// Best-effort remote logout followed by the local teardown.
    Logout { task: TaskId },

    FetchCompanies { task: TaskId, query: CompanyQuery },

    /// Company record plus its projects.
    FetchCompany { task: TaskId, id: u64 },

    FetchProjects { task: TaskId, query: ProjectQuery },

    /// Project record plus one page of its tickets.
    FetchProject {
        task: TaskId,
        id: u64,
        tickets: TicketQuery,
    },

    FetchCostReport { task: TaskId, id: u64 },

    ToggleProject { task: TaskId, id: u64 },

    DeleteCompany { task: TaskId, id: u64 },

    DeleteProject { task: TaskId, id: u64 },
}
