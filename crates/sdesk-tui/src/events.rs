//! UI event types.
//!
//! Every input the reducer sees is a `UiEvent`: terminal input, timer
//! ticks and results of backend calls. Backend results travel through the
//! runtime inbox wrapped in `TaskCompleted`, so the reducer can drop the
//! ones whose task is no longer active.

use crossterm::event::Event as CrosstermEvent;
use sdesk_core::ApiError;
use sdesk_core::models::{Company, CostReport, Page, Project, ProjectListing, ProjectTicket};
use sdesk_core::session::Principal;

use crate::common::{TaskCompleted, TaskKind, TaskStarted};

#[derive(Debug)]
pub enum UiEvent {
    /// Timer tick for the spinner and redraws.
    Tick,

    /// Current terminal size, sent before the other events of a frame.
    Frame { width: u16, height: u16 },

    Terminal(CrosstermEvent),

    TaskStarted {
        kind: TaskKind,
        started: TaskStarted,
    },

    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<Box<UiEvent>>,
    },

    /// A task was cancelled before producing a result.
    TaskCancelled,

    Auth(AuthUiEvent),

    Data(DataUiEvent),
}

impl UiEvent {
    /// Whether this is a backend result reporting that the session ended.
    pub fn ends_session(&self) -> bool {
        match self {
            UiEvent::Data(event) => event.error().is_some_and(ApiError::is_session_expired),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub enum AuthUiEvent {
    LoginFinished(Result<Principal, ApiError>),
    /// Message to show after a password reset request.
    ResetRequested(Result<String, ApiError>),
    /// Local teardown outcome; remote failures are already ignored.
    LoggedOut(Result<(), String>),
}

#[derive(Debug)]
pub enum DataUiEvent {
    CompaniesLoaded(Result<Page<Company>, ApiError>),
    CompanyLoaded {
        id: u64,
        result: Result<(Company, Vec<Project>), ApiError>,
    },
    ProjectsLoaded(Result<ProjectListing, ApiError>),
    ProjectLoaded {
        id: u64,
        result: Result<(Project, Page<ProjectTicket>), ApiError>,
    },
    CostReportLoaded {
        id: u64,
        result: Result<CostReport, ApiError>,
    },
    /// A toggle or delete finished; carries the message to flash.
    Mutated(Result<Mutation, ApiError>),
}

impl DataUiEvent {
    fn error(&self) -> Option<&ApiError> {
        match self {
            DataUiEvent::CompaniesLoaded(Err(err))
            | DataUiEvent::ProjectsLoaded(Err(err))
            | DataUiEvent::Mutated(Err(err))
            | DataUiEvent::CompanyLoaded { result: Err(err), .. }
            | DataUiEvent::ProjectLoaded { result: Err(err), .. }
            | DataUiEvent::CostReportLoaded { result: Err(err), .. } => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Mutation {
    ProjectToggled(Project),
    CompanyDeleted { id: u64, message: String },
    ProjectDeleted { id: u64, message: String },
}
