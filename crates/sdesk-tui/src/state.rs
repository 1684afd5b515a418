//! Application state.
//!
//! ```text
//! AppState
//! ├── route: Route              (login or main screen)
//! ├── principal: Option<Principal>
//! ├── login: LoginForm          (fields + LoginPhase)
//! ├── sidebar / focus / screen  (main screen)
//! ├── input: InputMode          (search line, delete confirmation)
//! ├── flash: Option<Flash>      (last message shown in the footer)
//! ├── task_seq / tasks          (backend call lifecycle)
//! └── should_quit
//! ```

use sdesk_core::config::Config;
use sdesk_core::models::{
    Company, CompanyQuery, CostReport, Page, Project, ProjectListing, ProjectQuery, ProjectTicket,
    TicketQuery,
};
use sdesk_core::policy;
use sdesk_core::session::Principal;
use sdesk_core::views::{self, BadgeCounts, LoginPhase, MenuEntry, MenuKey, Route};

use crate::common::{TaskSeq, Tasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub companies: u32,
    pub projects: u32,
    pub tickets: u32,
}

impl PageSizes {
    pub fn from_config(config: &Config) -> Self {
        Self {
            companies: config.companies_page_size.max(1),
            projects: config.projects_page_size.max(1),
            tickets: config.tickets_page_size.max(1),
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub field: LoginField,
    pub phase: LoginPhase,
    /// Informational line under the form (password reset outcome).
    pub notice: Option<String>,
}

impl LoginForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sidebar {
    pub selected: usize,
    pub active: MenuKey,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self {
            selected: 0,
            active: MenuKey::Dashboard,
        }
    }
}

/// Where Esc leads from a detail screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Back {
    Sidebar,
    Companies(CompanyQuery),
    Projects(ProjectQuery),
    Company(u64),
}

#[derive(Debug, Clone, Default)]
pub struct CompanyList {
    pub query: CompanyQuery,
    pub page: Option<Page<Company>>,
    pub selected: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompanyDetail {
    pub id: u64,
    pub company: Option<Company>,
    pub projects: Vec<Project>,
    pub selected: usize,
    pub missing: bool,
    pub back: Back,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectList {
    pub query: ProjectQuery,
    pub listing: Option<ProjectListing>,
    pub selected: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub id: u64,
    pub project: Option<Project>,
    pub tickets_query: TicketQuery,
    pub tickets: Option<Page<ProjectTicket>>,
    pub cost: Option<CostReport>,
    pub missing: bool,
    pub back: Back,
}

#[derive(Debug, Clone)]
pub enum Screen {
    Dashboard,
    Companies(CompanyList),
    CompanyDetail(CompanyDetail),
    Projects(ProjectList),
    ProjectDetail(ProjectDetail),
    /// Menu entry without a terminal screen yet.
    Placeholder(&'static str),
}

/// A destructive action waiting for `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteCompany { id: u64, name: String },
    DeleteProject { id: u64, name: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteCompany { name, .. } => {
                format!("Excluir a empresa \"{name}\"? (y/n)")
            }
            PendingAction::DeleteProject { name, .. } => {
                format!("Excluir o projeto \"{name}\"? (y/n)")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Search(String),
    Confirm(PendingAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

pub struct AppState {
    pub route: Route,
    pub principal: Option<Principal>,
    pub login: LoginForm,
    pub sidebar: Sidebar,
    pub focus: Focus,
    pub screen: Screen,
    pub input: InputMode,
    pub flash: Option<Flash>,
    pub page_sizes: PageSizes,
    pub task_seq: TaskSeq,
    pub tasks: Tasks,
    pub spinner_frame: usize,
    pub terminal_size: (u16, u16),
    pub should_quit: bool,
}

impl AppState {
    /// Starts on the dashboard when a session was hydrated, otherwise on
    /// the login screen.
    pub fn new(principal: Option<Principal>, page_sizes: PageSizes) -> Self {
        let route = views::initial_route(principal.as_ref());
        Self {
            route,
            principal,
            login: LoginForm::default(),
            sidebar: Sidebar::default(),
            focus: Focus::Sidebar,
            screen: Screen::Dashboard,
            input: InputMode::Normal,
            flash: None,
            page_sizes,
            task_seq: TaskSeq::default(),
            tasks: Tasks::default(),
            spinner_frame: 0,
            terminal_size: (0, 0),
            should_quit: false,
        }
    }

    /// Sidebar entries for the current principal.
    pub fn menu(&self) -> Vec<MenuEntry> {
        self.principal.as_ref().map_or_else(Vec::new, |p| {
            views::menu_for(p.role, self.sidebar.active, &BadgeCounts::default())
        })
    }

    pub fn flash_info(&mut self, text: impl Into<String>) {
        self.flash = Some(Flash {
            kind: FlashKind::Info,
            text: text.into(),
        });
    }

    pub fn flash_error(&mut self, text: impl Into<String>) {
        self.flash = Some(Flash {
            kind: FlashKind::Error,
            text: text.into(),
        });
    }

    pub fn company_query(&self, page: u32, search: Option<String>) -> CompanyQuery {
        CompanyQuery {
            page,
            per_page: self.page_sizes.companies,
            search,
            only_active: None,
        }
    }

    /// Project listing query, scoped to the principal's company for
    /// client roles.
    pub fn project_query(&self, page: u32, search: Option<String>) -> ProjectQuery {
        ProjectQuery {
            page,
            per_page: self.page_sizes.projects,
            search,
            company_id: self.principal.as_ref().and_then(policy::listing_company),
            is_active: None,
            show_inactive: true,
        }
    }

    pub fn ticket_query(&self, page: u32) -> TicketQuery {
        TicketQuery {
            page,
            per_page: self.page_sizes.tickets,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sdesk_core::session::Role;

    use super::*;

    fn app(role: Role, company_id: Option<u64>) -> AppState {
        let principal = Principal {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@acme.com".to_string(),
            role,
            company_id,
            agent_id: None,
            access_token: "t1".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            issued_at: Utc::now(),
        };
        AppState::new(Some(principal), PageSizes::default())
    }

    #[test]
    fn test_menu_has_no_badges_yet() {
        let menu = app(Role::SupportAgent, None).menu();
        assert!(!menu.is_empty());
        assert!(menu.iter().all(|entry| entry.badge.is_none()));

        let logged_out = AppState::new(None, PageSizes::default());
        assert!(logged_out.menu().is_empty());
    }

    #[test]
    fn test_project_query_scoped_for_everyone_but_super_admin() {
        assert_eq!(app(Role::SuperAdmin, Some(1)).project_query(1, None).company_id, None);
        assert_eq!(app(Role::SupportAgent, Some(2)).project_query(1, None).company_id, Some(2));
        assert_eq!(app(Role::SupportAgent, None).project_query(1, None).company_id, None);
        assert_eq!(app(Role::ClientUser, Some(4)).project_query(1, None).company_id, Some(4));
    }
}
