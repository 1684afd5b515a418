//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use std::mem;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use sdesk_core::ApiError;
use sdesk_core::auth::{EMAIL_REQUIRED, LOGIN_FAILED};
use sdesk_core::error::SESSION_EXPIRED_MESSAGE;
use sdesk_core::models::{CompanyQuery, ProjectQuery};
use sdesk_core::policy::{self, Action, Resource};
use sdesk_core::session::Principal;
use sdesk_core::views::{LoginPhase, MenuKey, Route};

use crate::common::{TaskId, TaskKind};
use crate::effects::UiEffect;
use crate::events::{AuthUiEvent, DataUiEvent, Mutation, UiEvent};
use crate::state::{
    AppState, Back, CompanyDetail, CompanyList, Focus, InputMode, PendingAction, ProjectDetail,
    ProjectList, Screen, Sidebar,
};

const COMPANIES_LOAD_FAILED: &str = "Erro ao carregar empresas";
const COMPANY_LOAD_FAILED: &str = "Erro ao carregar empresa";
const PROJECTS_LOAD_FAILED: &str = "Erro ao carregar projetos";
const PROJECT_LOAD_FAILED: &str = "Erro ao carregar projeto";
const COST_REPORT_FAILED: &str = "Erro ao carregar relatório de custos";
const MUTATION_FAILED: &str = "Erro ao executar a operação";
const NO_COMPANY: &str = "Nenhuma empresa vinculada ao seu usuário";
const CANCELLED: &str = "Operação cancelada";

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Frame { width, height } => {
            app.terminal_size = (width, height);
            vec![]
        }
        UiEvent::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            handle_key(app, key)
        }
        UiEvent::Terminal(_) | UiEvent::TaskCancelled => vec![],
        UiEvent::TaskStarted { kind, started } => {
            app.tasks.state_mut(kind).on_started(&started);
            vec![]
        }
        UiEvent::TaskCompleted { kind, completed } => {
            if app.tasks.state_mut(kind).finish_if_active(completed.id) {
                update(app, *completed.result)
            } else if completed.result.ends_session() && app.principal.is_some() {
                // The backend session is gone even if the screen moved on.
                tracing::debug!(?kind, task = completed.id.0, "stale result ended the session");
                expire_session(app)
            } else {
                tracing::debug!(?kind, task = completed.id.0, "dropping stale result");
                vec![]
            }
        }
        UiEvent::Auth(event) => handle_auth_event(app, event),
        UiEvent::Data(event) => handle_data_event(app, event),
    }
}

// ============================================================================
// Task helpers
// ============================================================================

/// Claims a fresh task id for `kind` and builds its effect. A superseded
/// task of the same kind is cancelled.
fn spawn(
    app: &mut AppState,
    kind: TaskKind,
    make: impl FnOnce(TaskId) -> UiEffect,
) -> Vec<UiEffect> {
    let task = app.task_seq.next_id();
    let mut effects: Vec<UiEffect> = app
        .tasks
        .state_mut(kind)
        .claim(task)
        .map(|token| UiEffect::CancelTask { token })
        .into_iter()
        .collect();
    effects.push(make(task));
    effects
}

/// Switches the content pane, abandoning whatever the old screen waited for.
fn show(app: &mut AppState, screen: Screen) -> Vec<UiEffect> {
    app.screen = screen;
    app.input = InputMode::Normal;
    app.tasks
        .clear_screen()
        .into_iter()
        .map(|token| UiEffect::CancelTask { token })
        .collect()
}

fn principal(app: &AppState) -> Option<&Principal> {
    app.principal.as_ref()
}

/// Policy check that flashes the denial. Returns whether to proceed.
fn permitted(
    app: &mut AppState,
    action: Action,
    resource: Resource,
    target_company: Option<u64>,
) -> bool {
    let Some(principal) = principal(app) else {
        return false;
    };
    if policy::allows(principal, action, resource, target_company) {
        true
    } else {
        app.flash_error(policy::denied_message(action, resource));
        false
    }
}

// ============================================================================
// Keys
// ============================================================================

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return vec![UiEffect::Quit];
    }
    match app.route {
        Route::Login => handle_login_key(app, key),
        Route::Dashboard => handle_main_key(app, key),
    }
}

fn handle_login_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    match key.code {
        KeyCode::Esc => vec![UiEffect::Quit],
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.switch_field();
            vec![]
        }
        KeyCode::Backspace => {
            app.login.focused_mut().pop();
            vec![]
        }
        KeyCode::Enter => submit_login(app),
        KeyCode::F(2) => request_password_reset(app),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.login.focused_mut().push(c);
            vec![]
        }
        _ => vec![],
    }
}

fn submit_login(app: &mut AppState) -> Vec<UiEffect> {
    // A pending logout would tear down the new session when it lands.
    if app.tasks.logout.is_running() || !app.login.phase.submit() {
        return vec![];
    }
    app.login.notice = None;
    let email = app.login.email.clone();
    let password = app.login.password.clone();
    spawn(app, TaskKind::Login, |task| UiEffect::Login {
        task,
        email,
        password,
    })
}

fn request_password_reset(app: &mut AppState) -> Vec<UiEffect> {
    if app.tasks.password_reset.is_running() {
        return vec![];
    }
    let email = app.login.email.trim().to_string();
    if email.is_empty() {
        app.login.notice = Some(EMAIL_REQUIRED.to_string());
        return vec![];
    }
    app.login.notice = None;
    spawn(app, TaskKind::PasswordReset, |task| {
        UiEffect::RequestPasswordReset { task, email }
    })
}

fn handle_main_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    match mem::take(&mut app.input) {
        InputMode::Confirm(action) => return handle_confirm_key(app, key, action),
        InputMode::Search(buffer) => return handle_search_key(app, key, buffer),
        InputMode::Normal => {}
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('l') => logout(app),
            _ => vec![],
        };
    }

    match key.code {
        KeyCode::Char('q') => vec![UiEffect::Quit],
        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                Focus::Sidebar => Focus::Content,
                Focus::Content => Focus::Sidebar,
            };
            vec![]
        }
        _ => match app.focus {
            Focus::Sidebar => handle_sidebar_key(app, key),
            Focus::Content => handle_content_key(app, key),
        },
    }
}

fn handle_confirm_key(app: &mut AppState, key: KeyEvent, action: PendingAction) -> Vec<UiEffect> {
    if !matches!(key.code, KeyCode::Char('y' | 'Y')) {
        app.flash_info(CANCELLED);
        return vec![];
    }
    match action {
        PendingAction::DeleteCompany { id, .. } => {
            spawn(app, TaskKind::Mutation, |task| UiEffect::DeleteCompany { task, id })
        }
        PendingAction::DeleteProject { id, .. } => {
            spawn(app, TaskKind::Mutation, |task| UiEffect::DeleteProject { task, id })
        }
    }
}

fn handle_search_key(app: &mut AppState, key: KeyEvent, mut buffer: String) -> Vec<UiEffect> {
    match key.code {
        KeyCode::Esc => vec![],
        KeyCode::Enter => {
            let search = Some(buffer.trim().to_string()).filter(|s| !s.is_empty());
            match &app.screen {
                Screen::Companies(_) => {
                    let query = app.company_query(1, search);
                    open_companies(app, query)
                }
                Screen::Projects(_) => {
                    let query = app.project_query(1, search);
                    open_projects(app, query)
                }
                _ => vec![],
            }
        }
        KeyCode::Backspace => {
            buffer.pop();
            app.input = InputMode::Search(buffer);
            vec![]
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            app.input = InputMode::Search(buffer);
            vec![]
        }
        _ => {
            app.input = InputMode::Search(buffer);
            vec![]
        }
    }
}

fn handle_sidebar_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let menu = app.menu();
    if menu.is_empty() {
        return vec![];
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.sidebar.selected = app.sidebar.selected.saturating_sub(1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.sidebar.selected = (app.sidebar.selected + 1).min(menu.len() - 1);
            vec![]
        }
        KeyCode::Enter | KeyCode::Right => {
            let entry = &menu[app.sidebar.selected.min(menu.len() - 1)];
            let (key, label) = (entry.key, entry.label);
            open_menu(app, key, label)
        }
        _ => vec![],
    }
}

fn handle_content_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    match key.code {
        KeyCode::Esc | KeyCode::Left => go_back(app),
        KeyCode::Up | KeyCode::Char('k') => {
            move_selection(app, -1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_selection(app, 1);
            vec![]
        }
        KeyCode::Enter => open_selected(app),
        KeyCode::Char('n') => change_page(app, true),
        KeyCode::Char('p') => change_page(app, false),
        KeyCode::Char('r') => reload(app),
        KeyCode::Char('/') => {
            if matches!(app.screen, Screen::Companies(_) | Screen::Projects(_)) {
                app.input = InputMode::Search(String::new());
            }
            vec![]
        }
        KeyCode::Char('t') => toggle_selected_project(app),
        KeyCode::Char('x') => confirm_delete(app),
        KeyCode::Char('c') => load_cost_report(app),
        _ => vec![],
    }
}

// ============================================================================
// Navigation
// ============================================================================

fn open_menu(app: &mut AppState, key: MenuKey, label: &'static str) -> Vec<UiEffect> {
    app.sidebar.active = key;
    app.focus = Focus::Content;
    app.flash = None;
    match key {
        MenuKey::Dashboard => {
            app.focus = Focus::Sidebar;
            show(app, Screen::Dashboard)
        }
        MenuKey::Companies => {
            let query = app.company_query(1, None);
            open_companies(app, query)
        }
        MenuKey::Company => {
            let company_id = principal(app).and_then(|p| p.company_id);
            match company_id {
                Some(id) => open_company(app, id, Back::Sidebar),
                None => {
                    app.flash_error(NO_COMPANY);
                    app.focus = Focus::Sidebar;
                    show(app, Screen::Placeholder(label))
                }
            }
        }
        MenuKey::Projects => {
            let query = app.project_query(1, None);
            open_projects(app, query)
        }
        _ => {
            app.focus = Focus::Sidebar;
            show(app, Screen::Placeholder(label))
        }
    }
}

fn open_companies(app: &mut AppState, query: CompanyQuery) -> Vec<UiEffect> {
    if !permitted(app, Action::View, Resource::Company, None) {
        return vec![];
    }
    let mut effects = show(
        app,
        Screen::Companies(CompanyList {
            query: query.clone(),
            ..CompanyList::default()
        }),
    );
    effects.extend(spawn(app, TaskKind::Companies, |task| {
        UiEffect::FetchCompanies { task, query }
    }));
    effects
}

fn open_company(app: &mut AppState, id: u64, back: Back) -> Vec<UiEffect> {
    let mut effects = show(
        app,
        Screen::CompanyDetail(CompanyDetail {
            id,
            company: None,
            projects: Vec::new(),
            selected: 0,
            missing: false,
            back,
        }),
    );
    effects.extend(spawn(app, TaskKind::CompanyDetail, |task| {
        UiEffect::FetchCompany { task, id }
    }));
    effects
}

fn open_projects(app: &mut AppState, query: ProjectQuery) -> Vec<UiEffect> {
    if !permitted(app, Action::View, Resource::Project, query.company_id) {
        return vec![];
    }
    let mut effects = show(
        app,
        Screen::Projects(ProjectList {
            query: query.clone(),
            ..ProjectList::default()
        }),
    );
    effects.extend(spawn(app, TaskKind::Projects, |task| {
        UiEffect::FetchProjects { task, query }
    }));
    effects
}

fn open_project(app: &mut AppState, id: u64, back: Back) -> Vec<UiEffect> {
    let tickets = app.ticket_query(1);
    let mut effects = show(
        app,
        Screen::ProjectDetail(ProjectDetail {
            id,
            project: None,
            tickets_query: tickets.clone(),
            tickets: None,
            cost: None,
            missing: false,
            back,
        }),
    );
    effects.extend(spawn(app, TaskKind::ProjectDetail, |task| {
        UiEffect::FetchProject { task, id, tickets }
    }));
    effects
}

fn go_back(app: &mut AppState) -> Vec<UiEffect> {
    let back = match &app.screen {
        Screen::CompanyDetail(detail) => detail.back.clone(),
        Screen::ProjectDetail(detail) => detail.back.clone(),
        _ => Back::Sidebar,
    };
    match back {
        Back::Sidebar => {
            app.focus = Focus::Sidebar;
            vec![]
        }
        Back::Companies(query) => open_companies(app, query),
        Back::Projects(query) => open_projects(app, query),
        Back::Company(id) => open_company(app, id, Back::Sidebar),
    }
}

fn move_selection(app: &mut AppState, delta: isize) {
    let (selected, len) = match &mut app.screen {
        Screen::Companies(list) => (
            &mut list.selected,
            list.page.as_ref().map_or(0, |p| p.data.len()),
        ),
        Screen::Projects(list) => (
            &mut list.selected,
            list.listing.as_ref().map_or(0, |l| l.projects.data.len()),
        ),
        Screen::CompanyDetail(detail) => (&mut detail.selected, detail.projects.len()),
        _ => return,
    };
    if len == 0 {
        *selected = 0;
        return;
    }
    *selected = selected.saturating_add_signed(delta).min(len - 1);
}

fn open_selected(app: &mut AppState) -> Vec<UiEffect> {
    match &app.screen {
        Screen::Companies(list) => {
            let Some(company) = list.page.as_ref().and_then(|p| p.data.get(list.selected)) else {
                return vec![];
            };
            let (id, back) = (company.id, Back::Companies(list.query.clone()));
            open_company(app, id, back)
        }
        Screen::Projects(list) => {
            let Some(project) = list
                .listing
                .as_ref()
                .and_then(|l| l.projects.data.get(list.selected))
            else {
                return vec![];
            };
            let (id, back) = (project.id, Back::Projects(list.query.clone()));
            open_project(app, id, back)
        }
        Screen::CompanyDetail(detail) => {
            let Some(project) = detail.projects.get(detail.selected) else {
                return vec![];
            };
            let (id, back) = (project.id, Back::Company(detail.id));
            open_project(app, id, back)
        }
        _ => vec![],
    }
}

fn change_page(app: &mut AppState, forward: bool) -> Vec<UiEffect> {
    let step = |page: u32| {
        if forward {
            page.saturating_add(1)
        } else {
            page.saturating_sub(1).max(1)
        }
    };
    match &mut app.screen {
        Screen::Companies(list) => {
            let Some(page) = &list.page else {
                return vec![];
            };
            if (forward && !page.has_next()) || (!forward && !page.has_prev()) {
                return vec![];
            }
            let mut query = list.query.clone();
            query.page = step(page.current_page);
            open_companies(app, query)
        }
        Screen::Projects(list) => {
            let Some(listing) = &list.listing else {
                return vec![];
            };
            let page = &listing.projects;
            if (forward && !page.has_next()) || (!forward && !page.has_prev()) {
                return vec![];
            }
            let mut query = list.query.clone();
            query.page = step(page.current_page);
            open_projects(app, query)
        }
        Screen::ProjectDetail(detail) => {
            let Some(page) = &detail.tickets else {
                return vec![];
            };
            if (forward && !page.has_next()) || (!forward && !page.has_prev()) {
                return vec![];
            }
            detail.tickets_query.page = step(page.current_page);
            let (id, tickets) = (detail.id, detail.tickets_query.clone());
            spawn(app, TaskKind::ProjectDetail, |task| UiEffect::FetchProject {
                task,
                id,
                tickets,
            })
        }
        _ => vec![],
    }
}

fn reload(app: &mut AppState) -> Vec<UiEffect> {
    match &app.screen {
        Screen::Companies(list) => {
            let query = list.query.clone();
            open_companies(app, query)
        }
        Screen::Projects(list) => {
            let query = list.query.clone();
            open_projects(app, query)
        }
        Screen::CompanyDetail(detail) => {
            let (id, back) = (detail.id, detail.back.clone());
            open_company(app, id, back)
        }
        Screen::ProjectDetail(detail) => {
            let (id, back) = (detail.id, detail.back.clone());
            open_project(app, id, back)
        }
        Screen::Dashboard | Screen::Placeholder(_) => vec![],
    }
}

// ============================================================================
// Mutations
// ============================================================================

fn toggle_selected_project(app: &mut AppState) -> Vec<UiEffect> {
    let target = match &app.screen {
        Screen::Projects(list) => list
            .listing
            .as_ref()
            .and_then(|l| l.projects.data.get(list.selected))
            .map(|p| (p.id, p.company_id)),
        Screen::ProjectDetail(detail) => detail.project.as_ref().map(|p| (p.id, p.company_id)),
        _ => None,
    };
    let Some((id, company_id)) = target else {
        return vec![];
    };
    if !permitted(app, Action::ToggleActive, Resource::Project, Some(company_id)) {
        return vec![];
    }
    spawn(app, TaskKind::Mutation, |task| UiEffect::ToggleProject { task, id })
}

fn confirm_delete(app: &mut AppState) -> Vec<UiEffect> {
    let (pending, resource, company_id) = match &app.screen {
        Screen::Companies(list) => {
            let Some(c) = list.page.as_ref().and_then(|p| p.data.get(list.selected)) else {
                return vec![];
            };
            (
                PendingAction::DeleteCompany {
                    id: c.id,
                    name: c.name.clone(),
                },
                Resource::Company,
                c.id,
            )
        }
        Screen::CompanyDetail(detail) => {
            let Some(c) = &detail.company else {
                return vec![];
            };
            (
                PendingAction::DeleteCompany {
                    id: c.id,
                    name: c.name.clone(),
                },
                Resource::Company,
                c.id,
            )
        }
        Screen::Projects(list) => {
            let Some(p) = list
                .listing
                .as_ref()
                .and_then(|l| l.projects.data.get(list.selected))
            else {
                return vec![];
            };
            (
                PendingAction::DeleteProject {
                    id: p.id,
                    name: p.name.clone(),
                },
                Resource::Project,
                p.company_id,
            )
        }
        Screen::ProjectDetail(detail) => {
            let Some(p) = &detail.project else {
                return vec![];
            };
            (
                PendingAction::DeleteProject {
                    id: p.id,
                    name: p.name.clone(),
                },
                Resource::Project,
                p.company_id,
            )
        }
        Screen::Dashboard | Screen::Placeholder(_) => return vec![],
    };
    if permitted(app, Action::Delete, resource, Some(company_id)) {
        app.input = InputMode::Confirm(pending);
    }
    vec![]
}

fn load_cost_report(app: &mut AppState) -> Vec<UiEffect> {
    let Screen::ProjectDetail(detail) = &app.screen else {
        return vec![];
    };
    let Some(project) = &detail.project else {
        return vec![];
    };
    let (id, company_id) = (project.id, project.company_id);
    if !permitted(app, Action::ViewCostReport, Resource::Project, Some(company_id)) {
        return vec![];
    }
    spawn(app, TaskKind::CostReport, |task| UiEffect::FetchCostReport {
        task,
        id,
    })
}

// ============================================================================
// Auth
// ============================================================================

fn logout(app: &mut AppState) -> Vec<UiEffect> {
    let mut effects = leave_main(app);
    app.login.phase.reset();
    effects.extend(spawn(app, TaskKind::Logout, |task| UiEffect::Logout {
        task,
    }));
    effects
}

/// Back to the login screen with nothing of the previous user left.
fn leave_main(app: &mut AppState) -> Vec<UiEffect> {
    app.principal = None;
    app.route = Route::Login;
    app.sidebar = Sidebar::default();
    app.focus = Focus::Sidebar;
    app.flash = None;
    app.login.password.clear();
    app.login.notice = None;
    show(app, Screen::Dashboard)
}

fn enter_main(app: &mut AppState, principal: Principal) -> Vec<UiEffect> {
    app.principal = Some(principal);
    app.route = Route::Dashboard;
    app.sidebar = Sidebar::default();
    app.focus = Focus::Sidebar;
    app.login.password.clear();
    app.login.notice = None;
    show(app, Screen::Dashboard)
}

fn expire_session(app: &mut AppState) -> Vec<UiEffect> {
    let effects = leave_main(app);
    app.login.phase = LoginPhase::Failed(SESSION_EXPIRED_MESSAGE.to_string());
    effects
}

fn handle_auth_event(app: &mut AppState, event: AuthUiEvent) -> Vec<UiEffect> {
    match event {
        AuthUiEvent::LoginFinished(Ok(principal)) => {
            app.login.phase.succeed();
            enter_main(app, principal)
        }
        AuthUiEvent::LoginFinished(Err(err)) => {
            app.login.phase.fail(err.user_message(LOGIN_FAILED));
            vec![]
        }
        AuthUiEvent::ResetRequested(result) => {
            app.login.notice = Some(match result {
                Ok(message) => message,
                Err(err) => err.to_string(),
            });
            vec![]
        }
        AuthUiEvent::LoggedOut(Ok(())) => vec![],
        AuthUiEvent::LoggedOut(Err(message)) => {
            app.login.notice = Some(message);
            vec![]
        }
    }
}

// ============================================================================
// Data
// ============================================================================

/// Shared failure path. Session expiry wins over everything else.
fn fail(app: &mut AppState, err: &ApiError, fallback: &str) -> Vec<UiEffect> {
    if err.is_session_expired() {
        return expire_session(app);
    }
    app.flash_error(err.user_message(fallback));
    vec![]
}

fn handle_data_event(app: &mut AppState, event: DataUiEvent) -> Vec<UiEffect> {
    match event {
        DataUiEvent::CompaniesLoaded(result) => {
            let Screen::Companies(list) = &mut app.screen else {
                return vec![];
            };
            match result {
                Ok(page) => {
                    list.selected = list.selected.min(page.data.len().saturating_sub(1));
                    list.page = Some(page);
                    list.error = None;
                    vec![]
                }
                Err(err) => {
                    list.error = Some(err.user_message(COMPANIES_LOAD_FAILED));
                    fail(app, &err, COMPANIES_LOAD_FAILED)
                }
            }
        }
        DataUiEvent::CompanyLoaded { id, result } => {
            let Screen::CompanyDetail(detail) = &mut app.screen else {
                return vec![];
            };
            if detail.id != id {
                return vec![];
            }
            match result {
                Ok((company, projects)) => {
                    detail.company = Some(company);
                    detail.projects = projects;
                    detail.selected = 0;
                    vec![]
                }
                Err(err) if err.is_not_found() => {
                    detail.missing = true;
                    vec![]
                }
                Err(err) => fail(app, &err, COMPANY_LOAD_FAILED),
            }
        }
        DataUiEvent::ProjectsLoaded(result) => {
            let Screen::Projects(list) = &mut app.screen else {
                return vec![];
            };
            match result {
                Ok(listing) => {
                    list.selected = list
                        .selected
                        .min(listing.projects.data.len().saturating_sub(1));
                    list.listing = Some(listing);
                    list.error = None;
                    vec![]
                }
                Err(err) => {
                    list.error = Some(err.user_message(PROJECTS_LOAD_FAILED));
                    fail(app, &err, PROJECTS_LOAD_FAILED)
                }
            }
        }
        DataUiEvent::ProjectLoaded { id, result } => {
            let Screen::ProjectDetail(detail) = &mut app.screen else {
                return vec![];
            };
            if detail.id != id {
                return vec![];
            }
            match result {
                Ok((project, tickets)) => {
                    detail.project = Some(project);
                    detail.tickets = Some(tickets);
                    vec![]
                }
                Err(err) if err.is_not_found() => {
                    detail.missing = true;
                    vec![]
                }
                Err(err) => fail(app, &err, PROJECT_LOAD_FAILED),
            }
        }
        DataUiEvent::CostReportLoaded { id, result } => {
            let Screen::ProjectDetail(detail) = &mut app.screen else {
                return vec![];
            };
            if detail.id != id {
                return vec![];
            }
            match result {
                Ok(report) => {
                    detail.cost = Some(report);
                    vec![]
                }
                Err(err) => fail(app, &err, COST_REPORT_FAILED),
            }
        }
        DataUiEvent::Mutated(Ok(mutation)) => apply_mutation(app, mutation),
        DataUiEvent::Mutated(Err(err)) => fail(app, &err, MUTATION_FAILED),
    }
}

fn apply_mutation(app: &mut AppState, mutation: Mutation) -> Vec<UiEffect> {
    match mutation {
        Mutation::ProjectToggled(project) => {
            app.flash_info(if project.is_active {
                "Projeto ativado com sucesso!"
            } else {
                "Projeto desativado com sucesso!"
            });
            match &mut app.screen {
                Screen::Projects(list) => {
                    if let Some(slot) = list
                        .listing
                        .as_mut()
                        .and_then(|l| l.projects.data.iter_mut().find(|p| p.id == project.id))
                    {
                        *slot = project;
                    }
                }
                Screen::ProjectDetail(detail) if detail.id == project.id => {
                    detail.project = Some(project);
                }
                _ => {}
            }
            vec![]
        }
        Mutation::CompanyDeleted { id, message } => {
            app.flash_info(message);
            match &app.screen {
                Screen::CompanyDetail(detail) if detail.id == id => {
                    let back = detail.back.clone();
                    match back {
                        Back::Companies(query) => open_companies(app, query),
                        _ => {
                            app.focus = Focus::Sidebar;
                            show(app, Screen::Dashboard)
                        }
                    }
                }
                Screen::Companies(_) => reload(app),
                _ => vec![],
            }
        }
        Mutation::ProjectDeleted { id, message } => {
            app.flash_info(message);
            match &app.screen {
                Screen::ProjectDetail(detail) if detail.id == id => go_back(app),
                Screen::Projects(_) => reload(app),
                _ => vec![],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crossterm::event::{KeyEventState, KeyModifiers};
    use rust_decimal::Decimal;
    use sdesk_core::models::{Company, Page, Project, ProjectListing, ProjectStatistics};
    use sdesk_core::session::Role;

    use super::*;
    use crate::common::{TaskCompleted, TaskStarted};
    use crate::state::PageSizes;

    fn principal(role: Role, company_id: Option<u64>) -> Principal {
        Principal {
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
        }
    }

    fn logged_in(role: Role, company_id: Option<u64>) -> AppState {
        AppState::new(Some(principal(role, company_id)), PageSizes::default())
    }

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }))
    }

    fn ctrl(c: char) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::CONTROL,
        )))
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            update(app, key(KeyCode::Char(c)));
        }
    }

    fn completed(kind: TaskKind, id: TaskId, result: UiEvent) -> UiEvent {
        UiEvent::TaskCompleted {
            kind,
            completed: TaskCompleted {
                id,
                result: Box::new(result),
            },
        }
    }

    fn company(id: u64, name: &str) -> Company {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": name, "email": "c@acme.com", "cnpj": "11222333000181"
        }))
        .unwrap()
    }

    fn project(id: u64, company_id: u64, active: bool) -> Project {
        serde_json::from_value(serde_json::json!({
            "id": id, "company_id": company_id, "name": format!("P{id}"),
            "hourly_rate": "150.00", "is_active": active
        }))
        .unwrap()
    }

    fn page<T>(data: Vec<T>) -> Page<T> {
        Page {
            total: data.len() as u64,
            data,
            current_page: 1,
            per_page: 10,
            last_page: 2,
            from: None,
            to: None,
        }
    }

    fn open_menu_entry(app: &mut AppState, key_to_open: MenuKey) -> Vec<UiEffect> {
        let index = app
            .menu()
            .iter()
            .position(|e| e.key == key_to_open)
            .unwrap();
        app.sidebar.selected = index;
        app.focus = Focus::Sidebar;
        update(app, key(KeyCode::Enter))
    }

    fn task_of(effects: &[UiEffect]) -> TaskId {
        effects
            .iter()
            .find_map(|e| match e {
                UiEffect::Login { task, .. }
                | UiEffect::FetchCompanies { task, .. }
                | UiEffect::FetchCompany { task, .. }
                | UiEffect::FetchProjects { task, .. }
                | UiEffect::FetchProject { task, .. }
                | UiEffect::FetchCostReport { task, .. }
                | UiEffect::ToggleProject { task, .. }
                | UiEffect::DeleteCompany { task, .. }
                | UiEffect::DeleteProject { task, .. }
                | UiEffect::Logout { task }
                | UiEffect::RequestPasswordReset { task, .. } => Some(*task),
                UiEffect::Quit | UiEffect::CancelTask { .. } => None,
            })
            .unwrap()
    }

    #[test]
    fn test_starts_on_login_without_session() {
        let app = AppState::new(None, PageSizes::default());
        assert_eq!(app.route, Route::Login);
        assert!(app.menu().is_empty());
    }

    #[test]
    fn test_login_submit_and_success() {
        let mut app = AppState::new(None, PageSizes::default());
        type_text(&mut app, "ana@acme.com");
        update(&mut app, key(KeyCode::Tab));
        type_text(&mut app, "secret");

        let effects = update(&mut app, key(KeyCode::Enter));
        assert!(matches!(
            &effects[..],
            [UiEffect::Login { email, password, .. }] if email == "ana@acme.com" && password == "secret"
        ));
        assert!(app.login.phase.is_submitting());

        // A second Enter while submitting is ignored.
        assert!(update(&mut app, key(KeyCode::Enter)).is_empty());

        let task = task_of(&effects);
        update(
            &mut app,
            completed(
                TaskKind::Login,
                task,
                UiEvent::Auth(AuthUiEvent::LoginFinished(Ok(principal(
                    Role::ClientAdmin,
                    Some(7),
                )))),
            ),
        );
        assert_eq!(app.route, Route::Dashboard);
        assert!(app.login.password.is_empty());
        assert_eq!(app.menu()[1].label, "Empresa");
    }

    #[test]
    fn test_login_failure_shows_fallback() {
        let mut app = AppState::new(None, PageSizes::default());
        let effects = update(&mut app, key(KeyCode::Enter));
        let task = task_of(&effects);
        update(
            &mut app,
            completed(
                TaskKind::Login,
                task,
                UiEvent::Auth(AuthUiEvent::LoginFinished(Err(ApiError::Unauthorized {
                    message: None,
                }))),
            ),
        );
        assert_eq!(app.route, Route::Login);
        assert_eq!(app.login.phase.error(), Some(LOGIN_FAILED));
    }

    #[test]
    fn test_password_reset_needs_email() {
        let mut app = AppState::new(None, PageSizes::default());
        assert!(update(&mut app, key(KeyCode::F(2))).is_empty());
        assert_eq!(app.login.notice.as_deref(), Some(EMAIL_REQUIRED));

        type_text(&mut app, "ana@acme.com");
        let effects = update(&mut app, key(KeyCode::F(2)));
        assert!(matches!(
            &effects[..],
            [UiEffect::RequestPasswordReset { email, .. }] if email == "ana@acme.com"
        ));
    }

    #[test]
    fn test_stale_company_list_is_dropped() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let first = task_of(&open_menu_entry(&mut app, MenuKey::Companies));

        // Navigating away abandons the request.
        open_menu_entry(&mut app, MenuKey::Dashboard);
        open_menu_entry(&mut app, MenuKey::Companies);

        update(
            &mut app,
            completed(
                TaskKind::Companies,
                first,
                UiEvent::Data(DataUiEvent::CompaniesLoaded(Ok(page(vec![company(
                    1, "Velha",
                )])))),
            ),
        );
        let Screen::Companies(list) = &app.screen else {
            panic!("expected company list");
        };
        assert!(list.page.is_none());
    }

    #[test]
    fn test_reissued_request_supersedes_older() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let first = task_of(&open_menu_entry(&mut app, MenuKey::Companies));
        let second = task_of(&update(&mut app, key(KeyCode::Char('r'))));
        assert_ne!(first, second);

        let load = |name: &str| {
            UiEvent::Data(DataUiEvent::CompaniesLoaded(Ok(page(vec![company(1, name)]))))
        };
        update(&mut app, completed(TaskKind::Companies, second, load("Nova")));
        update(&mut app, completed(TaskKind::Companies, first, load("Velha")));

        let Screen::Companies(list) = &app.screen else {
            panic!("expected company list");
        };
        assert_eq!(list.page.as_ref().unwrap().data[0].name, "Nova");
    }

    #[test]
    fn test_late_task_started_does_not_revive_abandoned_request() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let first = task_of(&open_menu_entry(&mut app, MenuKey::Companies));
        open_menu_entry(&mut app, MenuKey::Dashboard);

        update(
            &mut app,
            UiEvent::TaskStarted {
                kind: TaskKind::Companies,
                started: TaskStarted {
                    id: first,
                    cancel: None,
                },
            },
        );
        assert!(!app.tasks.companies.is_running());
    }

    #[test]
    fn test_session_expiry_returns_to_login() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let task = task_of(&open_menu_entry(&mut app, MenuKey::Projects));
        update(
            &mut app,
            completed(
                TaskKind::Projects,
                task,
                UiEvent::Data(DataUiEvent::ProjectsLoaded(Err(ApiError::SessionExpired {
                    reason: "refresh rejected".to_string(),
                }))),
            ),
        );
        assert_eq!(app.route, Route::Login);
        assert!(app.principal.is_none());
        assert_eq!(app.login.phase.error(), Some(SESSION_EXPIRED_MESSAGE));
    }

    #[test]
    fn test_network_error_stays_on_screen() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let task = task_of(&open_menu_entry(&mut app, MenuKey::Projects));
        update(
            &mut app,
            completed(
                TaskKind::Projects,
                task,
                UiEvent::Data(DataUiEvent::ProjectsLoaded(Err(ApiError::Network {
                    timeout: true,
                    detail: "timed out".to_string(),
                }))),
            ),
        );
        assert_eq!(app.route, Route::Dashboard);
        assert!(matches!(app.screen, Screen::Projects(_)));
        assert_eq!(
            app.flash.as_ref().map(|f| f.text.as_str()),
            Some(PROJECTS_LOAD_FAILED)
        );
    }

    #[test]
    fn test_client_project_listing_is_company_scoped() {
        let mut app = logged_in(Role::ClientUser, Some(4));
        // client_user has no Projetos entry; open the listing directly.
        let query = app.project_query(1, None);
        let effects = open_projects(&mut app, query);
        assert!(matches!(
            effects.last(),
            Some(UiEffect::FetchProjects { query, .. }) if query.company_id == Some(4)
        ));
    }

    #[test]
    fn test_client_admin_company_entry_opens_own_detail() {
        let mut app = logged_in(Role::ClientAdmin, Some(7));
        let effects = open_menu_entry(&mut app, MenuKey::Company);
        assert!(matches!(
            effects.last(),
            Some(UiEffect::FetchCompany { id: 7, .. })
        ));
    }

    #[test]
    fn test_support_agent_cannot_toggle() {
        let mut app = logged_in(Role::SupportAgent, None);
        app.screen = Screen::Projects(ProjectList {
            listing: Some(ProjectListing {
                projects: page(vec![project(5, 2, true)]),
                statistics: ProjectStatistics::default(),
            }),
            ..ProjectList::default()
        });
        app.focus = Focus::Content;

        assert!(update(&mut app, key(KeyCode::Char('t'))).is_empty());
        assert_eq!(
            app.flash.as_ref().map(|f| f.text.as_str()),
            Some("Sem permissão para ativar/desativar projetos")
        );
    }

    #[test]
    fn test_toggle_updates_row_in_place() {
        let mut app = logged_in(Role::ClientAdmin, Some(2));
        app.screen = Screen::Projects(ProjectList {
            listing: Some(ProjectListing {
                projects: page(vec![project(5, 2, true)]),
                statistics: ProjectStatistics::default(),
            }),
            ..ProjectList::default()
        });
        app.focus = Focus::Content;

        let effects = update(&mut app, key(KeyCode::Char('t')));
        let task = task_of(&effects);
        update(
            &mut app,
            completed(
                TaskKind::Mutation,
                task,
                UiEvent::Data(DataUiEvent::Mutated(Ok(Mutation::ProjectToggled(project(
                    5, 2, false,
                ))))),
            ),
        );

        let Screen::Projects(list) = &app.screen else {
            panic!("expected project list");
        };
        assert!(!list.listing.as_ref().unwrap().projects.data[0].is_active);
        assert_eq!(
            list.listing.as_ref().unwrap().projects.data[0].hourly_rate,
            Decimal::new(15000, 2)
        );
    }

    #[test]
    fn test_expired_mutation_after_navigation_returns_to_login() {
        let mut app = logged_in(Role::ClientAdmin, Some(2));
        app.screen = Screen::Projects(ProjectList {
            listing: Some(ProjectListing {
                projects: page(vec![project(5, 2, true)]),
                statistics: ProjectStatistics::default(),
            }),
            ..ProjectList::default()
        });
        app.focus = Focus::Content;

        let task = task_of(&update(&mut app, key(KeyCode::Char('t'))));
        open_menu_entry(&mut app, MenuKey::Dashboard);
        assert!(!app.tasks.mutation.is_running());

        update(
            &mut app,
            completed(
                TaskKind::Mutation,
                task,
                UiEvent::Data(DataUiEvent::Mutated(Err(ApiError::SessionExpired {
                    reason: "refresh rejected".to_string(),
                }))),
            ),
        );
        assert_eq!(app.route, Route::Login);
        assert!(app.principal.is_none());
        assert_eq!(app.login.phase.error(), Some(SESSION_EXPIRED_MESSAGE));
    }

    #[test]
    fn test_stale_network_error_is_dropped() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let first = task_of(&open_menu_entry(&mut app, MenuKey::Companies));
        open_menu_entry(&mut app, MenuKey::Dashboard);

        update(
            &mut app,
            completed(
                TaskKind::Companies,
                first,
                UiEvent::Data(DataUiEvent::CompaniesLoaded(Err(ApiError::Network {
                    timeout: true,
                    detail: "timed out".to_string(),
                }))),
            ),
        );
        assert_eq!(app.route, Route::Dashboard);
        assert!(matches!(app.screen, Screen::Dashboard));
        assert!(app.flash.is_none());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = logged_in(Role::SuperAdmin, None);
        app.screen = Screen::Companies(CompanyList {
            page: Some(page(vec![company(3, "Acme")])),
            ..CompanyList::default()
        });
        app.focus = Focus::Content;

        assert!(update(&mut app, key(KeyCode::Char('x'))).is_empty());
        assert!(matches!(
            &app.input,
            InputMode::Confirm(PendingAction::DeleteCompany { id: 3, .. })
        ));

        // Anything but `y` cancels.
        assert!(update(&mut app, key(KeyCode::Char('n'))).is_empty());
        assert_eq!(app.input, InputMode::Normal);

        update(&mut app, key(KeyCode::Char('x')));
        let effects = update(&mut app, key(KeyCode::Char('y')));
        assert!(matches!(
            &effects[..],
            [UiEffect::DeleteCompany { id: 3, .. }]
        ));
    }

    #[test]
    fn test_search_applies_on_enter() {
        let mut app = logged_in(Role::SuperAdmin, None);
        open_menu_entry(&mut app, MenuKey::Companies);
        update(&mut app, key(KeyCode::Char('/')));
        type_text(&mut app, "acme");
        let effects = update(&mut app, key(KeyCode::Enter));
        assert!(matches!(
            effects.last(),
            Some(UiEffect::FetchCompanies { query, .. })
                if query.search.as_deref() == Some("acme") && query.page == 1
        ));
        assert_eq!(app.input, InputMode::Normal);
    }

    #[test]
    fn test_logout_clears_principal_and_blocks_relogin_until_done() {
        let mut app = logged_in(Role::ClientUser, Some(4));
        let effects = update(&mut app, ctrl('l'));
        assert!(effects.iter().any(|e| matches!(e, UiEffect::Logout { .. })));
        assert_eq!(app.route, Route::Login);
        assert!(app.principal.is_none());

        assert!(update(&mut app, key(KeyCode::Enter)).is_empty());

        let task = task_of(&effects);
        update(
            &mut app,
            completed(TaskKind::Logout, task, UiEvent::Auth(AuthUiEvent::LoggedOut(Ok(())))),
        );
        assert!(!update(&mut app, key(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn test_missing_project_shows_empty_state() {
        let mut app = logged_in(Role::SuperAdmin, None);
        let effects = open_project(&mut app, 9, Back::Sidebar);
        let task = task_of(&effects);
        update(
            &mut app,
            completed(
                TaskKind::ProjectDetail,
                task,
                UiEvent::Data(DataUiEvent::ProjectLoaded {
                    id: 9,
                    result: Err(ApiError::NotFound { message: None }),
                }),
            ),
        );
        let Screen::ProjectDetail(detail) = &app.screen else {
            panic!("expected project detail");
        };
        assert!(detail.missing);
        assert!(app.flash.is_none());
    }

    #[test]
    fn test_ctrl_c_quits_anywhere() {
        let mut app = AppState::new(None, PageSizes::default());
        assert!(matches!(&update(&mut app, ctrl('c'))[..], [UiEffect::Quit]));
    }
}
