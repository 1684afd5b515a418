//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! Async handlers send their results to `inbox_tx`; the loop drains
//! `inbox_rx` each frame together with terminal input.

mod handlers;

use std::future::Future;
use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use sdesk_core::AuthContext;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{TaskCompleted, TaskId, TaskKind, TaskStarted};
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{AppState, PageSizes};
use crate::{render, terminal, update};

/// Tick cadence while something is loading or the user is typing.
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Tick cadence when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    auth: AuthContext,
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
    last_tick: Instant,
    last_terminal_event: Instant,
}

impl TuiRuntime {
    /// Enters the alternate screen. The start route follows whatever
    /// session `auth` already holds.
    pub fn new(auth: AuthContext, page_sizes: PageSizes) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let state = AppState::new(auth.principal(), page_sizes);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let now = Instant::now();
        Ok(Self {
            terminal,
            state,
            auth,
            inbox_tx,
            inbox_rx,
            last_tick: now,
            last_terminal_event: now,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            let mut events = self.collect_events()?;

            let size = self.terminal.size()?;
            events.insert(
                0,
                UiEvent::Frame {
                    width: size.width,
                    height: size.height,
                },
            );

            for event in events {
                if matches!(&event, UiEvent::Terminal(_)) {
                    self.last_terminal_event = Instant::now();
                }
                // Renders are batched to the tick cadence.
                if matches!(&event, UiEvent::Tick) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }

        Ok(())
    }

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let busy = self.state.tasks.is_any_running()
            || self.last_terminal_event.elapsed() < IDLE_POLL_DURATION;
        let tick_interval = if busy {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns `fut` with the TaskStarted/TaskCompleted lifecycle. A
    /// cancelable task resolves to `TaskCancelled` once its token fires.
    fn spawn_task<Fut>(&self, kind: TaskKind, id: TaskId, cancelable: bool, fut: Fut)
    where
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        let cancel = cancelable.then(CancellationToken::new);
        let started = TaskStarted {
            id,
            cancel: cancel.clone(),
        };
        let _ = tx.send(UiEvent::TaskStarted { kind, started });

        tokio::spawn(async move {
            let result = match cancel {
                Some(token) => tokio::select! {
                    () = token.cancelled() => UiEvent::TaskCancelled,
                    event = fut => event,
                },
                None => fut.await,
            };
            let completed = TaskCompleted {
                id,
                result: Box::new(result),
            };
            let _ = tx.send(UiEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        let client = self.auth.client().clone();
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::CancelTask { token } => token.cancel(),
            UiEffect::Login {
                task,
                email,
                password,
            } => {
                let auth = self.auth.clone();
                self.spawn_task(
                    TaskKind::Login,
                    task,
                    false,
                    handlers::login(auth, email, password),
                );
            }
            UiEffect::RequestPasswordReset { task, email } => {
                let auth = self.auth.clone();
                self.spawn_task(
                    TaskKind::PasswordReset,
                    task,
                    false,
                    handlers::password_reset(auth, email),
                );
            }
            UiEffect::Logout { task } => {
                let auth = self.auth.clone();
                self.spawn_task(TaskKind::Logout, task, false, handlers::logout(auth));
            }
            UiEffect::FetchCompanies { task, query } => {
                self.spawn_task(
                    TaskKind::Companies,
                    task,
                    true,
                    handlers::fetch_companies(client, query),
                );
            }
            UiEffect::FetchCompany { task, id } => {
                self.spawn_task(
                    TaskKind::CompanyDetail,
                    task,
                    true,
                    handlers::fetch_company(client, id),
                );
            }
            UiEffect::FetchProjects { task, query } => {
                self.spawn_task(
                    TaskKind::Projects,
                    task,
                    true,
                    handlers::fetch_projects(client, query),
                );
            }
            UiEffect::FetchProject { task, id, tickets } => {
                self.spawn_task(
                    TaskKind::ProjectDetail,
                    task,
                    true,
                    handlers::fetch_project(client, id, tickets),
                );
            }
            UiEffect::FetchCostReport { task, id } => {
                self.spawn_task(
                    TaskKind::CostReport,
                    task,
                    true,
                    handlers::fetch_cost_report(client, id),
                );
            }
            // Mutations run to completion once sent.
            UiEffect::ToggleProject { task, id } => {
                self.spawn_task(
                    TaskKind::Mutation,
                    task,
                    false,
                    handlers::toggle_project(client, id),
                );
            }
            UiEffect::DeleteCompany { task, id } => {
                self.spawn_task(
                    TaskKind::Mutation,
                    task,
                    false,
                    handlers::delete_company(client, id),
                );
            }
            UiEffect::DeleteProject { task, id } => {
                self.spawn_task(
                    TaskKind::Mutation,
                    task,
                    false,
                    handlers::delete_project(client, id),
                );
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
