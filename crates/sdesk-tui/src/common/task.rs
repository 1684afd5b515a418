use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// One slot per kind of backend call. A newer call of the same kind
/// supersedes the older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Login,
    PasswordReset,
    Logout,
    Companies,
    CompanyDetail,
    Projects,
    ProjectDetail,
    CostReport,
    Mutation,
}

impl TaskKind {
    /// Kinds whose results belong to the screen currently shown.
    pub const SCREEN: [TaskKind; 6] = [
        TaskKind::Companies,
        TaskKind::CompanyDetail,
        TaskKind::Projects,
        TaskKind::ProjectDetail,
        TaskKind::CostReport,
        TaskKind::Mutation,
    ];
}

#[derive(Debug, Clone)]
pub struct TaskStarted {
    pub id: TaskId,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug)]
pub struct TaskCompleted<E> {
    pub id: TaskId,
    pub result: E,
}

/// Task lifecycle state (mutated only by the reducer).
///
/// The reducer claims the slot when it issues the effect, so a result can
/// only land while its id is still the active one.
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    pub active: Option<TaskId>,
    pub cancel: Option<CancellationToken>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Marks `id` as the one result this slot accepts.
    pub fn claim(&mut self, id: TaskId) -> Option<CancellationToken> {
        let previous = self.cancel.take();
        self.active = Some(id);
        previous
    }

    /// Stores the cancel token once the runtime has spawned the task.
    /// Ignored when the slot has moved on.
    pub fn on_started(&mut self, started: &TaskStarted) {
        if self.active == Some(started.id) {
            self.cancel.clone_from(&started.cancel);
        }
    }

    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.active == Some(id);
        if ok {
            self.active = None;
            self.cancel = None;
        }
        ok
    }

    /// Forgets the running task. Returns its token so it can be cancelled.
    pub fn clear(&mut self) -> Option<CancellationToken> {
        self.active = None;
        self.cancel.take()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub login: TaskState,
    pub password_reset: TaskState,
    pub logout: TaskState,
    pub companies: TaskState,
    pub company_detail: TaskState,
    pub projects: TaskState,
    pub project_detail: TaskState,
    pub cost_report: TaskState,
    pub mutation: TaskState,
}

impl Tasks {
    pub fn state(&self, kind: TaskKind) -> &TaskState {
        match kind {
            TaskKind::Login => &self.login,
            TaskKind::PasswordReset => &self.password_reset,
            TaskKind::Logout => &self.logout,
            TaskKind::Companies => &self.companies,
            TaskKind::CompanyDetail => &self.company_detail,
            TaskKind::Projects => &self.projects,
            TaskKind::ProjectDetail => &self.project_detail,
            TaskKind::CostReport => &self.cost_report,
            TaskKind::Mutation => &self.mutation,
        }
    }

    pub fn state_mut(&mut self, kind: TaskKind) -> &mut TaskState {
        match kind {
            TaskKind::Login => &mut self.login,
            TaskKind::PasswordReset => &mut self.password_reset,
            TaskKind::Logout => &mut self.logout,
            TaskKind::Companies => &mut self.companies,
            TaskKind::CompanyDetail => &mut self.company_detail,
            TaskKind::Projects => &mut self.projects,
            TaskKind::ProjectDetail => &mut self.project_detail,
            TaskKind::CostReport => &mut self.cost_report,
            TaskKind::Mutation => &mut self.mutation,
        }
    }

    pub fn is_any_running(&self) -> bool {
        self.login.is_running()
            || self.password_reset.is_running()
            || self.logout.is_running()
            || TaskKind::SCREEN
                .iter()
                .any(|&kind| self.state(kind).is_running())
    }

    /// Drops every screen-bound task, returning the tokens to cancel.
    pub fn clear_screen(&mut self) -> Vec<CancellationToken> {
        TaskKind::SCREEN
            .iter()
            .filter_map(|&kind| self.state_mut(kind).clear())
            .collect()
    }
}
