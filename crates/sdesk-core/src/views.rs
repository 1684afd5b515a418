//! Role-based navigation: sidebar menus, dashboards, the start route and the
//! login screen state machine.

use crate::session::{Principal, Role};

/// Stable identifier of a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKey {
    Dashboard,
    Companies,
    Company,
    Projects,
    Users,
    Tickets,
    TicketQueue,
    NewTicket,
    Support,
    Knowledge,
    Reports,
    System,
    Security,
    Settings,
}

impl MenuKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuKey::Dashboard => "dashboard",
            MenuKey::Companies => "companies",
            MenuKey::Company => "company",
            MenuKey::Projects => "projects",
            MenuKey::Users => "users",
            MenuKey::Tickets => "tickets",
            MenuKey::TicketQueue => "ticket-queue",
            MenuKey::NewTicket => "new-ticket",
            MenuKey::Support => "support",
            MenuKey::Knowledge => "knowledge",
            MenuKey::Reports => "reports",
            MenuKey::System => "system",
            MenuKey::Security => "security",
            MenuKey::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Home,
    Building,
    Folder,
    Users,
    Ticket,
    Queue,
    Headset,
    Document,
    Chart,
    Database,
    Shield,
    Gear,
}

impl Icon {
    /// Single-cell glyph for terminal rendering.
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Home => "⌂",
            Icon::Building => "▦",
            Icon::Folder => "▤",
            Icon::Users => "☺",
            Icon::Ticket => "✉",
            Icon::Queue => "≡",
            Icon::Headset => "☎",
            Icon::Document => "▭",
            Icon::Chart => "▥",
            Icon::Database => "◫",
            Icon::Shield => "◈",
            Icon::Gear => "⚙",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub icon: Icon,
    pub label: &'static str,
    pub key: MenuKey,
    pub badge: Option<u32>,
    pub active: bool,
}

impl MenuEntry {
    /// Badge text; zero shows nothing, above 99 shows `99+`.
    pub fn badge_text(&self) -> Option<String> {
        match self.badge {
            None | Some(0) => None,
            Some(n) if n > 99 => Some("99+".to_string()),
            Some(n) => Some(n.to_string()),
        }
    }
}

/// Counters shown next to ticket entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeCounts {
    pub tickets: Option<u32>,
    pub ticket_queue: Option<u32>,
}

/// Ordered sidebar entries for `role`, with `active` marked.
pub fn menu_for(role: Role, active: MenuKey, badges: &BadgeCounts) -> Vec<MenuEntry> {
    let items: &[(Icon, &'static str, MenuKey)] = match role {
        Role::SuperAdmin => &[
            (Icon::Home, "Dashboard", MenuKey::Dashboard),
            (Icon::Building, "Empresas", MenuKey::Companies),
            (Icon::Folder, "Projetos", MenuKey::Projects),
            (Icon::Users, "Usuários", MenuKey::Users),
            (Icon::Ticket, "Tickets", MenuKey::Tickets),
            (Icon::Chart, "Relatórios", MenuKey::Reports),
            (Icon::Database, "Sistema", MenuKey::System),
            (Icon::Shield, "Segurança", MenuKey::Security),
            (Icon::Gear, "Configurações", MenuKey::Settings),
        ],
        Role::SupportAgent => &[
            (Icon::Home, "Dashboard", MenuKey::Dashboard),
            (Icon::Ticket, "Meus Tickets", MenuKey::Tickets),
            (Icon::Queue, "Fila de Tickets", MenuKey::TicketQueue),
            (Icon::Headset, "Atendimento", MenuKey::Support),
            (Icon::Document, "Base Conhecimento", MenuKey::Knowledge),
            (Icon::Chart, "Relatórios", MenuKey::Reports),
        ],
        Role::ClientAdmin => &[
            (Icon::Home, "Dashboard", MenuKey::Dashboard),
            (Icon::Building, "Empresa", MenuKey::Company),
            (Icon::Folder, "Projetos", MenuKey::Projects),
            (Icon::Ticket, "Meus Tickets", MenuKey::Tickets),
            (Icon::Document, "Abrir Ticket", MenuKey::NewTicket),
            (Icon::Headset, "Suporte", MenuKey::Support),
        ],
        Role::ClientUser => &[
            (Icon::Home, "Dashboard", MenuKey::Dashboard),
            (Icon::Ticket, "Meus Tickets", MenuKey::Tickets),
            (Icon::Document, "Abrir Ticket", MenuKey::NewTicket),
            (Icon::Headset, "Suporte", MenuKey::Support),
        ],
    };

    items
        .iter()
        .map(|&(icon, label, key)| MenuEntry {
            icon,
            label,
            key,
            badge: match key {
                MenuKey::Tickets => badges.tickets,
                MenuKey::TicketQueue => badges.ticket_queue,
                _ => None,
            },
            active: key == active,
        })
        .collect()
}

/// Menu for a raw role string; unknown roles get the `client_user` menu.
pub fn menu_for_role_str(role: &str, active: MenuKey, badges: &BadgeCounts) -> Vec<MenuEntry> {
    menu_for(Role::parse(role), active, badges)
}

/// Dashboard variant shown after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    SuperAdmin,
    SupportAgent,
    ClientAdmin,
    ClientUser,
}

impl DashboardKind {
    pub fn title(self) -> &'static str {
        match self {
            DashboardKind::SuperAdmin => "Bem-vindo, Super Admin!",
            DashboardKind::SupportAgent => "Dashboard - Support Agent",
            DashboardKind::ClientAdmin => "Bem-vindo, Admin do Cliente!",
            DashboardKind::ClientUser => "Dashboard - Client User",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DashboardKind::SuperAdmin => {
                "Aqui você tem acesso total à plataforma, pode gerenciar tudo e visualizar métricas globais avançadas."
            }
            DashboardKind::SupportAgent => {
                "Bem-vindo, agente de suporte! Aqui você vê tickets atribuídos, SLA, fila de atendimento e histórico de ações."
            }
            DashboardKind::ClientAdmin => {
                "Aqui você gerencia usuários, vê relatórios, solicitações e configurações do seu contrato."
            }
            DashboardKind::ClientUser => {
                "Bem-vindo! Aqui você pode abrir novos tickets, acompanhar status, conversar com o suporte e ver histórico de solicitações."
            }
        }
    }

    /// Headings of the summary cards.
    pub fn cards(self) -> &'static [&'static str] {
        match self {
            DashboardKind::SuperAdmin => &[
                "Total de Usuários",
                "Tickets Abertos",
                "Clientes Ativos",
                "Uptime do Sistema",
            ],
            DashboardKind::SupportAgent => &["Tickets Atribuídos", "Fila de Atendimento", "SLA"],
            DashboardKind::ClientAdmin => &["Usuários da Empresa", "Tickets Abertos", "Satisfação"],
            DashboardKind::ClientUser => &["Meus Tickets", "Em Andamento", "Resolvidos"],
        }
    }
}

pub fn dashboard_for(role: Role) -> DashboardKind {
    match role {
        Role::SuperAdmin => DashboardKind::SuperAdmin,
        Role::SupportAgent => DashboardKind::SupportAgent,
        Role::ClientAdmin => DashboardKind::ClientAdmin,
        Role::ClientUser => DashboardKind::ClientUser,
    }
}

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

/// Start on the dashboard only with a hydrated principal.
pub fn initial_route(principal: Option<&Principal>) -> Route {
    if principal.is_some() {
        Route::Dashboard
    } else {
        Route::Login
    }
}

/// Login screen state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoginPhase {
    #[default]
    Idle,
    Submitting,
    Authenticated,
    Failed(String),
}

impl LoginPhase {
    /// Moves to `Submitting`. Returns false (and stays put) if a submit is
    /// already in flight or the user is already authenticated.
    pub fn submit(&mut self) -> bool {
        match self {
            LoginPhase::Idle | LoginPhase::Failed(_) => {
                *self = LoginPhase::Submitting;
                true
            }
            LoginPhase::Submitting | LoginPhase::Authenticated => false,
        }
    }

    pub fn succeed(&mut self) {
        if *self == LoginPhase::Submitting {
            *self = LoginPhase::Authenticated;
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = LoginPhase::Failed(message.into());
    }

    pub fn reset(&mut self) {
        *self = LoginPhase::Idle;
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, LoginPhase::Submitting)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoginPhase::Failed(message) => Some(message),
            _ => None,
        }
    }
}
