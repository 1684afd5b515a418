//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame` and never
//! mutate state or return effects.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use sdesk_core::models::{Page, format_brl, format_date};
use sdesk_core::views::{Route, dashboard_for};

use crate::common::TaskKind;
use crate::common::text::{cursor_column, mask, truncate_with_ellipsis};
use crate::state::{
    AppState, CompanyDetail, CompanyList, FlashKind, Focus, InputMode, LoginField, ProjectDetail,
    ProjectList, Screen,
};

const SIDEBAR_WIDTH: u16 = 26;

/// Spinner frames for loading indicators.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

const LOGIN_WIDTH: u16 = 52;
const LOGIN_HEIGHT: u16 = 13;

pub fn render(app: &AppState, frame: &mut Frame) {
    match app.route {
        Route::Login => render_login(app, frame),
        Route::Dashboard => render_main(app, frame),
    }
}

fn spinner(app: &AppState) -> &'static str {
    SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

// ============================================================================
// Login
// ============================================================================

fn render_login(app: &AppState, frame: &mut Frame) {
    let popup = centered(frame.area(), LOGIN_WIDTH, LOGIN_HEIGHT);
    let block = Block::bordered()
        .title(" sdesk · Entrar ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [email_area, password_area, status_area, _, hints_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(2),
    ])
    .areas(inner);

    let form = &app.login;
    let field_block = |title: &'static str, focused: bool| {
        let color = if focused { Color::Yellow } else { Color::DarkGray };
        Block::bordered()
            .title(title)
            .border_style(Style::default().fg(color))
    };

    let email_focused = form.field == LoginField::Email;
    let width = usize::from(email_area.width.saturating_sub(2));
    frame.render_widget(
        Paragraph::new(truncate_with_ellipsis(&form.email, width))
            .block(field_block(" E-mail ", email_focused)),
        email_area,
    );
    frame.render_widget(
        Paragraph::new(truncate_with_ellipsis(&mask(&form.password), width))
            .block(field_block(" Senha ", !email_focused)),
        password_area,
    );

    let status = if form.phase.is_submitting() {
        Line::from(Span::styled(
            format!("{} Autenticando...", spinner(app)),
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(error) = form.phase.error() {
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
    } else if let Some(notice) = &form.notice {
        Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Green)))
    } else {
        Line::default()
    };
    frame.render_widget(
        Paragraph::new(status).wrap(Wrap { trim: true }),
        status_area,
    );

    frame.render_widget(
        Paragraph::new(vec![
            hint_line(&[("Tab", "alternar"), ("Enter", "entrar")]),
            hint_line(&[("F2", "esqueci a senha"), ("Esc", "sair")]),
        ]),
        hints_area,
    );

    if !form.phase.is_submitting() {
        let (area, text) = match form.field {
            LoginField::Email => (email_area, form.email.clone()),
            LoginField::Password => (password_area, mask(&form.password)),
        };
        let x = (area.x + 1 + cursor_column(&text)).min(area.right().saturating_sub(2));
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn hint_line(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
            format!(" {label}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

// ============================================================================
// Main screen
// ============================================================================

fn render_main(app: &AppState, frame: &mut Frame) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());
    let [sidebar, content] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)]).areas(body);

    render_header(app, frame, header);
    render_sidebar(app, frame, sidebar);
    render_content(app, frame, content);
    render_footer(app, frame, footer);
}

fn render_header(app: &AppState, frame: &mut Frame, area: Rect) {
    let Some(principal) = &app.principal else {
        return;
    };
    let mut spans = vec![
        Span::styled(" sdesk ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(
            principal.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" · {}", principal.role.label()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.tasks.is_any_running() {
        spans.push(Span::styled(
            format!("  {}", spinner(app)),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_sidebar(app: &AppState, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let block = Block::bordered().title(" Menu ").border_style(Style::default().fg(
        if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        },
    ));

    let lines: Vec<Line> = app
        .menu()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut style = Style::default();
            if entry.active {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if focused && i == app.sidebar.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let mut spans = vec![Span::styled(
                format!(" {} {}", entry.icon.glyph(), entry.label),
                style,
            )];
            if let Some(badge) = entry.badge_text() {
                spans.push(Span::styled(
                    format!(" {badge}"),
                    Style::default().fg(Color::Red),
                ));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(app: &AppState, frame: &mut Frame, area: Rect) {
    let line = match &app.input {
        InputMode::Search(buffer) => Line::from(vec![
            Span::styled(" Buscar: ", Style::default().fg(Color::Cyan)),
            Span::raw(buffer.clone()),
        ]),
        InputMode::Confirm(action) => Line::from(Span::styled(
            format!(" {}", action.prompt()),
            Style::default().fg(Color::Yellow),
        )),
        InputMode::Normal => match &app.flash {
            Some(flash) => {
                let color = match flash.kind {
                    FlashKind::Info => Color::Green,
                    FlashKind::Error => Color::Red,
                };
                Line::from(Span::styled(
                    format!(" {}", flash.text),
                    Style::default().fg(color),
                ))
            }
            None => footer_hints(app),
        },
    };
    frame.render_widget(Paragraph::new(line), area);

    if let InputMode::Search(buffer) = &app.input {
        let x = area.x + 9 + cursor_column(buffer);
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }
}

fn footer_hints(app: &AppState) -> Line<'static> {
    let hints: &[(&'static str, &'static str)] = match (&app.focus, &app.screen) {
        (Focus::Sidebar, _) => &[
            ("↑↓", "navegar"),
            ("Enter", "abrir"),
            ("Tab", "conteúdo"),
            ("^L", "sair da conta"),
            ("q", "fechar"),
        ],
        (Focus::Content, Screen::Companies(_) | Screen::Projects(_)) => &[
            ("Enter", "detalhes"),
            ("/", "buscar"),
            ("n/p", "página"),
            ("t", "ativar"),
            ("x", "excluir"),
            ("Esc", "voltar"),
        ],
        (Focus::Content, Screen::ProjectDetail(_)) => &[
            ("n/p", "tickets"),
            ("c", "custos"),
            ("t", "ativar"),
            ("x", "excluir"),
            ("r", "recarregar"),
            ("Esc", "voltar"),
        ],
        (Focus::Content, Screen::CompanyDetail(_)) => &[
            ("Enter", "projeto"),
            ("x", "excluir"),
            ("r", "recarregar"),
            ("Esc", "voltar"),
        ],
        (Focus::Content, _) => &[("Tab", "menu"), ("q", "fechar")],
    };
    hint_line(hints)
}

fn content_block(app: &AppState, title: String) -> Block<'static> {
    let color = if app.focus == Focus::Content {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    Block::bordered()
        .title(title)
        .border_style(Style::default().fg(color))
}

fn render_content(app: &AppState, frame: &mut Frame, area: Rect) {
    match &app.screen {
        Screen::Dashboard => render_dashboard(app, frame, area),
        Screen::Companies(list) => render_companies(app, list, frame, area),
        Screen::CompanyDetail(detail) => render_company_detail(app, detail, frame, area),
        Screen::Projects(list) => render_projects(app, list, frame, area),
        Screen::ProjectDetail(detail) => render_project_detail(app, detail, frame, area),
        Screen::Placeholder(label) => {
            let block = content_block(app, format!(" {label} "));
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "Em breve",
                    Style::default().fg(Color::DarkGray),
                ))
                .block(block),
                area,
            );
        }
    }
}

fn render_dashboard(app: &AppState, frame: &mut Frame, area: Rect) {
    let Some(principal) = &app.principal else {
        return;
    };
    let kind = dashboard_for(principal.role);
    let block = content_block(app, " Dashboard ".to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [title_area, cards_area] =
        Layout::vertical([Constraint::Length(4), Constraint::Length(4)]).areas(inner);

    frame.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                kind.title(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(kind.description()),
        ])
        .wrap(Wrap { trim: true }),
        title_area,
    );

    let cards = kind.cards();
    let constraints = vec![Constraint::Ratio(1, cards.len().max(1) as u32); cards.len()];
    let areas = Layout::horizontal(constraints).split(cards_area);
    for (card, card_area) in cards.iter().zip(areas.iter()) {
        frame.render_widget(
            Paragraph::new(Span::styled("—", Style::default().fg(Color::DarkGray)))
                .block(Block::bordered().title(*card)),
            *card_area,
        );
    }
}

/// Shared empty/loading/error line for tables with no rows.
fn placeholder_line(loading: bool, error: Option<&str>, empty: &str, app: &AppState) -> Line<'static> {
    if loading {
        Line::from(Span::styled(
            format!("{} Carregando...", spinner(app)),
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some(error) = error {
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
    } else {
        Line::from(Span::styled(
            empty.to_string(),
            Style::default().fg(Color::DarkGray),
        ))
    }
}

fn page_title<T>(label: &str, page: Option<&Page<T>>) -> String {
    match page {
        Some(page) => format!(" {label} · {} ", page.summary()),
        None => format!(" {label} "),
    }
}

fn active_label(active: bool) -> Cell<'static> {
    if active {
        Cell::from(Span::styled("Ativo", Style::default().fg(Color::Green)))
    } else {
        Cell::from(Span::styled("Inativo", Style::default().fg(Color::Red)))
    }
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(Style::default().add_modifier(Modifier::BOLD))
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    table: Table<'_>,
    selected: usize,
    focused: bool,
) {
    let mut state = TableState::default();
    if focused {
        state.select(Some(selected));
    }
    frame.render_stateful_widget(
        table.row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
        area,
        &mut state,
    );
}

fn render_companies(app: &AppState, list: &CompanyList, frame: &mut Frame, area: Rect) {
    let block = content_block(app, page_title("Empresas", list.page.as_ref()));
    let rows: Vec<Row> = list
        .page
        .iter()
        .flat_map(|p| p.data.iter())
        .map(|c| {
            Row::new(vec![
                Cell::from(c.id.to_string()),
                Cell::from(truncate_with_ellipsis(&c.name, 30)),
                Cell::from(truncate_with_ellipsis(&c.email, 28)),
                Cell::from(c.cnpj.clone()),
                Cell::from(c.projects_count.unwrap_or(0).to_string()),
                active_label(c.is_active),
            ])
        })
        .collect();

    if rows.is_empty() {
        let line = placeholder_line(
            app.tasks.state(TaskKind::Companies).is_running(),
            list.error.as_deref(),
            "Nenhuma empresa encontrada",
            app,
        );
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Min(16),
            Constraint::Min(16),
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["ID", "Nome", "E-mail", "CNPJ", "Projetos", "Status"]))
    .block(block);
    render_table(frame, area, table, list.selected, app.focus == Focus::Content);
}

fn render_company_detail(app: &AppState, detail: &CompanyDetail, frame: &mut Frame, area: Rect) {
    let title = detail
        .company
        .as_ref()
        .map_or_else(|| " Empresa ".to_string(), |c| format!(" {} ", c.name));
    let block = content_block(app, title);

    let Some(company) = &detail.company else {
        let line = placeholder_line(
            app.tasks.state(TaskKind::CompanyDetail).is_running(),
            detail.missing.then_some("Empresa não encontrada"),
            "",
            app,
        );
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [info_area, projects_area] =
        Layout::vertical([Constraint::Length(8), Constraint::Min(0)]).areas(inner);

    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<14}"), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };
    let dash = || "—".to_string();
    let status = if company.is_active { "Ativo" } else { "Inativo" };
    frame.render_widget(
        Paragraph::new(vec![
            field("E-mail", company.email.clone()),
            field("CPF/CNPJ", company.cnpj.clone()),
            field("Telefone", company.phone.clone().unwrap_or_else(dash)),
            field("Endereço", company.address.clone().unwrap_or_else(dash)),
            field(
                "Administrador",
                company.admin.as_ref().map_or_else(dash, |a| a.name.clone()),
            ),
            field("Status", status.to_string()),
            field("Criada em", format_date(company.created_at)),
        ]),
        info_area,
    );

    let rows: Vec<Row> = detail
        .projects
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(truncate_with_ellipsis(&p.name, 32)),
                Cell::from(format_brl(p.hourly_rate)),
                active_label(p.is_active),
            ])
        })
        .collect();
    let projects_block = Block::default()
        .borders(Borders::TOP)
        .title(format!(" Projetos ({}) ", detail.projects.len()));
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Nenhum projeto",
                Style::default().fg(Color::DarkGray),
            ))
            .block(projects_block),
            projects_area,
        );
        return;
    }
    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Projeto", "Valor/hora", "Status"]))
    .block(projects_block);
    render_table(
        frame,
        projects_area,
        table,
        detail.selected,
        app.focus == Focus::Content,
    );
}

fn render_projects(app: &AppState, list: &ProjectList, frame: &mut Frame, area: Rect) {
    let page = list.listing.as_ref().map(|l| &l.projects);
    let block = content_block(app, page_title("Projetos", page));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [stats_area, table_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    if let Some(listing) = &list.listing {
        let stats = &listing.statistics;
        let avg = stats
            .avg_hourly_rate
            .map_or_else(|| "—".to_string(), format_brl);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!(
                    "Total {} · Ativos {} · Inativos {} · Tickets {} · Média/hora {avg}",
                    stats.total_projects,
                    stats.active_projects,
                    stats.inactive_projects,
                    stats.total_tickets,
                ),
                Style::default().fg(Color::DarkGray),
            ))),
            stats_area,
        );
    }

    let rows: Vec<Row> = page
        .iter()
        .flat_map(|p| p.data.iter())
        .map(|p| {
            Row::new(vec![
                Cell::from(p.id.to_string()),
                Cell::from(truncate_with_ellipsis(&p.name, 30)),
                Cell::from(truncate_with_ellipsis(p.company_name(), 24)),
                Cell::from(format_brl(p.hourly_rate)),
                Cell::from(p.tickets_count.unwrap_or(0).to_string()),
                active_label(p.is_active),
            ])
        })
        .collect();

    if rows.is_empty() {
        let line = placeholder_line(
            app.tasks.state(TaskKind::Projects).is_running(),
            list.error.as_deref(),
            "Nenhum projeto encontrado",
            app,
        );
        frame.render_widget(Paragraph::new(line), table_area);
        return;
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Min(16),
            Constraint::Min(12),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&[
        "ID", "Nome", "Empresa", "Valor/hora", "Tickets", "Status",
    ]));
    render_table(
        frame,
        table_area,
        table,
        list.selected,
        app.focus == Focus::Content,
    );
}

fn render_project_detail(app: &AppState, detail: &ProjectDetail, frame: &mut Frame, area: Rect) {
    let title = detail
        .project
        .as_ref()
        .map_or_else(|| " Projeto ".to_string(), |p| format!(" {} ", p.name));
    let block = content_block(app, title);

    let Some(project) = &detail.project else {
        let line = placeholder_line(
            app.tasks.state(TaskKind::ProjectDetail).is_running(),
            detail.missing.then_some("Projeto não encontrado"),
            "",
            app,
        );
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let cost_height = if detail.cost.is_some() { 6 } else { 0 };
    let [info_area, cost_area, tickets_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Length(cost_height),
        Constraint::Min(0),
    ])
    .areas(inner);

    let status = if project.is_active { "Ativo" } else { "Inativo" };
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(project.description.clone()),
            Line::from(format!("Empresa: {}", project.company_name())),
            Line::from(format!(
                "Valor/hora: {} · Status: {status}",
                format_brl(project.hourly_rate)
            )),
            Line::from(format!("Criado em: {}", format_date(project.created_at))),
        ])
        .wrap(Wrap { trim: true }),
        info_area,
    );

    if let Some(report) = &detail.cost {
        let mut lines = vec![Line::from(Span::styled(
            format!(
                "Custo total {} · {} horas",
                format_brl(report.total_cost),
                report.total_hours
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        lines.extend(report.monthly_breakdown.iter().map(|m| {
            Line::from(format!(
                "  {}  {:>8} h  {}",
                m.month,
                m.hours,
                format_brl(m.cost)
            ))
        }));
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::TOP)
                    .title(" Relatório de custos "),
            ),
            cost_area,
        );
    }

    let tickets_block = Block::default().borders(Borders::TOP).title(page_title(
        "Tickets",
        detail.tickets.as_ref(),
    ));
    let rows: Vec<Row> = detail
        .tickets
        .iter()
        .flat_map(|p| p.data.iter())
        .map(|t| {
            Row::new(vec![
                Cell::from(format!("#{}", t.id)),
                Cell::from(truncate_with_ellipsis(&t.title, 36)),
                Cell::from(t.status_label().to_string()),
                Cell::from(t.priority_label().to_string()),
                Cell::from(format_date(t.created_at)),
            ])
        })
        .collect();
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Nenhum ticket",
                Style::default().fg(Color::DarkGray),
            ))
            .block(tickets_block),
            tickets_area,
        );
        return;
    }
    frame.render_widget(
        Table::new(
            rows,
            [
                Constraint::Length(7),
                Constraint::Min(20),
                Constraint::Length(13),
                Constraint::Length(8),
                Constraint::Length(11),
            ],
        )
        .header(header_row(&["#", "Título", "Status", "Prioridade", "Criado"]))
        .block(tickets_block),
        tickets_area,
    );
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use sdesk_core::session::{Principal, Role};

    use super::*;
    use crate::state::PageSizes;

    fn draw(app: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_login_screen_masks_password() {
        let mut app = AppState::new(None, PageSizes::default());
        app.login.email = "ana@acme.com".to_string();
        app.login.password = "segredo".to_string();
        let screen = draw(&app);
        assert!(screen.contains("ana@acme.com"));
        assert!(!screen.contains("segredo"));
        assert!(screen.contains("•••••••"));
    }

    #[test]
    fn test_dashboard_shows_role_menu() {
        let principal = Principal {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@acme.com".to_string(),
            role: Role::SupportAgent,
            company_id: None,
            agent_id: Some(3),
            access_token: "t1".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            issued_at: Utc::now(),
        };
        let app = AppState::new(Some(principal), PageSizes::default());
        let screen = draw(&app);
        assert!(screen.contains("Fila de Tickets"));
        assert!(screen.contains("Dashboard - Support Agent"));
        assert!(!screen.contains("Empresas"));
    }
}
