//! Project command handlers.

use anyhow::Result;
use chrono::NaiveDate;
use sdesk_core::api::projects;
use sdesk_core::forms::{PROJECT_CREATED, PROJECT_SAVE_FAILED, PROJECT_UPDATED, ProjectForm};
use sdesk_core::models::{
    CostReportQuery, Project, ProjectQuery, TicketQuery, format_brl, format_date,
};
use sdesk_core::policy::{self, Action, Resource};
use sdesk_core::session::Principal;
use sdesk_core::{AuthContext, Config};

use super::{api_error, require_principal, status_label, table};
use crate::cli::ProjectArgs;

const LOAD_FAILED: &str = "Erro ao carregar projetos";
const PROJECT_LOAD_FAILED: &str = "Erro ao carregar projeto";
const DELETE_FAILED: &str = "Erro ao excluir projeto";
const TOGGLE_FAILED: &str = "Erro ao alterar status do projeto";
const REPORT_FAILED: &str = "Erro ao carregar relatório de custos";
const DELETED: &str = "Projeto excluído com sucesso!";

/// Options of `projects list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub page: u32,
    pub search: Option<String>,
    pub company: Option<u64>,
    pub inactive: bool,
}

pub async fn list(auth: &AuthContext, config: &Config, filter: ListFilter) -> Result<()> {
    let principal = require_principal(auth)?;
    // Client roles are always pinned to their own company.
    let company_id = policy::listing_company(&principal).or(filter.company);
    policy::ensure(&principal, Action::View, Resource::Project, company_id)
        .map_err(|err| api_error(&err, LOAD_FAILED))?;

    let query = ProjectQuery {
        page: filter.page.max(1),
        per_page: config.projects_page_size,
        search: filter.search.filter(|s| !s.trim().is_empty()),
        company_id,
        is_active: None,
        show_inactive: filter.inactive,
    };
    let listing = projects::list(auth.client(), &query)
        .await
        .map_err(|err| api_error(&err, LOAD_FAILED))?;

    let stats = &listing.statistics;
    println!(
        "Total: {}  Ativos: {}  Inativos: {}  Tickets: {}  Média/hora: {}",
        stats.total_projects,
        stats.active_projects,
        stats.inactive_projects,
        stats.total_tickets,
        stats.avg_hourly_rate.map_or_else(|| "-".to_string(), format_brl),
    );

    let page = &listing.projects;
    if page.is_empty() {
        println!("Nenhum projeto encontrado.");
        return Ok(());
    }

    let mut out = table(&["ID", "Projeto", "Empresa", "Valor/hora", "Tickets", "Status"]);
    for project in &page.data {
        out.add_row(vec![
            project.id.to_string(),
            project.name.clone(),
            project.company_name().to_string(),
            format_brl(project.hourly_rate),
            project
                .tickets_count
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            status_label(project.is_active).to_string(),
        ]);
    }
    println!("{out}");
    println!("{}", page.summary());
    Ok(())
}

/// Fetches the project and checks the caller may `action` it.
async fn load_checked(
    auth: &AuthContext,
    principal: &Principal,
    id: u64,
    action: Action,
    fallback: &str,
) -> Result<Project> {
    let project = projects::get(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, PROJECT_LOAD_FAILED))?;
    policy::ensure(principal, action, Resource::Project, Some(project.company_id))
        .map_err(|err| api_error(&err, fallback))?;
    Ok(project)
}

pub async fn show(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    let project = load_checked(auth, &principal, id, Action::View, PROJECT_LOAD_FAILED).await?;

    println!("{} (#{})", project.name, project.id);
    println!("  Empresa:    {}", project.company_name());
    println!("  Descrição:  {}", project.description);
    println!("  Valor/hora: {}", format_brl(project.hourly_rate));
    println!("  Status:     {}", status_label(project.is_active));
    println!("  Criado:     {}", format_date(project.created_at));
    if let Some(total) = project.total_cost {
        println!("  Custo:      {}", format_brl(total));
    }
    if let Some(count) = project.tickets_count {
        println!("  Tickets:    {count}");
    }
    Ok(())
}

pub async fn create(auth: &AuthContext, args: &ProjectArgs) -> Result<()> {
    let principal = require_principal(auth)?;
    let company_id = args.company.or(principal.company_id);
    policy::ensure(&principal, Action::Create, Resource::Project, company_id)
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;
    if args.inactive {
        policy::ensure(&principal, Action::EditStatus, Resource::Project, company_id)
            .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;
    }

    let form = ProjectForm {
        company_id,
        name: args.name.clone(),
        description: args.description.clone(),
        hourly_rate: args.hourly_rate.clone(),
        is_active: !args.inactive,
    };
    let payload = form
        .payload()
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;
    let project = projects::create(auth.client(), &payload)
        .await
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;

    println!("✓ {PROJECT_CREATED} (#{})", project.id);
    Ok(())
}

/// Without the status permission the current `is_active` is kept and
/// `--inactive` is refused.
pub async fn update(auth: &AuthContext, id: u64, args: &ProjectArgs) -> Result<()> {
    let principal = require_principal(auth)?;
    let current = load_checked(auth, &principal, id, Action::Edit, PROJECT_SAVE_FAILED).await?;

    let company_id = args.company.unwrap_or(current.company_id);
    policy::ensure(&principal, Action::Edit, Resource::Project, Some(company_id))
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;

    let is_active = if args.inactive {
        policy::ensure(&principal, Action::EditStatus, Resource::Project, Some(company_id))
            .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;
        false
    } else if policy::allows(&principal, Action::EditStatus, Resource::Project, Some(company_id)) {
        true
    } else {
        current.is_active
    };

    let form = ProjectForm {
        company_id: Some(company_id),
        name: args.name.clone(),
        description: args.description.clone(),
        hourly_rate: args.hourly_rate.clone(),
        is_active,
    };
    let payload = form
        .payload()
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;
    let project = projects::update(auth.client(), id, &payload)
        .await
        .map_err(|err| api_error(&err, PROJECT_SAVE_FAILED))?;

    println!("✓ {PROJECT_UPDATED} (#{})", project.id);
    Ok(())
}

pub async fn delete(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    load_checked(auth, &principal, id, Action::Delete, DELETE_FAILED).await?;

    let message = projects::delete(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, DELETE_FAILED))?;
    println!("✓ {}", message.as_deref().unwrap_or(DELETED));
    Ok(())
}

pub async fn toggle(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    load_checked(auth, &principal, id, Action::ToggleActive, TOGGLE_FAILED).await?;

    let project = projects::toggle_active(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, TOGGLE_FAILED))?;
    println!(
        "✓ Projeto {} agora está {}.",
        project.name,
        status_label(project.is_active).to_lowercase()
    );
    Ok(())
}

pub async fn tickets(
    auth: &AuthContext,
    config: &Config,
    id: u64,
    page: u32,
    status: Option<String>,
) -> Result<()> {
    let principal = require_principal(auth)?;
    load_checked(auth, &principal, id, Action::View, PROJECT_LOAD_FAILED).await?;

    let query = TicketQuery {
        page: page.max(1),
        per_page: config.tickets_page_size,
        status,
    };
    let page = projects::tickets(auth.client(), id, &query)
        .await
        .map_err(|err| api_error(&err, "Erro ao carregar tickets"))?;

    if page.is_empty() {
        println!("Nenhum ticket encontrado.");
        return Ok(());
    }

    let mut out = table(&["ID", "Título", "Status", "Prioridade", "Horas", "Aberto em"]);
    for ticket in &page.data {
        out.add_row(vec![
            ticket.id.to_string(),
            ticket.title.clone(),
            ticket.status_label().to_string(),
            ticket.priority_label().to_string(),
            ticket
                .hours_worked
                .map_or_else(|| "-".to_string(), |h| h.normalize().to_string()),
            format_date(ticket.created_at),
        ]);
    }
    println!("{out}");
    println!("{}", page.summary());
    Ok(())
}

pub async fn cost_report(
    auth: &AuthContext,
    id: u64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let principal = require_principal(auth)?;
    load_checked(auth, &principal, id, Action::ViewCostReport, REPORT_FAILED).await?;

    if let (Some(start), Some(end)) = (from, to)
        && start > end
    {
        anyhow::bail!("A data inicial deve ser anterior à data final.");
    }

    let query = CostReportQuery {
        start_date: from,
        end_date: to,
    };
    let report = projects::cost_report(auth.client(), id, &query)
        .await
        .map_err(|err| api_error(&err, REPORT_FAILED))?;

    println!("Relatório de custos: {}", report.project.name);
    println!("  Valor/hora:  {}", format_brl(report.project.hourly_rate));
    println!("  Horas:       {}", report.total_hours.normalize());
    println!("  Custo total: {}", format_brl(report.total_cost));

    if !report.monthly_breakdown.is_empty() {
        let mut out = table(&["Mês", "Horas", "Custo"]);
        for month in &report.monthly_breakdown {
            out.add_row(vec![
                month.month.clone(),
                month.hours.normalize().to_string(),
                format_brl(month.cost),
            ]);
        }
        println!("{out}");
    }
    Ok(())
}
