//! Company command handlers.
//!
//! Every command checks the role policy first so a denied action fails
//! without a request.

use anyhow::Result;
use sdesk_core::api::companies;
use sdesk_core::forms::{COMPANY_CREATED, COMPANY_SAVE_FAILED, COMPANY_UPDATED, CompanyForm};
use sdesk_core::models::{Company, CompanyQuery, Project, format_brl, format_date};
use sdesk_core::policy::{self, Action, Resource};
use sdesk_core::{AuthContext, Config};

use super::{api_error, require_principal, status_label, table};
use crate::cli::CompanyArgs;

const LOAD_FAILED: &str = "Erro ao carregar empresas";
const DELETE_FAILED: &str = "Erro ao excluir empresa";
const DELETED: &str = "Empresa excluída com sucesso!";

impl From<&CompanyArgs> for CompanyForm {
    fn from(args: &CompanyArgs) -> Self {
        Self {
            name: args.name.clone(),
            email: args.email.clone(),
            cnpj: args.cnpj.clone(),
            phone: args.phone.clone().unwrap_or_default(),
            address: args.address.clone().unwrap_or_default(),
            is_active: !args.inactive,
        }
    }
}

/// Staff see the paginated listing; client roles see their own company.
pub async fn list(
    auth: &AuthContext,
    config: &Config,
    page: u32,
    search: Option<String>,
) -> Result<()> {
    let principal = require_principal(auth)?;
    if !principal.role.is_staff()
        && let Some(own) = principal.company_id
    {
        return show(auth, own).await;
    }
    policy::ensure(&principal, Action::View, Resource::Company, None)
        .map_err(|err| api_error(&err, LOAD_FAILED))?;

    let query = CompanyQuery {
        page: page.max(1),
        per_page: config.companies_page_size,
        search: search.filter(|s| !s.trim().is_empty()),
        only_active: None,
    };
    let page = companies::list(auth.client(), &query)
        .await
        .map_err(|err| api_error(&err, LOAD_FAILED))?;

    if page.is_empty() {
        println!("Nenhuma empresa encontrada.");
        return Ok(());
    }

    let mut out = table(&["ID", "Nome", "E-mail", "CPF/CNPJ", "Projetos", "Status"]);
    for company in &page.data {
        out.add_row(vec![
            company.id.to_string(),
            company.name.clone(),
            company.email.clone(),
            company.cnpj.clone(),
            company
                .projects_count
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            status_label(company.is_active).to_string(),
        ]);
    }
    println!("{out}");
    println!("{}", page.summary());
    Ok(())
}

pub async fn show(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    policy::ensure(&principal, Action::View, Resource::Company, Some(id))
        .map_err(|err| api_error(&err, LOAD_FAILED))?;

    let company = companies::get(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, "Erro ao carregar empresa"))?;
    print_company(&company);

    if let Some(projects) = &company.projects {
        println!();
        print_projects(projects);
    }
    Ok(())
}

pub async fn create(auth: &AuthContext, args: &CompanyArgs) -> Result<()> {
    let principal = require_principal(auth)?;
    policy::ensure(&principal, Action::Create, Resource::Company, None)
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;

    let payload = CompanyForm::from(args)
        .payload()
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;
    let company = companies::create(auth.client(), &payload)
        .await
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;

    println!("✓ {COMPANY_CREATED} (#{})", company.id);
    Ok(())
}

pub async fn update(auth: &AuthContext, id: u64, args: &CompanyArgs) -> Result<()> {
    let principal = require_principal(auth)?;
    policy::ensure(&principal, Action::Edit, Resource::Company, Some(id))
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;

    let payload = CompanyForm::from(args)
        .payload()
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;
    let company = companies::update(auth.client(), id, &payload)
        .await
        .map_err(|err| api_error(&err, COMPANY_SAVE_FAILED))?;

    println!("✓ {COMPANY_UPDATED} (#{})", company.id);
    Ok(())
}

pub async fn delete(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    policy::ensure(&principal, Action::Delete, Resource::Company, Some(id))
        .map_err(|err| api_error(&err, DELETE_FAILED))?;

    let message = companies::delete(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, DELETE_FAILED))?;
    println!("✓ {}", message.as_deref().unwrap_or(DELETED));
    Ok(())
}

pub async fn projects(auth: &AuthContext, id: u64) -> Result<()> {
    let principal = require_principal(auth)?;
    policy::ensure(&principal, Action::View, Resource::Project, Some(id))
        .map_err(|err| api_error(&err, "Erro ao carregar projetos"))?;

    let projects = companies::projects(auth.client(), id)
        .await
        .map_err(|err| api_error(&err, "Erro ao carregar projetos"))?;
    print_projects(&projects);
    Ok(())
}

fn print_company(company: &Company) {
    println!("{} (#{})", company.name, company.id);
    println!("  E-mail:   {}", company.email);
    println!("  CPF/CNPJ: {}", company.cnpj);
    if let Some(phone) = &company.phone {
        println!("  Telefone: {phone}");
    }
    if let Some(address) = &company.address {
        println!("  Endereço: {address}");
    }
    println!("  Status:   {}", status_label(company.is_active));
    println!("  Criada:   {}", format_date(company.created_at));
    if let Some(admin) = &company.admin {
        println!("  Admin:    {} <{}>", admin.name, admin.email);
    }
    if let Some(users) = company.client_users.as_deref().filter(|u| !u.is_empty()) {
        println!("  Usuários:");
        for user in users {
            println!("    - {} <{}>", user.name, user.email);
        }
    }
}

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("Nenhum projeto cadastrado.");
        return;
    }

    let mut out = table(&["ID", "Projeto", "Valor/hora", "Tickets", "Status"]);
    for project in projects {
        out.add_row(vec![
            project.id.to_string(),
            project.name.clone(),
            format_brl(project.hourly_rate),
            project
                .tickets_count
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            status_label(project.is_active).to_string(),
        ]);
    }
    println!("{out}");
}
