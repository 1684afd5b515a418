//! Effect handlers: async backend calls that resolve to a `UiEvent`.

use sdesk_core::api::{companies, projects};
use sdesk_core::models::{CompanyQuery, CostReportQuery, ProjectQuery, TicketQuery};
use sdesk_core::{ApiClient, ApiError, AuthContext};

use crate::events::{AuthUiEvent, DataUiEvent, Mutation, UiEvent};

const COMPANY_DELETED: &str = "Empresa excluída com sucesso!";
const PROJECT_DELETED: &str = "Projeto excluído com sucesso!";

pub async fn login(auth: AuthContext, email: String, password: String) -> UiEvent {
    UiEvent::Auth(AuthUiEvent::LoginFinished(
        auth.login(&email, &password).await,
    ))
}

pub async fn password_reset(auth: AuthContext, email: String) -> UiEvent {
    UiEvent::Auth(AuthUiEvent::ResetRequested(
        auth.forgot_password(&email).await,
    ))
}

pub async fn logout(auth: AuthContext) -> UiEvent {
    let result = auth.logout_remote().await.map_err(|e| format!("{e:#}"));
    UiEvent::Auth(AuthUiEvent::LoggedOut(result))
}

pub async fn fetch_companies(client: ApiClient, query: CompanyQuery) -> UiEvent {
    UiEvent::Data(DataUiEvent::CompaniesLoaded(
        companies::list(&client, &query).await,
    ))
}

/// Loads the company and its projects. Embedded projects are used when
/// the backend already sent them.
pub async fn fetch_company(client: ApiClient, id: u64) -> UiEvent {
    let result = async {
        let mut company = companies::get(&client, id).await?;
        let projects = match company.projects.take() {
            Some(projects) => projects,
            None => companies::projects(&client, id).await?,
        };
        Ok::<_, ApiError>((company, projects))
    }
    .await;
    UiEvent::Data(DataUiEvent::CompanyLoaded { id, result })
}

pub async fn fetch_projects(client: ApiClient, query: ProjectQuery) -> UiEvent {
    UiEvent::Data(DataUiEvent::ProjectsLoaded(
        projects::list(&client, &query).await,
    ))
}

pub async fn fetch_project(client: ApiClient, id: u64, ticket_query: TicketQuery) -> UiEvent {
    let result = async {
        let project = projects::get(&client, id).await?;
        let tickets = projects::tickets(&client, id, &ticket_query).await?;
        Ok::<_, ApiError>((project, tickets))
    }
    .await;
    UiEvent::Data(DataUiEvent::ProjectLoaded { id, result })
}

pub async fn fetch_cost_report(client: ApiClient, id: u64) -> UiEvent {
    let result = projects::cost_report(&client, id, &CostReportQuery::default()).await;
    UiEvent::Data(DataUiEvent::CostReportLoaded { id, result })
}

pub async fn toggle_project(client: ApiClient, id: u64) -> UiEvent {
    let result = projects::toggle_active(&client, id)
        .await
        .map(Mutation::ProjectToggled);
    UiEvent::Data(DataUiEvent::Mutated(result))
}

pub async fn delete_company(client: ApiClient, id: u64) -> UiEvent {
    let result = companies::delete(&client, id)
        .await
        .map(|message| Mutation::CompanyDeleted {
            id,
            message: message.unwrap_or_else(|| COMPANY_DELETED.to_string()),
        });
    UiEvent::Data(DataUiEvent::Mutated(result))
}

pub async fn delete_project(client: ApiClient, id: u64) -> UiEvent {
    let result = projects::delete(&client, id)
        .await
        .map(|message| Mutation::ProjectDeleted {
            id,
            message: message.unwrap_or_else(|| PROJECT_DELETED.to_string()),
        });
    UiEvent::Data(DataUiEvent::Mutated(result))
}
