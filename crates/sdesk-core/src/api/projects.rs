//! `/projects` endpoints.

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{
    CostReport, CostReportQuery, Page, Project, ProjectListing, ProjectPayload, ProjectQuery,
    ProjectTicket, TicketQuery,
};

/// Listing plus aggregate statistics.
pub async fn list(client: &ApiClient, query: &ProjectQuery) -> Result<ProjectListing, ApiError> {
    client.get_with("projects", query).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<Project, ApiError> {
    client.get(&format!("projects/{id}")).await
}

pub async fn create(client: &ApiClient, payload: &ProjectPayload) -> Result<Project, ApiError> {
    client.post("projects", payload).await
}

pub async fn update(
    client: &ApiClient,
    id: u64,
    payload: &ProjectPayload,
) -> Result<Project, ApiError> {
    client.put(&format!("projects/{id}"), payload).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<Option<String>, ApiError> {
    client.delete(&format!("projects/{id}")).await
}

/// The tickets page may arrive enveloped or bare; both decode.
pub async fn tickets(
    client: &ApiClient,
    id: u64,
    query: &TicketQuery,
) -> Result<Page<ProjectTicket>, ApiError> {
    client
        .get_with(&format!("projects/{id}/tickets"), query)
        .await
}

pub async fn cost_report(
    client: &ApiClient,
    id: u64,
    query: &CostReportQuery,
) -> Result<CostReport, ApiError> {
    client
        .get_with(&format!("projects/{id}/cost-report"), query)
        .await
}

/// Flips `is_active` and returns the updated project.
pub async fn toggle_active(client: &ApiClient, id: u64) -> Result<Project, ApiError> {
    client.patch(&format!("projects/{id}/toggle-active")).await
}
