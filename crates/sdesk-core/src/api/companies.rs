//! `/companies` endpoints.

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{Company, CompanyPayload, CompanyQuery, Page, Project};

pub async fn list(client: &ApiClient, query: &CompanyQuery) -> Result<Page<Company>, ApiError> {
    client.get_with("companies", query).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<Company, ApiError> {
    client.get(&format!("companies/{id}")).await
}

pub async fn create(client: &ApiClient, payload: &CompanyPayload) -> Result<Company, ApiError> {
    client.post("companies", payload).await
}

pub async fn update(
    client: &ApiClient,
    id: u64,
    payload: &CompanyPayload,
) -> Result<Company, ApiError> {
    client.put(&format!("companies/{id}"), payload).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<Option<String>, ApiError> {
    client.delete(&format!("companies/{id}")).await
}

/// Projects owned by one company.
pub async fn projects(client: &ApiClient, id: u64) -> Result<Vec<Project>, ApiError> {
    client.get(&format!("companies/{id}/projects")).await
}
