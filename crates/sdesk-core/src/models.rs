//! Server-owned records and request payloads.
//!
//! Nothing here is persisted locally; views fetch fresh copies.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub to: Option<u64>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// "Página 2 de 5 (73 registros)"
    pub fn summary(&self) -> String {
        format!(
            "Página {} de {} ({} registros)",
            self.current_page,
            self.last_page.max(1),
            self.total
        )
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            current_page: 1,
            per_page: 0,
            total: 0,
            last_page: 1,
            from: None,
            to: None,
        }
    }
}

/// Minimal user reference nested in company payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub cnpj: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin: Option<UserRef>,
    #[serde(default, alias = "clientUsers")]
    pub client_users: Option<Vec<UserRef>>,
    #[serde(default)]
    pub projects: Option<Vec<Project>>,
    #[serde(default)]
    pub projects_count: Option<u64>,
    #[serde(default)]
    pub tickets_count: Option<u64>,
}

/// Company reference nested in project payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sent by the backend as a decimal string, e.g. `"150.00"`.
    pub hourly_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company: Option<CompanyRef>,
    #[serde(default)]
    pub tickets_count: Option<u64>,
    #[serde(default)]
    pub total_cost: Option<Decimal>,
    #[serde(default)]
    pub tickets: Option<Vec<ProjectTicket>>,
}

impl Project {
    pub fn company_name(&self) -> &str {
        self.company
            .as_ref()
            .map_or("Não informado", |company| company.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectTicket {
    pub id: u64,
    pub project_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    #[serde(default)]
    pub hours_worked: Option<Decimal>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectTicket {
    pub fn status_label(&self) -> &str {
        match self.status.as_str() {
            "open" => "Aberto",
            "in_progress" => "Em andamento",
            "resolved" => "Resolvido",
            "closed" => "Fechado",
            other => other,
        }
    }

    pub fn priority_label(&self) -> &str {
        match self.priority.as_str() {
            "low" => "Baixa",
            "medium" => "Média",
            "high" => "Alta",
            "critical" => "Crítica",
            other => other,
        }
    }
}

/// Aggregates returned alongside the project listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectStatistics {
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub active_projects: u64,
    #[serde(default)]
    pub inactive_projects: u64,
    #[serde(default)]
    pub total_tickets: u64,
    #[serde(default)]
    pub avg_hourly_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectListing {
    pub projects: Page<Project>,
    #[serde(default)]
    pub statistics: ProjectStatistics,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonthlyCost {
    pub month: String,
    pub hours: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CostReport {
    pub project: Project,
    pub total_hours: Decimal,
    pub total_cost: Decimal,
    #[serde(default)]
    pub monthly_breakdown: Vec<MonthlyCost>,
    #[serde(default)]
    pub tickets: Vec<ProjectTicket>,
}

/// Body of `POST /companies` and `PUT /companies/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyPayload {
    pub name: String,
    pub email: String,
    pub cnpj: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub is_active: bool,
}

/// Body of `POST /projects` and `PUT /projects/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPayload {
    pub company_id: u64,
    pub name: String,
    pub description: String,
    pub hourly_rate: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Restricts the listing to active companies (used by pickers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_inactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

/// Formats a value as Brazilian currency, e.g. `R$ 1.234,50`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac_part}")
}

/// `dd/mm/yyyy` in local time, or `-`.
pub fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%d/%m/%Y").to_string(),
    )
}

/// `dd/mm/yyyy HH:MM` in local time, or `-`.
pub fn format_datetime(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
    )
}

mod timestamp {
    //! Accepts RFC 3339 (`2024-05-01T10:00:00.000000Z`) and the plain
    //! `2024-05-01 10:00:00` form; anything else becomes `None`.

    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Utc};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
