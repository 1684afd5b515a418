//! Company and project form drafts and their local validation.
//!
//! Validation runs before any create/update request. Messages are the ones
//! shown inline next to each field.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{ApiError, FieldErrors};
use crate::models::{Company, CompanyPayload, Project, ProjectPayload};

pub const COMPANY_CREATED: &str = "Empresa criada com sucesso!";
pub const COMPANY_UPDATED: &str = "Empresa atualizada com sucesso!";
pub const COMPANY_SAVE_FAILED: &str = "Erro ao salvar empresa";
pub const PROJECT_CREATED: &str = "Projeto criado com sucesso!";
pub const PROJECT_UPDATED: &str = "Projeto atualizado com sucesso!";
pub const PROJECT_SAVE_FAILED: &str = "Erro ao salvar projeto";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Editable company fields, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyForm {
    pub name: String,
    pub email: String,
    pub cnpj: String,
    pub phone: String,
    pub address: String,
    pub is_active: bool,
}

impl Default for CompanyForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            cnpj: String::new(),
            phone: String::new(),
            address: String::new(),
            is_active: true,
        }
    }
}

impl CompanyForm {
    /// Prefills the form for editing.
    pub fn from_company(company: &Company) -> Self {
        Self {
            name: company.name.clone(),
            email: company.email.clone(),
            cnpj: company.cnpj.clone(),
            phone: company.phone.clone().unwrap_or_default(),
            address: company.address.clone().unwrap_or_default(),
            is_active: company.is_active,
        }
    }

    pub fn validate(&self) -> Result<CompanyPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let email = self.email.trim();
        let cnpj = self.cnpj.trim();

        if name.is_empty() {
            errors.insert("name".into(), "Nome da empresa é obrigatório".into());
        }

        if email.is_empty() {
            errors.insert("email".into(), "Email é obrigatório".into());
        } else if !EMAIL_RE.is_match(email) {
            errors.insert("email".into(), "Email deve ter um formato válido".into());
        }

        if cnpj.is_empty() {
            errors.insert("cnpj".into(), "CPF/CNPJ é obrigatório".into());
        } else if !is_valid_cpf_cnpj(cnpj) {
            errors.insert("cnpj".into(), "CPF ou CNPJ inválido".into());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CompanyPayload {
            name: name.to_string(),
            email: email.to_string(),
            cnpj: cnpj.to_string(),
            phone: non_empty(&self.phone),
            address: non_empty(&self.address),
            is_active: self.is_active,
        })
    }

    /// Like [`CompanyForm::validate`] but as an [`ApiError`].
    pub fn payload(&self) -> Result<CompanyPayload, ApiError> {
        self.validate().map_err(ApiError::validation)
    }
}

/// Editable project fields, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectForm {
    pub company_id: Option<u64>,
    pub name: String,
    pub description: String,
    pub hourly_rate: String,
    pub is_active: bool,
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self {
            company_id: None,
            name: String::new(),
            description: String::new(),
            hourly_rate: String::new(),
            is_active: true,
        }
    }
}

impl ProjectForm {
    pub fn from_project(project: &Project) -> Self {
        Self {
            company_id: Some(project.company_id),
            name: project.name.clone(),
            description: project.description.clone(),
            hourly_rate: project.hourly_rate.to_string(),
            is_active: project.is_active,
        }
    }

    pub fn validate(&self) -> Result<ProjectPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let description = self.description.trim();

        if name.is_empty() {
            errors.insert("name".into(), "Nome do projeto é obrigatório".into());
        }
        if description.is_empty() {
            errors.insert("description".into(), "Descrição é obrigatória".into());
        }
        if self.company_id.is_none() {
            errors.insert("company_id".into(), "Empresa é obrigatória".into());
        }

        let rate = if self.hourly_rate.trim().is_empty() {
            errors.insert("hourly_rate".into(), "Valor por hora é obrigatório".into());
            None
        } else {
            let parsed = parse_money(&self.hourly_rate).filter(|rate| *rate > Decimal::ZERO);
            if parsed.is_none() {
                errors.insert(
                    "hourly_rate".into(),
                    "Valor por hora deve ser um número positivo".into(),
                );
            }
            parsed
        };

        match (self.company_id, rate) {
            (Some(company_id), Some(hourly_rate)) if errors.is_empty() => Ok(ProjectPayload {
                company_id,
                name: name.to_string(),
                description: description.to_string(),
                hourly_rate,
                is_active: self.is_active,
            }),
            _ => Err(errors),
        }
    }

    pub fn payload(&self) -> Result<ProjectPayload, ApiError> {
        self.validate().map_err(ApiError::validation)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses `150`, `150.5`, `150,50` or `1.234,56` (optionally prefixed `R$`).
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().trim_start_matches("R$").trim();
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.to_string()
    };
    Decimal::from_str(&normalized).ok()
}

fn digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

/// Validates the check digits of an 11-digit CPF. Punctuation is ignored.
pub fn is_valid_cpf(value: &str) -> bool {
    let d = digits(value);
    if d.len() != 11 || all_same(&d) {
        return false;
    }

    let check = |len: usize| {
        let top = len as u32 + 1;
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, digit)| digit * (top - i as u32))
            .sum();
        let remainder = (sum * 10) % 11;
        if remainder == 10 { 0 } else { remainder }
    };

    check(9) == d[9] && check(10) == d[10]
}

/// Validates the check digits of a 14-digit CNPJ. Punctuation is ignored.
pub fn is_valid_cnpj(value: &str) -> bool {
    let d = digits(value);
    if d.len() != 14 || all_same(&d) {
        return false;
    }

    // Weights cycle 2..=9 from the rightmost digit leftwards.
    let check = |len: usize| {
        let sum: u32 = d[..len]
            .iter()
            .rev()
            .enumerate()
            .map(|(i, digit)| digit * (2 + (i as u32 % 8)))
            .sum();
        let remainder = sum % 11;
        if remainder < 2 { 0 } else { 11 - remainder }
    };

    check(12) == d[12] && check(13) == d[13]
}

/// CPF when 11 digits, CNPJ when 14, invalid otherwise.
pub fn is_valid_cpf_cnpj(value: &str) -> bool {
    match digits(value).len() {
        11 => is_valid_cpf(value),
        14 => is_valid_cnpj(value),
        _ => false,
    }
}
