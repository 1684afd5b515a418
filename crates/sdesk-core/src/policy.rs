//! Who may do what.
//!
//! One table of `(resource, action, role, scope)` rows. Screens and commands
//! ask [`allows`] instead of comparing roles themselves. This mirrors the
//! backend's authorization for display purposes; the backend still decides.

use std::fmt;

use crate::error::ApiError;
use crate::session::{Principal, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Company,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    ToggleActive,
    /// Change `is_active` from inside the edit form.
    EditStatus,
    ViewCostReport,
}

/// Which targets a rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    /// Only records of the principal's own company.
    OwnCompany,
}

struct Rule {
    resource: Resource,
    action: Action,
    role: Role,
    scope: Scope,
}

const fn rule(resource: Resource, action: Action, role: Role, scope: Scope) -> Rule {
    Rule {
        resource,
        action,
        role,
        scope,
    }
}

use Action::{Create, Delete, Edit, EditStatus, ToggleActive, View, ViewCostReport};
use Resource::{Company, Project};
use Role::{ClientAdmin, ClientUser, SuperAdmin, SupportAgent};
use Scope::{Any, OwnCompany};

const RULES: &[Rule] = &[
    rule(Company, View, SuperAdmin, Any),
    rule(Company, View, SupportAgent, Any),
    rule(Company, View, ClientAdmin, OwnCompany),
    rule(Company, View, ClientUser, OwnCompany),
    rule(Company, Create, SuperAdmin, Any),
    rule(Company, Edit, SuperAdmin, Any),
    rule(Company, Edit, ClientAdmin, OwnCompany),
    rule(Company, Delete, SuperAdmin, Any),
    rule(Project, View, SuperAdmin, Any),
    rule(Project, View, SupportAgent, Any),
    rule(Project, View, ClientAdmin, OwnCompany),
    rule(Project, View, ClientUser, OwnCompany),
    rule(Project, Create, SuperAdmin, Any),
    rule(Project, Create, ClientAdmin, OwnCompany),
    rule(Project, Edit, SuperAdmin, Any),
    rule(Project, Edit, ClientAdmin, OwnCompany),
    rule(Project, ToggleActive, SuperAdmin, Any),
    rule(Project, ToggleActive, ClientAdmin, OwnCompany),
    rule(Project, Delete, SuperAdmin, Any),
    rule(Project, EditStatus, SuperAdmin, Any),
    rule(Project, ViewCostReport, SuperAdmin, Any),
    rule(Project, ViewCostReport, ClientAdmin, OwnCompany),
];

/// The scope granted to `role`, or `None` if the action is not allowed.
pub fn scope_for(role: Role, action: Action, resource: Resource) -> Option<Scope> {
    RULES
        .iter()
        .find(|r| r.role == role && r.action == action && r.resource == resource)
        .map(|r| r.scope)
}

/// Whether `principal` may perform `action` on `resource`.
///
/// `target_company` is the company owning the record. Without one (e.g.
/// before a create form has a company picked) an own-company rule passes
/// when the principal has a company at all.
pub fn allows(
    principal: &Principal,
    action: Action,
    resource: Resource,
    target_company: Option<u64>,
) -> bool {
    match scope_for(principal.role, action, resource) {
        None => false,
        Some(Scope::Any) => true,
        Some(Scope::OwnCompany) => match target_company {
            Some(company_id) => principal.belongs_to(company_id),
            None => principal.company_id.is_some(),
        },
    }
}

/// Like [`allows`] but as a `Forbidden` error carrying a readable message.
pub fn ensure(
    principal: &Principal,
    action: Action,
    resource: Resource,
    target_company: Option<u64>,
) -> Result<(), ApiError> {
    if allows(principal, action, resource, target_company) {
        Ok(())
    } else {
        Err(ApiError::Forbidden {
            message: Some(denied_message(action, resource)),
        })
    }
}

/// Company filter to apply to project listings: `None` for super admins,
/// the principal's own company otherwise.
pub fn listing_company(principal: &Principal) -> Option<u64> {
    if principal.role == Role::SuperAdmin {
        None
    } else {
        principal.company_id
    }
}

pub fn denied_message(action: Action, resource: Resource) -> String {
    format!("Sem permissão para {action} {resource}")
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            View => "visualizar",
            Create => "criar",
            Edit => "editar",
            Delete => "excluir",
            ToggleActive => "ativar/desativar",
            EditStatus => "alterar o status de",
            ViewCostReport => "ver o relatório de custos de",
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Company => "empresas",
            Project => "projetos",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::principal;

    #[test]
    fn test_only_super_admin_manages_companies() {
        let admin = principal(SuperAdmin, None);
        let client_admin = principal(ClientAdmin, Some(7));
        let agent = principal(SupportAgent, None);

        for action in [Create, Delete] {
            assert!(allows(&admin, action, Company, Some(7)));
            assert!(!allows(&client_admin, action, Company, Some(7)));
            assert!(!allows(&agent, action, Company, Some(7)));
        }
    }

    #[test]
    fn test_client_admin_edits_only_own_company() {
        let client_admin = principal(ClientAdmin, Some(7));
        assert!(allows(&client_admin, Edit, Company, Some(7)));
        assert!(!allows(&client_admin, Edit, Company, Some(8)));

        let orphan = principal(ClientAdmin, None);
        assert!(!allows(&orphan, Edit, Company, Some(7)));
    }

    #[test]
    fn test_project_actions() {
        let admin = principal(SuperAdmin, None);
        let client_admin = principal(ClientAdmin, Some(7));
        let user = principal(ClientUser, Some(7));

        assert!(allows(&client_admin, Create, Project, None));
        assert!(allows(&client_admin, ToggleActive, Project, Some(7)));
        assert!(!allows(&client_admin, ToggleActive, Project, Some(9)));
        assert!(!allows(&client_admin, Delete, Project, Some(7)));
        assert!(!allows(&client_admin, EditStatus, Project, Some(7)));
        assert!(allows(&admin, EditStatus, Project, Some(7)));
        assert!(allows(&admin, Delete, Project, Some(7)));

        assert!(allows(&user, View, Project, Some(7)));
        assert!(!allows(&user, View, Project, Some(8)));
        assert!(!allows(&user, Edit, Project, Some(7)));
    }

    #[test]
    fn test_support_agent_views_everything_changes_nothing() {
        let agent = principal(SupportAgent, None);
        for resource in [Company, Project] {
            assert!(allows(&agent, View, resource, Some(3)));
            for action in [Create, Edit, Delete, ToggleActive] {
                assert!(!allows(&agent, action, resource, Some(3)));
            }
        }
        assert!(!allows(&agent, ViewCostReport, Project, Some(3)));
    }

    #[test]
    fn test_listing_company_scope() {
        assert_eq!(listing_company(&principal(SuperAdmin, Some(1))), None);
        assert_eq!(listing_company(&principal(SupportAgent, None)), None);
        assert_eq!(listing_company(&principal(SupportAgent, Some(2))), Some(2));
        assert_eq!(listing_company(&principal(ClientUser, Some(4))), Some(4));
    }

    #[test]
    fn test_ensure_message() {
        let user = principal(ClientUser, Some(4));
        let err = ensure(&user, Delete, Company, Some(4)).unwrap_err();
        assert_eq!(err.to_string(), "Sem permissão para excluir empresas");
    }
}
