//! Role -> capability table
//!
//! Checked once per command at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Estimator,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ViewSheets,
    CreateSheets,
    EditSheets,
    TagOutcome,
    FinalizeSheets,
    TrashSheets,
    RestoreSheets,
    HardDeleteSheets,
    ImportExcel,
    ExportExcel,
    ViewAnalytics,
    UseIntegrations,
    ManageSettings,
}

use Capability::*;

const ADMIN: &[Capability] = &[
    ViewSheets, CreateSheets, EditSheets, TagOutcome, FinalizeSheets, TrashSheets,
    RestoreSheets, HardDeleteSheets, ImportExcel, ExportExcel, ViewAnalytics,
    UseIntegrations, ManageSettings,
];

const MANAGER: &[Capability] = &[
    ViewSheets, CreateSheets, EditSheets, TagOutcome, FinalizeSheets, TrashSheets,
    RestoreSheets, HardDeleteSheets, ImportExcel, ExportExcel, ViewAnalytics,
    UseIntegrations,
];

const ESTIMATOR: &[Capability] = &[
    ViewSheets, CreateSheets, EditSheets, TagOutcome, FinalizeSheets, TrashSheets,
    ImportExcel, ExportExcel, ViewAnalytics, UseIntegrations,
];

const VIEWER: &[Capability] = &[ViewSheets, ViewAnalytics, ExportExcel];

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN,
            Role::Manager => MANAGER,
            Role::Estimator => ESTIMATOR,
            Role::Viewer => VIEWER,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// `Err(PermissionDenied)` when the role lacks the capability
    pub fn require(&self, capability: Capability) -> Result<(), PermissionDenied> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(PermissionDenied {
                role: *self,
                capability,
            })
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Estimator => write!(f, "estimator"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "estimator" => Ok(Role::Estimator),
            "viewer" | "readonly" => Ok(Role::Viewer),
            _ => Err(format!("Unknown role: {}. Use admin, manager, estimator, or viewer", s)),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ViewSheets => "view sheets",
            CreateSheets => "create sheets",
            EditSheets => "edit sheets",
            TagOutcome => "tag outcomes",
            FinalizeSheets => "finalize sheets",
            TrashSheets => "trash sheets",
            RestoreSheets => "restore sheets",
            HardDeleteSheets => "permanently delete sheets",
            ImportExcel => "import Excel",
            ExportExcel => "export Excel",
            ViewAnalytics => "view pricing analytics",
            UseIntegrations => "use integrations",
            ManageSettings => "manage settings",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("role '{role}' may not {capability}")]
pub struct PermissionDenied {
    pub role: Role,
    pub capability: Capability,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        for cap in ADMIN {
            assert!(Role::Admin.can(*cap));
        }
        assert_eq!(Role::Admin.capabilities().len(), 13);
    }

    #[test]
    fn test_manager_cannot_manage_settings() {
        assert!(Role::Manager.can(HardDeleteSheets));
        assert!(!Role::Manager.can(ManageSettings));
    }

    #[test]
    fn test_estimator_cannot_restore_or_hard_delete() {
        assert!(Role::Estimator.can(TrashSheets));
        assert!(!Role::Estimator.can(RestoreSheets));
        assert!(!Role::Estimator.can(HardDeleteSheets));
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Role::Viewer.can(ViewSheets));
        assert!(Role::Viewer.can(ExportExcel));
        for cap in [CreateSheets, EditSheets, TagOutcome, TrashSheets, ImportExcel] {
            assert!(!Role::Viewer.can(cap), "viewer should not {}", cap);
        }
    }

    #[test]
    fn test_require_denied_message() {
        let err = Role::Viewer.require(CreateSheets).unwrap_err();
        assert_eq!(err.to_string(), "role 'viewer' may not create sheets");
        assert!(Role::Viewer.require(ViewAnalytics).is_ok());
    }

    #[test]
    fn test_permission_denied_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Role::Estimator.require(ManageSettings).unwrap_err());
        assert_eq!(err.to_string(), "role 'estimator' may not manage settings");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_role_round_trip_str() {
        for role in [Role::Admin, Role::Manager, Role::Estimator, Role::Viewer] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
    }
}
