// Permission strings and the built-in role grants.
//
// A caller holds a permission when it is listed in the session's explicit
// `permissions` claim (or the claim contains "*"), or when their built-in
// role grants it.

use serde::Serialize;

use crate::database::models::UserRole;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    #[serde(rename = "users:read")]
    UsersRead,
    #[serde(rename = "users:write")]
    UsersWrite,
    #[serde(rename = "users:delete")]
    UsersDelete,
    #[serde(rename = "users:export")]
    UsersExport,
    #[serde(rename = "clients:read")]
    ClientsRead,
    #[serde(rename = "clients:write")]
    ClientsWrite,
    #[serde(rename = "roles:read")]
    RolesRead,
    #[serde(rename = "roles:write")]
    RolesWrite,
    #[serde(rename = "reports:read")]
    ReportsRead,
    #[serde(rename = "reports:write")]
    ReportsWrite,
    #[serde(rename = "reports:generate")]
    ReportsGenerate,
    #[serde(rename = "filter_presets:read")]
    FilterPresetsRead,
    #[serde(rename = "filter_presets:write")]
    FilterPresetsWrite,
    #[serde(rename = "settings:read")]
    SettingsRead,
    #[serde(rename = "settings:write")]
    SettingsWrite,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Self::UsersRead,
        Self::UsersWrite,
        Self::UsersDelete,
        Self::UsersExport,
        Self::ClientsRead,
        Self::ClientsWrite,
        Self::RolesRead,
        Self::RolesWrite,
        Self::ReportsRead,
        Self::ReportsWrite,
        Self::ReportsGenerate,
        Self::FilterPresetsRead,
        Self::FilterPresetsWrite,
        Self::SettingsRead,
        Self::SettingsWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsersRead => "users:read",
            Self::UsersWrite => "users:write",
            Self::UsersDelete => "users:delete",
            Self::UsersExport => "users:export",
            Self::ClientsRead => "clients:read",
            Self::ClientsWrite => "clients:write",
            Self::RolesRead => "roles:read",
            Self::RolesWrite => "roles:write",
            Self::ReportsRead => "reports:read",
            Self::ReportsWrite => "reports:write",
            Self::ReportsGenerate => "reports:generate",
            Self::FilterPresetsRead => "filter_presets:read",
            Self::FilterPresetsWrite => "filter_presets:write",
            Self::SettingsRead => "settings:read",
            Self::SettingsWrite => "settings:write",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s.trim())
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::UsersRead => "View users and user statistics",
            Self::UsersWrite => "Create and edit users",
            Self::UsersDelete => "Delete users",
            Self::UsersExport => "Manage scheduled user exports",
            Self::ClientsRead => "View clients",
            Self::ClientsWrite => "Create, edit and delete clients",
            Self::RolesRead => "View roles and permissions",
            Self::RolesWrite => "Create, edit and delete custom roles",
            Self::ReportsRead => "View reports and their execution history",
            Self::ReportsWrite => "Create, edit and delete reports",
            Self::ReportsGenerate => "Generate report files",
            Self::FilterPresetsRead => "View saved filter presets",
            Self::FilterPresetsWrite => "Save, edit and delete own filter presets",
            Self::SettingsRead => "View user management settings",
            Self::SettingsWrite => "Change user management settings",
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.as_str().ends_with(":read")
    }
}

/// Permissions a built-in role carries without any explicit claim
pub fn role_grants(role: UserRole, permission: Permission) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::Manager => !matches!(permission, Permission::RolesWrite | Permission::SettingsWrite),
        UserRole::User => {
            permission.is_read_only()
                || matches!(permission, Permission::FilterPresetsWrite | Permission::ReportsGenerate)
        }
        UserRole::Viewer => permission.is_read_only(),
    }
}

pub fn has_permission(user: &AuthUser, permission: Permission) -> bool {
    let explicit = user
        .permissions
        .iter()
        .any(|p| p == "*" || p == permission.as_str());
    explicit || user.role().map(|r| role_grants(r, permission)).unwrap_or(false)
}

/// 403 unless the caller holds `permission`
pub fn require_permission(user: &AuthUser, permission: Permission) -> Result<(), ApiError> {
    if has_permission(user, permission) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %user.user_id,
        tenant_id = %user.tenant_id,
        permission = permission.as_str(),
        "Permission denied"
    );
    Err(ApiError::forbidden(format!("Missing permission '{}'", permission.as_str())))
}

/// Split permission strings into parsed ones and unknown ones
pub fn partition_known(values: &[String]) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    for value in values {
        match Permission::parse(value) {
            Some(p) => {
                let s = p.as_str().to_string();
                if !known.contains(&s) {
                    known.push(s);
                }
            }
            None => unknown.push(value.clone()),
        }
    }
    (known, unknown)
}
