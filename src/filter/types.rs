use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::models::{UserRole, UserStatus};

/// Free-text query plus optional role and status; active parts combine with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserFilter {
    /// Lenient parse: malformed input is the inactive default filter
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value::<UserFilter>(value.clone())
            .map(UserFilter::normalized)
            .unwrap_or_default()
    }

    /// Trim the query and drop it when blank
    pub fn normalized(mut self) -> Self {
        self.query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }

    pub fn with_role(&self, role: Option<UserRole>) -> Self {
        Self { role, ..self.clone() }
    }

    /// Lower-cased search needle when the query is active
    pub fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_active(&self) -> bool {
        self.needle().is_some() || self.role.is_some() || self.status.is_some()
    }
}

/// Count triple reported next to every filtered list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStats {
    pub total: usize,
    pub filtered: usize,
    pub has_active_filters: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_query_is_inactive() {
        let f = UserFilter { query: Some("   ".into()), ..Default::default() };
        assert!(!f.is_active());
        assert_eq!(f.normalized().query, None);
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        assert_eq!(UserFilter::from_value(&json!({"role": "SUPERUSER"})), UserFilter::default());
        assert_eq!(UserFilter::from_value(&json!([1, 2, 3])), UserFilter::default());
    }

    #[test]
    fn parses_wire_shape() {
        let f = UserFilter::from_value(&json!({"query": " ann ", "role": "ADMIN", "status": "active"}));
        assert_eq!(f.query.as_deref(), Some("ann"));
        assert_eq!(f.role, Some(UserRole::Admin));
        assert_eq!(f.status, Some(UserStatus::Active));
        assert!(f.is_active());
    }
}
