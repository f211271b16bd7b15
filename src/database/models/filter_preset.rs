use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::filter::UserFilter;

/// Named, persisted user filter
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FilterPreset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub filters: Json<UserFilter>,
    pub is_public: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterPreset {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Readable by the owner, or by anyone in the tenant once public
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_public || self.is_owned_by(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct CreateFilterPreset {
    pub name: String,
    pub description: Option<String>,
    pub filters: UserFilter,
    pub is_public: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFilterPreset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub filters: Option<UserFilter>,
    pub is_public: Option<bool>,
    pub is_default: Option<bool>,
}

impl UpdateFilterPreset {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.filters.is_some()
            || self.is_public.is_some()
            || self.is_default.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(owner: Uuid, is_public: bool) -> FilterPreset {
        FilterPreset {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            created_by: owner,
            name: "Active admins".into(),
            description: None,
            filters: Json(UserFilter::default()),
            is_public,
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn private_preset_is_hidden_from_others() {
        let owner = Uuid::new_v4();
        let p = preset(owner, false);
        assert!(p.is_visible_to(owner));
        assert!(!p.is_visible_to(Uuid::new_v4()));
    }

    #[test]
    fn public_preset_is_visible_but_not_owned() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let p = preset(owner, true);
        assert!(p.is_visible_to(other));
        assert!(!p.is_owned_by(other));
    }
}
