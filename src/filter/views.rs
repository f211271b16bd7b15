use serde::Serialize;

use crate::database::models::UserRole;

use super::types::UserFilter;
use super::user_filter::{FilterState, FilterTarget};

/// Named tab over the user list, optionally pinned to one role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserView {
    pub name: &'static str,
    pub label: &'static str,
    pub role: Option<UserRole>,
}

pub const USER_VIEWS: [UserView; 5] = [
    UserView { name: "all", label: "All users", role: None },
    UserView { name: "admins", label: "Administrators", role: Some(UserRole::Admin) },
    UserView { name: "managers", label: "Managers", role: Some(UserRole::Manager) },
    UserView { name: "users", label: "Users", role: Some(UserRole::User) },
    UserView { name: "viewers", label: "Viewers", role: Some(UserRole::Viewer) },
];

/// Resolve a view by name to the `(view, role)` pair handed to the list filter.
/// `all` yields no role.
pub fn select_view(name: &str) -> Option<(&'static str, Option<UserRole>)> {
    USER_VIEWS
        .iter()
        .find(|v| v.name.eq_ignore_ascii_case(name.trim()))
        .map(|v| (v.name, v.role))
}

/// Badge text for a count; anything above 99 is "99+"
pub fn format_view_count(count: usize) -> String {
    if count > 99 {
        "99+".to_string()
    } else {
        count.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCount {
    pub name: &'static str,
    pub label: &'static str,
    pub role: Option<UserRole>,
    pub count: usize,
    pub display: String,
}

/// Count each view under `base` (its own role is replaced by the view's)
pub fn view_counts<T: FilterTarget>(records: Vec<T>, base: &UserFilter) -> Vec<ViewCount> {
    let mut state = FilterState::new(records);
    USER_VIEWS
        .iter()
        .map(|view| {
            state.set_filter(base.with_role(view.role));
            let count = state.stats().filtered;
            ViewCount {
                name: view.name,
                label: view.label,
                role: view.role,
                count,
                display: format_view_count(count),
            }
        })
        .collect()
}
