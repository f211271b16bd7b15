// Shared fixtures for unit tests
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{User, UserRole, UserStatus};

pub fn user(name: &str, email: &str, role: UserRole, status: UserStatus) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        email: email.to_string(),
        name: name.to_string(),
        role_str: role.as_str().to_string(),
        status_str: status.as_str().to_string(),
        department: None,
        phone: None,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// 150 users: 50 admins, 75 users, 25 viewers; every fourth one inactive
pub fn fixture_users() -> Vec<User> {
    (0..150)
        .map(|i| {
            let role = match i {
                0..=49 => UserRole::Admin,
                50..=124 => UserRole::User,
                _ => UserRole::Viewer,
            };
            let status = if i % 4 == 0 { UserStatus::Inactive } else { UserStatus::Active };
            let mut u = user(
                &format!("Person {}", i),
                &format!("person{}@example.com", i),
                role,
                status,
            );
            u.department = Some(if i % 2 == 0 { "Sales" } else { "Support" }.to_string());
            u
        })
        .collect()
}

#[test]
fn fixture_shape() {
    let users = fixture_users();
    assert_eq!(users.len(), 150);
    assert_eq!(users.iter().filter(|u| u.role() == Some(UserRole::Admin)).count(), 50);
}
