use crate::database::models::{User, UserRole, UserStatus};

use super::types::{FilterStats, UserFilter};

/// Records the user filter can evaluate
pub trait FilterTarget {
    fn role(&self) -> Option<UserRole>;
    fn status(&self) -> Option<UserStatus>;
    /// Values the free-text query is matched against
    fn search_fields(&self) -> Vec<&str>;
}

impl FilterTarget for User {
    fn role(&self) -> Option<UserRole> {
        User::role(self)
    }

    fn status(&self) -> Option<UserStatus> {
        User::status(self)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str(), self.role_str.as_str(), self.status_str.as_str()];
        if let Some(role) = User::role(self) {
            fields.push(role.label());
        }
        if let Some(department) = self.department.as_deref() {
            fields.push(department);
        }
        if let Some(phone) = self.phone.as_deref() {
            fields.push(phone);
        }
        fields
    }
}

impl UserFilter {
    pub fn matches<T: FilterTarget>(&self, record: &T) -> bool {
        if let Some(role) = self.role {
            if record.role() != Some(role) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status() != Some(status) {
                return false;
            }
        }
        match self.needle() {
            Some(needle) => record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        }
    }
}

/// Single pass over `records`, keeping those that satisfy every active predicate
pub fn apply<'a, T: FilterTarget>(filter: &UserFilter, records: &'a [T]) -> (Vec<&'a T>, FilterStats) {
    let matching: Vec<&T> = records.iter().filter(|r| filter.matches(*r)).collect();
    let stats = FilterStats {
        total: records.len(),
        filtered: matching.len(),
        has_active_filters: filter.is_active(),
    };
    (matching, stats)
}

/// Filter plus records, recomputing the match set only after either changes
pub struct FilterState<T> {
    records: Vec<T>,
    filter: UserFilter,
    cached: Option<(Vec<usize>, FilterStats)>,
    recomputations: usize,
}

impl<T: FilterTarget> FilterState<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            filter: UserFilter::default(),
            cached: None,
            recomputations: 0,
        }
    }

    pub fn filter(&self) -> &UserFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: UserFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.cached = None;
        }
    }

    pub fn set_records(&mut self, records: Vec<T>) {
        self.records = records;
        self.cached = None;
    }

    pub fn stats(&mut self) -> FilterStats {
        self.ensure();
        self.cached.as_ref().map(|(_, stats)| *stats).unwrap_or_default()
    }

    pub fn matching(&mut self) -> Vec<&T> {
        self.ensure();
        match &self.cached {
            Some((indices, _)) => indices.iter().map(|&i| &self.records[i]).collect(),
            None => Vec::new(),
        }
    }

    /// How many times the match set has been rebuilt
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    fn ensure(&mut self) {
        if self.cached.is_none() {
            let indices: Vec<usize> = self
                .records
                .iter()
                .enumerate()
                .filter(|(_, r)| self.filter.matches(*r))
                .map(|(i, _)| i)
                .collect();
            let stats = FilterStats {
                total: self.records.len(),
                filtered: indices.len(),
                has_active_filters: self.filter.is_active(),
            };
            self.recomputations += 1;
            self.cached = Some((indices, stats));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_users, user};

    #[test]
    fn query_matches_any_search_field_case_insensitively() {
        let users = vec![
            user("Ann Lee", "ann@example.com", UserRole::Admin, UserStatus::Active),
            user("Bo Chen", "bo@sales.example.com", UserRole::User, UserStatus::Active),
        ];
        let filter = UserFilter { query: Some("SALES".into()), ..Default::default() };
        let (matching, stats) = apply(&filter, &users);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Bo Chen");
        assert_eq!(stats, FilterStats { total: 2, filtered: 1, has_active_filters: true });
    }

    #[test]
    fn query_matches_role_label() {
        let users = vec![user("Ann Lee", "ann@example.com", UserRole::Admin, UserStatus::Active)];
        let filter = UserFilter { query: Some("administrator".into()), ..Default::default() };
        assert_eq!(apply(&filter, &users).0.len(), 1);
    }

    #[test]
    fn predicates_combine_with_and() {
        let users = fixture_users();
        let filter = UserFilter {
            query: Some("example.com".into()),
            role: Some(UserRole::Admin),
            status: Some(UserStatus::Active),
        };
        let (matching, stats) = apply(&filter, &users);
        let expected = users
            .iter()
            .filter(|u| {
                u.role() == Some(UserRole::Admin)
                    && u.status() == Some(UserStatus::Active)
                    && u.email.contains("example.com")
            })
            .count();
        assert_eq!(matching.len(), expected);
        assert_eq!(stats.filtered, expected);
        assert_eq!(stats.total, 150);
    }

    #[test]
    fn role_views_over_fixture() {
        let users = fixture_users();
        for (role, expected) in [(UserRole::Admin, 50), (UserRole::User, 75), (UserRole::Viewer, 25)] {
            let filter = UserFilter { role: Some(role), ..Default::default() };
            let (_, stats) = apply(&filter, &users);
            assert_eq!(stats.filtered, expected, "role {:?}", role);
            assert_eq!(stats.total, 150);
        }
        let (_, stats) = apply(&UserFilter::default(), &users);
        assert_eq!(stats, FilterStats { total: 150, filtered: 150, has_active_filters: false });
    }

    #[test]
    fn state_recomputes_only_on_change() {
        let mut state = FilterState::new(fixture_users());
        assert_eq!(state.stats().filtered, 150);
        assert_eq!(state.stats().filtered, 150);
        assert_eq!(state.recomputations(), 1);

        let admins = UserFilter { role: Some(UserRole::Admin), ..Default::default() };
        state.set_filter(admins.clone());
        assert_eq!(state.matching().len(), 50);
        state.set_filter(admins);
        assert_eq!(state.stats().filtered, 50);
        assert_eq!(state.recomputations(), 2);

        state.set_records(fixture_users().into_iter().take(10).collect());
        assert_eq!(state.stats().total, 10);
        assert_eq!(state.recomputations(), 3);
    }
}
