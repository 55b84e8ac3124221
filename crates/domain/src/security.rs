use std::collections::BTreeSet;

use kkvat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::flags::deserialize_lenient_bool;
use crate::menu::MenuItem;

fn default_active() -> bool {
    true
}

/// User group as returned by `/api/groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Backend identifier.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Unique group name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the group is enabled.
    #[serde(default = "default_active", deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
}

/// Create/update body for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    /// Unique group name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Whether the group is enabled.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<&Group> for GroupDraft {
    fn from(group: &Group) -> Self {
        Self {
            name: group.name.clone(),
            description: group.description.clone().unwrap_or_default(),
            is_active: group.is_active,
        }
    }
}

/// Editable membership set for one group.
///
/// Membership is replaced wholesale on save, so the set is the only state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembership {
    group_id: i64,
    user_ids: BTreeSet<i64>,
}

impl GroupMembership {
    /// Creates a membership set seeded with the current members.
    #[must_use]
    pub fn new(group_id: i64, user_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            group_id,
            user_ids: user_ids.into_iter().collect(),
        }
    }

    /// Returns the group identifier.
    #[must_use]
    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Adds the user when absent, removes it when present.
    pub fn toggle(&mut self, user_id: i64) {
        if !self.user_ids.remove(&user_id) {
            self.user_ids.insert(user_id);
        }
    }

    /// Returns whether the user is currently a member.
    #[must_use]
    pub fn contains(&self, user_id: i64) -> bool {
        self.user_ids.contains(&user_id)
    }

    /// Returns member ids in ascending order.
    #[must_use]
    pub fn user_ids(&self) -> Vec<i64> {
        self.user_ids.iter().copied().collect()
    }

    /// Returns the `PUT /api/groups/{id}/users` body.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({ "userIds": self.user_ids() })
    }
}

/// Role as returned by `/api/roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Backend identifier.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Unique role name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the role is enabled.
    #[serde(default = "default_active", deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
    /// Menu items granted to the role, when the payload includes them.
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

impl Role {
    /// Case-insensitive containment match on name or description.
    #[must_use]
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        self.name.to_lowercase().contains(needle.as_str())
            || self
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(needle.as_str()))
    }
}

/// Create/update body for a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
    /// Unique role name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Whether the role is enabled.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<&Role> for RoleDraft {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            description: role.description.clone().unwrap_or_default(),
            is_active: role.is_active,
        }
    }
}

/// Full-replace assignment of menu items to a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMenuAssignment {
    role_id: Option<i64>,
    menu_item_ids: BTreeSet<i64>,
}

impl RoleMenuAssignment {
    /// Creates an empty assignment with no role selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the role being edited.
    pub fn select_role(&mut self, role_id: i64) {
        self.role_id = Some(role_id);
    }

    /// Returns the selected role.
    #[must_use]
    pub fn role_id(&self) -> Option<i64> {
        self.role_id
    }

    /// Marks a menu item as checked or unchecked.
    pub fn set_checked(&mut self, menu_item_id: i64, checked: bool) {
        if checked {
            self.menu_item_ids.insert(menu_item_id);
        } else {
            self.menu_item_ids.remove(&menu_item_id);
        }
    }

    /// Returns checked menu item ids in ascending order.
    #[must_use]
    pub fn menu_item_ids(&self) -> Vec<i64> {
        self.menu_item_ids.iter().copied().collect()
    }

    /// Returns the `PUT /api/roles/{id}` body, or an error when no role is selected.
    pub fn to_payload(&self) -> AppResult<(i64, Value)> {
        let role_id = self
            .role_id
            .ok_or_else(|| AppError::Validation("select a role first".to_owned()))?;
        let menu_items: Vec<Value> = self
            .menu_item_ids
            .iter()
            .map(|id| json!({ "id": id }))
            .collect();

        Ok((role_id, json!({ "id": role_id, "menuItems": menu_items })))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GroupMembership, Role, RoleMenuAssignment};

    fn role(name: &str, description: Option<&str>) -> Role {
        Role {
            id: 1,
            name: name.to_owned(),
            description: description.map(str::to_owned),
            is_active: true,
            menu_items: Vec::new(),
        }
    }

    #[test]
    fn membership_toggle_is_set_based() {
        let mut membership = GroupMembership::new(3, [5, 1]);
        membership.toggle(5);
        membership.toggle(9);
        membership.toggle(9);
        membership.toggle(2);

        assert_eq!(membership.user_ids(), vec![1, 2]);
        assert_eq!(membership.to_payload(), json!({ "userIds": [1, 2] }));
    }

    #[test]
    fn role_keyword_matches_name_or_description_case_insensitively() {
        assert!(role("Administrator", None).matches_keyword("ADMIN"));
        assert!(role("ops", Some("Runs Reports")).matches_keyword("reports"));
        assert!(!role("ops", None).matches_keyword("reports"));
        assert!(role("ops", None).matches_keyword("   "));
    }

    #[test]
    fn menu_assignment_requires_role() {
        let mut assignment = RoleMenuAssignment::new();
        assignment.set_checked(4, true);
        assert!(assignment.to_payload().is_err());

        assignment.select_role(2);
        assignment.set_checked(1, true);
        assignment.set_checked(4, false);
        let payload = assignment.to_payload();

        assert_eq!(
            payload.ok(),
            Some((2, json!({ "id": 2, "menuItems": [{ "id": 1 }] })))
        );
    }
}
