use serde_json::Value;

use kkvat_core::AppResult;
use kkvat_domain::{GroupMembership, MenuItem, Role, RoleMenuAssignment, User};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::decode_rows;

/// Application service for group membership and role menu grants.
///
/// Both editors replace the server-side set wholesale on save.
#[derive(Clone)]
pub struct SecurityAdminService {
    gateway: ApiGateway,
}

impl SecurityAdminService {
    /// Creates a new service from the shared gateway.
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Returns every user that can be added to a group.
    pub async fn list_assignable_users(&self) -> AppResult<Vec<User>> {
        let payload: Value = self.gateway.get_json("/api/users/list", &[]).await?;
        Ok(decode_rows(payload))
    }

    /// Loads the current members of a group.
    pub async fn load_group_membership(&self, group_id: i64) -> AppResult<GroupMembership> {
        let payload: Value = self
            .gateway
            .get_json(&format!("/api/groups/{group_id}/users"), &[])
            .await?;
        let members: Vec<User> = decode_rows(payload);

        Ok(GroupMembership::new(
            group_id,
            members.into_iter().map(|user| user.id),
        ))
    }

    /// Replaces the members of a group.
    pub async fn save_group_membership(&self, membership: &GroupMembership) -> AppResult<()> {
        let group_id = membership.group_id();
        let _: Value = self
            .gateway
            .put_json(
                &format!("/api/groups/{group_id}/users"),
                &membership.to_payload(),
            )
            .await?;
        tracing::info!(
            group_id,
            members = membership.user_ids().len(),
            "group membership saved"
        );
        Ok(())
    }

    /// Returns every menu item that can be granted.
    pub async fn list_menu_items(&self) -> AppResult<Vec<MenuItem>> {
        let payload: Value = self.gateway.get_json("/api/menu-items", &[]).await?;
        Ok(decode_rows(payload))
    }

    /// Loads a role and seeds the editor with the menu items it already holds.
    pub async fn load_role_assignment(&self, role_id: i64) -> AppResult<RoleMenuAssignment> {
        let role: Role = self
            .gateway
            .get_json(&format!("/api/roles/{role_id}"), &[])
            .await?;

        let mut assignment = RoleMenuAssignment::new();
        assignment.select_role(role.id);
        for item in &role.menu_items {
            assignment.set_checked(item.id, true);
        }
        Ok(assignment)
    }

    /// Replaces the menu items granted to the selected role.
    pub async fn save_role_assignment(&self, assignment: &RoleMenuAssignment) -> AppResult<()> {
        let (role_id, payload) = assignment.to_payload()?;
        let _: Value = self
            .gateway
            .put_json(&format!("/api/roles/{role_id}"), &payload)
            .await?;
        tracing::info!(
            role_id,
            menu_items = assignment.menu_item_ids().len(),
            "role menu assignment saved"
        );
        Ok(())
    }
}
