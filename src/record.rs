//! Persisted entity records and service input types.

use crate::types::{GroupId, PermissionId, RoleId, TenantId};
use chrono::{DateTime, Utc};

/// Entity lifecycle status.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Entity participates in grants and checks.
    #[default]
    Enabled,
    /// Entity is retained but inert: it cannot receive new grants and is
    /// skipped by authorization checks.
    Disabled,
}

impl Status {
    /// Returns whether the status is [`Status::Enabled`].
    pub fn is_enabled(self) -> bool {
        matches!(self, Status::Enabled)
    }
}

/// Classification a group applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupKind {
    /// Group collects permissions.
    Permission,
    /// Group collects roles.
    Role,
}

/// Stored group row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupRecord {
    pub id: GroupId,
    pub ctx: TenantId,
    pub kind: GroupKind,
    /// Unique per `(ctx, kind)`.
    pub name: String,
    pub alias_name: String,
    pub status: Status,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Stored permission row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub ctx: TenantId,
    pub group_id: GroupId,
    /// Unique per `ctx`.
    pub name: String,
    pub alias_name: String,
    /// Optional machine identifier, unique per `ctx` when present.
    pub identifier: Option<String>,
    pub description: String,
    pub status: Status,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Stored role row.
///
/// `left_value`/`right_value` encode the role's subtree span in the tenant's
/// nested-set tree: a node's span strictly contains the spans of all its
/// descendants, so ancestor and descendant queries are interval comparisons.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleRecord {
    pub id: RoleId,
    pub ctx: TenantId,
    pub group_id: Option<GroupId>,
    /// Unique per `ctx`.
    pub name: String,
    pub alias_name: String,
    pub description: String,
    pub status: Status,
    pub parent_id: Option<RoleId>,
    pub left_value: i64,
    pub right_value: i64,
    /// Root roles have depth 1; every child is one deeper than its parent.
    pub depth: i32,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl RoleRecord {
    /// Returns whether `other`'s span lies strictly inside this role's span.
    pub fn contains(&self, other: &RoleRecord) -> bool {
        self.left_value < other.left_value && self.right_value > other.right_value
    }
}

/// Input for [`crate::Rbac::create_group`].
#[derive(Clone, Debug)]
pub struct NewGroup {
    pub kind: GroupKind,
    pub name: String,
    pub alias_name: String,
    pub status: Status,
}

/// Input for [`crate::Rbac::create_permission`].
#[derive(Clone, Debug)]
pub struct NewPermission {
    pub group: GroupId,
    pub name: String,
    pub alias_name: String,
    pub identifier: Option<String>,
    pub description: String,
    pub status: Status,
}

/// Input for [`crate::Rbac::add_role`].
#[derive(Clone, Debug)]
pub struct NewRole {
    /// Parent role; `None` appends a new root.
    pub parent: Option<RoleId>,
    pub group: Option<GroupId>,
    pub name: String,
    pub alias_name: String,
    pub description: String,
    pub status: Status,
}

/// Non-structural field changes for a group. `None` leaves the field as is.
#[derive(Clone, Debug, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub alias_name: Option<String>,
    pub status: Option<Status>,
}

/// Non-structural field changes for a permission.
#[derive(Clone, Debug, Default)]
pub struct PermissionChanges {
    pub group: Option<GroupId>,
    pub name: Option<String>,
    pub alias_name: Option<String>,
    pub identifier: Option<Option<String>>,
    pub description: Option<String>,
}

/// Non-structural field changes for a role.
///
/// Structural coordinates (parent, span, depth) are never updated here; the
/// tree shape only changes through [`crate::Rbac::add_role`].
#[derive(Clone, Debug, Default)]
pub struct RoleChanges {
    pub group: Option<Option<GroupId>>,
    pub name: Option<String>,
    pub alias_name: Option<String>,
    pub description: Option<String>,
}

/// Mutual-exclusion edge with display names for both endpoints.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleMutexEdge {
    pub role_id: RoleId,
    pub role_name: String,
    pub mutex_role_id: RoleId,
    pub mutex_role_name: String,
}

/// Prerequisite edge between roles: `role_id` requires `pre_role_id`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreRoleEdge {
    pub role_id: RoleId,
    pub role_name: String,
    pub pre_role_id: RoleId,
    pub pre_role_name: String,
}

/// Prerequisite edge between permissions: `permission_id` requires
/// `pre_permission_id`. When `auto_grant` is set, attaching the dependent
/// permission to a role also attaches the prerequisite.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrePermissionEdge {
    pub permission_id: PermissionId,
    pub permission_name: String,
    pub pre_permission_id: PermissionId,
    pub pre_permission_name: String,
    pub auto_grant: bool,
}

/// Row of [`crate::Rbac::get_granted_roles`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrantedRole {
    pub role: RoleRecord,
    /// A Grant row exists for exactly this role.
    pub granted: bool,
    /// A Grant row exists for this role or one of its strict ancestors.
    pub can_access: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenantId;

    fn role(left: i64, right: i64) -> RoleRecord {
        RoleRecord {
            id: RoleId::new(1),
            ctx: TenantId::try_from("t1").unwrap(),
            group_id: None,
            name: "r".to_string(),
            alias_name: String::new(),
            description: String::new(),
            status: Status::Enabled,
            parent_id: None,
            left_value: left,
            right_value: right,
            depth: 1,
            created_on: Utc::now(),
            updated_on: Utc::now(),
        }
    }

    #[test]
    fn contains_requires_strict_span_nesting() {
        let outer = role(1, 8);
        let inner = role(2, 5);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outer));
    }

    #[test]
    fn status_default_is_enabled() {
        assert!(Status::default().is_enabled());
        assert!(!Status::Disabled.is_enabled());
    }
}
