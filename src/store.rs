//! Persistence port consumed by the engine.
//!
//! The port is split into one trait per concern; [`Store`] is the blanket
//! composite the engine is generic over. Implementations own durability and
//! atomicity: [`RoleTreeStore::apply_tree_edit`] and the `replace_*` methods
//! must each execute as one atomic unit (a transaction in a SQL backend, a
//! single write-lock scope in memory). Everything else is independent
//! row-level mutation on keyed sets.

use crate::error::StoreError;
use crate::record::{
    GroupKind, GroupRecord, NewGroup, NewPermission, PermissionRecord, PreRoleEdge,
    PrePermissionEdge, RoleMutexEdge, RoleRecord, Status,
};
use crate::types::{GroupId, PermissionId, RoleId, TargetId, TenantId};
use async_trait::async_trait;

/// Result alias for port methods.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Listing filter for groups.
#[derive(Clone, Debug, Default)]
pub struct GroupFilter {
    pub kind: Option<GroupKind>,
    pub status: Option<Status>,
    /// Substring match on name or alias name.
    pub keyword: Option<String>,
}

/// Listing filter for permissions.
#[derive(Clone, Debug, Default)]
pub struct PermissionFilter {
    pub group: Option<GroupId>,
    pub status: Option<Status>,
    pub keyword: Option<String>,
}

/// Listing filter for roles.
#[derive(Clone, Debug, Default)]
pub struct RoleFilter {
    /// Restricts to direct children of the given role.
    pub parent: Option<RoleId>,
    pub status: Option<Status>,
    pub keyword: Option<String>,
}

/// Field values for a role row inserted by a tree edit. Coordinates are
/// computed by the engine; the store only assigns the surrogate id and
/// timestamps.
#[derive(Clone, Debug)]
pub struct RoleSeed {
    pub group_id: Option<GroupId>,
    pub name: String,
    pub alias_name: String,
    pub description: String,
    pub status: Status,
    pub parent_id: Option<RoleId>,
    pub left_value: i64,
    pub right_value: i64,
    pub depth: i32,
}

/// State the tenant's tree must still be in for a [`TreeEdit`] to apply.
///
/// The engine reads the anchor, computes the edit, and the store re-checks the
/// anchor under its atomic scope. A stale anchor means a concurrent edit won
/// the race; the store must reject with [`StoreError::EditConflict`] without
/// touching any row.
#[derive(Clone, Debug)]
pub enum TreeAnchor {
    /// Root append: the tenant-wide maximum `right_value` (None for an empty
    /// tenant) must be unchanged.
    Root { expected_max_right: Option<i64> },
    /// Child append: the parent's `right_value` must be unchanged.
    Child { parent: RoleId, expected_right: i64 },
}

/// Range renumbering applied before a child insert: every role in the tenant
/// with `left_value > left_gt` gets `left_value += delta`, every role with
/// `right_value >= right_ge` gets `right_value += delta`.
#[derive(Clone, Copy, Debug)]
pub struct RangeShift {
    pub left_gt: i64,
    pub right_ge: i64,
    pub delta: i64,
}

/// Atomic shift-then-insert plan for one role insertion.
#[derive(Clone, Debug)]
pub struct TreeEdit {
    pub anchor: TreeAnchor,
    /// `None` for root appends, which shift nothing.
    pub shift: Option<RangeShift>,
    pub insert: RoleSeed,
}

/// Store interface for groups and permissions.
#[async_trait]
pub trait CatalogStore {
    async fn insert_group(&self, ctx: &TenantId, group: NewGroup) -> StoreResult<GroupRecord>;

    async fn find_group(&self, ctx: &TenantId, id: GroupId) -> StoreResult<Option<GroupRecord>>;

    async fn find_group_by_name(
        &self,
        ctx: &TenantId,
        kind: GroupKind,
        name: &str,
    ) -> StoreResult<Option<GroupRecord>>;

    async fn list_groups(
        &self,
        ctx: &TenantId,
        filter: &GroupFilter,
    ) -> StoreResult<Vec<GroupRecord>>;

    /// Overwrites the non-key fields of an existing group row and bumps
    /// `updated_on`.
    async fn save_group(&self, group: &GroupRecord) -> StoreResult<()>;

    async fn delete_group(&self, ctx: &TenantId, id: GroupId) -> StoreResult<()>;

    /// Counts permissions (for [`GroupKind::Permission`]) or roles (for
    /// [`GroupKind::Role`]) attached to the group.
    async fn group_member_count(
        &self,
        ctx: &TenantId,
        id: GroupId,
        kind: GroupKind,
    ) -> StoreResult<u64>;

    async fn insert_permission(
        &self,
        ctx: &TenantId,
        permission: NewPermission,
    ) -> StoreResult<PermissionRecord>;

    async fn find_permission(
        &self,
        ctx: &TenantId,
        id: PermissionId,
    ) -> StoreResult<Option<PermissionRecord>>;

    async fn find_permission_by_name(
        &self,
        ctx: &TenantId,
        name: &str,
    ) -> StoreResult<Option<PermissionRecord>>;

    async fn find_permission_by_identifier(
        &self,
        ctx: &TenantId,
        identifier: &str,
    ) -> StoreResult<Option<PermissionRecord>>;

    async fn list_permissions(
        &self,
        ctx: &TenantId,
        filter: &PermissionFilter,
    ) -> StoreResult<Vec<PermissionRecord>>;

    /// Overwrites the non-key fields of an existing permission row and bumps
    /// `updated_on`.
    async fn save_permission(&self, permission: &PermissionRecord) -> StoreResult<()>;

    /// Fetches the existing subset of `ids`, in no particular order.
    async fn fetch_permissions(
        &self,
        ctx: &TenantId,
        ids: &[PermissionId],
    ) -> StoreResult<Vec<PermissionRecord>>;
}

/// Store interface for the nested-set role tree.
#[async_trait]
pub trait RoleTreeStore {
    /// Applies one shift-then-insert plan atomically and returns the inserted
    /// row. Must fail with [`StoreError::EditConflict`], leaving every row
    /// untouched, when the edit's anchor is stale.
    async fn apply_tree_edit(&self, ctx: &TenantId, edit: TreeEdit) -> StoreResult<RoleRecord>;

    async fn find_role(&self, ctx: &TenantId, id: RoleId) -> StoreResult<Option<RoleRecord>>;

    async fn find_role_by_name(
        &self,
        ctx: &TenantId,
        name: &str,
    ) -> StoreResult<Option<RoleRecord>>;

    async fn list_roles(&self, ctx: &TenantId, filter: &RoleFilter)
    -> StoreResult<Vec<RoleRecord>>;

    /// Overwrites the non-structural fields of an existing role row and bumps
    /// `updated_on`. Coordinates and parent in `role` must match the stored
    /// row; structural change only happens through [`Self::apply_tree_edit`].
    async fn save_role(&self, role: &RoleRecord) -> StoreResult<()>;

    /// Fetches the existing subset of `ids`, in no particular order.
    async fn fetch_roles(&self, ctx: &TenantId, ids: &[RoleId]) -> StoreResult<Vec<RoleRecord>>;

    /// Tenant-wide maximum `right_value`, `None` when the tenant has no roles.
    async fn max_right(&self, ctx: &TenantId) -> StoreResult<Option<i64>>;

    /// Roles whose span contains `(left, right)`, ordered by `left_value`
    /// ascending (root first). `strict` excludes the span itself.
    async fn ancestors_of(
        &self,
        ctx: &TenantId,
        left: i64,
        right: i64,
        strict: bool,
    ) -> StoreResult<Vec<RoleRecord>>;

    /// Roles whose span lies inside `(left, right)`, ordered by `left_value`
    /// ascending. `strict` excludes the span itself.
    async fn descendants_of(
        &self,
        ctx: &TenantId,
        left: i64,
        right: i64,
        strict: bool,
    ) -> StoreResult<Vec<RoleRecord>>;
}

/// Store interface for the grant ledger rows.
#[async_trait]
pub trait GrantStore {
    /// Inserts RolePermission rows, ignoring ones that already exist.
    async fn attach_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()>;

    /// Deletes matching RolePermission rows; missing rows are not an error.
    async fn detach_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()>;

    /// Atomically replaces the role's entire permission set.
    async fn replace_role_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()>;

    async fn role_permission_ids(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> StoreResult<Vec<PermissionId>>;

    /// Inserts Grant rows, ignoring ones that already exist.
    async fn insert_grants(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()>;

    /// Deletes matching Grant rows; missing rows are not an error.
    async fn delete_grants(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()>;

    async fn delete_all_grants(&self, ctx: &TenantId, target: &TargetId) -> StoreResult<()>;

    /// Atomically replaces the target's entire role set.
    async fn replace_target_roles(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()>;

    async fn target_role_ids(&self, ctx: &TenantId, target: &TargetId)
    -> StoreResult<Vec<RoleId>>;
}

/// Store interface for mutual-exclusion and prerequisite edges.
#[async_trait]
pub trait ConstraintStore {
    /// Inserts mutex edges, ignoring ones that already exist. Callers supply
    /// both directions of each symmetric pair.
    async fn insert_role_mutexes(
        &self,
        ctx: &TenantId,
        pairs: &[(RoleId, RoleId)],
    ) -> StoreResult<()>;

    async fn delete_role_mutexes(
        &self,
        ctx: &TenantId,
        pairs: &[(RoleId, RoleId)],
    ) -> StoreResult<()>;

    /// Removes every mutex edge touching `role`, in both directions.
    async fn clear_role_mutexes(&self, ctx: &TenantId, role: RoleId) -> StoreResult<()>;

    async fn role_mutex_exists(&self, ctx: &TenantId, a: RoleId, b: RoleId) -> StoreResult<bool>;

    /// Mutex edges whose first endpoint is `role`, with display names.
    async fn list_role_mutexes(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> StoreResult<Vec<RoleMutexEdge>>;

    /// Inserts `(role, pre_role)` edges, ignoring ones that already exist.
    async fn insert_pre_roles(&self, ctx: &TenantId, edges: &[(RoleId, RoleId)])
    -> StoreResult<()>;

    async fn delete_pre_roles(&self, ctx: &TenantId, edges: &[(RoleId, RoleId)])
    -> StoreResult<()>;

    /// Removes every prerequisite edge whose dependent side is `role`.
    async fn clear_pre_roles(&self, ctx: &TenantId, role: RoleId) -> StoreResult<()>;

    /// Prerequisite edges whose dependent side is `role`, with display names.
    async fn list_pre_roles(&self, ctx: &TenantId, role: RoleId) -> StoreResult<Vec<PreRoleEdge>>;

    /// Inserts `(permission, pre_permission)` edges carrying `auto_grant`,
    /// ignoring ones that already exist (the flag of an existing edge is left
    /// as is).
    async fn insert_pre_permissions(
        &self,
        ctx: &TenantId,
        edges: &[(PermissionId, PermissionId)],
        auto_grant: bool,
    ) -> StoreResult<()>;

    async fn delete_pre_permissions(
        &self,
        ctx: &TenantId,
        edges: &[(PermissionId, PermissionId)],
    ) -> StoreResult<()>;

    /// Removes every prerequisite edge whose dependent side is `permission`.
    async fn clear_pre_permissions(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> StoreResult<()>;

    /// Prerequisite edges whose dependent side is `permission`, with display
    /// names and the recorded `auto_grant` flag.
    async fn list_pre_permissions(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> StoreResult<Vec<PrePermissionEdge>>;
}

/// Composite store trait.
pub trait Store: CatalogStore + RoleTreeStore + GrantStore + ConstraintStore + Send + Sync {}

impl<T> Store for T where T: CatalogStore + RoleTreeStore + GrantStore + ConstraintStore + Send + Sync
{}
