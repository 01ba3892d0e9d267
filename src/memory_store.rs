//! In-memory store implementation.
//!
//! The bundled reference backend: one `RwLock`-guarded state, so every port
//! method is trivially atomic. Tree edits verify their anchor under the write
//! guard before mutating, which serializes concurrent same-tenant inserts the
//! same way a transactional backend would.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::record::{
    GroupKind, GroupRecord, NewGroup, NewPermission, PermissionRecord, PreRoleEdge,
    PrePermissionEdge, RoleMutexEdge, RoleRecord,
};
use crate::store::{
    CatalogStore, ConstraintStore, GrantStore, GroupFilter, PermissionFilter, RoleFilter,
    RoleTreeStore, StoreResult, TreeAnchor, TreeEdit,
};
use crate::types::{GroupId, PermissionId, RoleId, TargetId, TenantId};

/// In-memory store backing the engine without an external database.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    next_group_id: i64,
    next_permission_id: i64,
    next_role_id: i64,
    groups: HashMap<GroupId, GroupRecord>,
    permissions: HashMap<PermissionId, PermissionRecord>,
    roles: HashMap<RoleId, RoleRecord>,
    role_permissions: HashSet<(TenantId, RoleId, PermissionId)>,
    grants: HashSet<(TenantId, RoleId, TargetId)>,
    role_mutexes: HashSet<(TenantId, RoleId, RoleId)>,
    pre_roles: HashSet<(TenantId, RoleId, RoleId)>,
    pre_permissions: HashMap<(TenantId, PermissionId, PermissionId), bool>,
}

fn keyword_matches(keyword: Option<&str>, name: &str, alias: &str) -> bool {
    match keyword {
        None => true,
        Some(keyword) => name.contains(keyword) || alias.contains(keyword),
    }
}

fn missing_row(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} row missing").into())
}

impl State {
    fn role_name(&self, id: RoleId) -> String {
        self.roles
            .get(&id)
            .map(|role| role.name.clone())
            .unwrap_or_default()
    }

    fn permission_name(&self, id: PermissionId) -> String {
        self.permissions
            .get(&id)
            .map(|permission| permission.name.clone())
            .unwrap_or_default()
    }

    fn max_right(&self, ctx: &TenantId) -> Option<i64> {
        self.roles
            .values()
            .filter(|role| &role.ctx == ctx)
            .map(|role| role.right_value)
            .max()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.inner.read().expect("poisoned lock")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.inner.write().expect("poisoned lock")
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_group(&self, ctx: &TenantId, group: NewGroup) -> StoreResult<GroupRecord> {
        let mut state = self.write();
        state.next_group_id += 1;
        let now = Utc::now();
        let record = GroupRecord {
            id: GroupId::new(state.next_group_id),
            ctx: ctx.clone(),
            kind: group.kind,
            name: group.name,
            alias_name: group.alias_name,
            status: group.status,
            created_on: now,
            updated_on: now,
        };
        state.groups.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_group(&self, ctx: &TenantId, id: GroupId) -> StoreResult<Option<GroupRecord>> {
        let state = self.read();
        Ok(state
            .groups
            .get(&id)
            .filter(|group| &group.ctx == ctx)
            .cloned())
    }

    async fn find_group_by_name(
        &self,
        ctx: &TenantId,
        kind: GroupKind,
        name: &str,
    ) -> StoreResult<Option<GroupRecord>> {
        let state = self.read();
        Ok(state
            .groups
            .values()
            .find(|group| &group.ctx == ctx && group.kind == kind && group.name == name)
            .cloned())
    }

    async fn list_groups(
        &self,
        ctx: &TenantId,
        filter: &GroupFilter,
    ) -> StoreResult<Vec<GroupRecord>> {
        let state = self.read();
        let mut groups: Vec<GroupRecord> = state
            .groups
            .values()
            .filter(|group| &group.ctx == ctx)
            .filter(|group| filter.kind.is_none_or(|kind| group.kind == kind))
            .filter(|group| filter.status.is_none_or(|status| group.status == status))
            .filter(|group| {
                keyword_matches(filter.keyword.as_deref(), &group.name, &group.alias_name)
            })
            .cloned()
            .collect();
        groups.sort_by_key(|group| group.id);
        Ok(groups)
    }

    async fn save_group(&self, group: &GroupRecord) -> StoreResult<()> {
        let mut state = self.write();
        let row = state
            .groups
            .get_mut(&group.id)
            .filter(|row| row.ctx == group.ctx)
            .ok_or_else(|| missing_row("group"))?;
        row.name = group.name.clone();
        row.alias_name = group.alias_name.clone();
        row.status = group.status;
        row.updated_on = Utc::now();
        Ok(())
    }

    async fn delete_group(&self, ctx: &TenantId, id: GroupId) -> StoreResult<()> {
        let mut state = self.write();
        if state
            .groups
            .get(&id)
            .is_some_and(|group| &group.ctx == ctx)
        {
            state.groups.remove(&id);
        }
        Ok(())
    }

    async fn group_member_count(
        &self,
        ctx: &TenantId,
        id: GroupId,
        kind: GroupKind,
    ) -> StoreResult<u64> {
        let state = self.read();
        let count = match kind {
            GroupKind::Permission => state
                .permissions
                .values()
                .filter(|permission| &permission.ctx == ctx && permission.group_id == id)
                .count(),
            GroupKind::Role => state
                .roles
                .values()
                .filter(|role| &role.ctx == ctx && role.group_id == Some(id))
                .count(),
        };
        Ok(count as u64)
    }

    async fn insert_permission(
        &self,
        ctx: &TenantId,
        permission: NewPermission,
    ) -> StoreResult<PermissionRecord> {
        let mut state = self.write();
        state.next_permission_id += 1;
        let now = Utc::now();
        let record = PermissionRecord {
            id: PermissionId::new(state.next_permission_id),
            ctx: ctx.clone(),
            group_id: permission.group,
            name: permission.name,
            alias_name: permission.alias_name,
            identifier: permission.identifier,
            description: permission.description,
            status: permission.status,
            created_on: now,
            updated_on: now,
        };
        state.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_permission(
        &self,
        ctx: &TenantId,
        id: PermissionId,
    ) -> StoreResult<Option<PermissionRecord>> {
        let state = self.read();
        Ok(state
            .permissions
            .get(&id)
            .filter(|permission| &permission.ctx == ctx)
            .cloned())
    }

    async fn find_permission_by_name(
        &self,
        ctx: &TenantId,
        name: &str,
    ) -> StoreResult<Option<PermissionRecord>> {
        let state = self.read();
        Ok(state
            .permissions
            .values()
            .find(|permission| &permission.ctx == ctx && permission.name == name)
            .cloned())
    }

    async fn find_permission_by_identifier(
        &self,
        ctx: &TenantId,
        identifier: &str,
    ) -> StoreResult<Option<PermissionRecord>> {
        let state = self.read();
        Ok(state
            .permissions
            .values()
            .find(|permission| {
                &permission.ctx == ctx && permission.identifier.as_deref() == Some(identifier)
            })
            .cloned())
    }

    async fn list_permissions(
        &self,
        ctx: &TenantId,
        filter: &PermissionFilter,
    ) -> StoreResult<Vec<PermissionRecord>> {
        let state = self.read();
        let mut permissions: Vec<PermissionRecord> = state
            .permissions
            .values()
            .filter(|permission| &permission.ctx == ctx)
            .filter(|permission| filter.group.is_none_or(|group| permission.group_id == group))
            .filter(|permission| {
                filter
                    .status
                    .is_none_or(|status| permission.status == status)
            })
            .filter(|permission| {
                keyword_matches(
                    filter.keyword.as_deref(),
                    &permission.name,
                    &permission.alias_name,
                )
            })
            .cloned()
            .collect();
        permissions.sort_by_key(|permission| permission.id);
        Ok(permissions)
    }

    async fn save_permission(&self, permission: &PermissionRecord) -> StoreResult<()> {
        let mut state = self.write();
        let row = state
            .permissions
            .get_mut(&permission.id)
            .filter(|row| row.ctx == permission.ctx)
            .ok_or_else(|| missing_row("permission"))?;
        row.group_id = permission.group_id;
        row.name = permission.name.clone();
        row.alias_name = permission.alias_name.clone();
        row.identifier = permission.identifier.clone();
        row.description = permission.description.clone();
        row.status = permission.status;
        row.updated_on = Utc::now();
        Ok(())
    }

    async fn fetch_permissions(
        &self,
        ctx: &TenantId,
        ids: &[PermissionId],
    ) -> StoreResult<Vec<PermissionRecord>> {
        let state = self.read();
        let unique: HashSet<PermissionId> = ids.iter().copied().collect();
        let mut permissions: Vec<PermissionRecord> = unique
            .into_iter()
            .filter_map(|id| state.permissions.get(&id))
            .filter(|permission| &permission.ctx == ctx)
            .cloned()
            .collect();
        permissions.sort_by_key(|permission| permission.id);
        Ok(permissions)
    }
}

#[async_trait]
impl RoleTreeStore for MemoryStore {
    async fn apply_tree_edit(&self, ctx: &TenantId, edit: TreeEdit) -> StoreResult<RoleRecord> {
        let mut state = self.write();

        match &edit.anchor {
            TreeAnchor::Root { expected_max_right } => {
                if state.max_right(ctx) != *expected_max_right {
                    return Err(StoreError::EditConflict);
                }
            }
            TreeAnchor::Child {
                parent,
                expected_right,
            } => {
                let current = state
                    .roles
                    .get(parent)
                    .filter(|role| &role.ctx == ctx)
                    .map(|role| role.right_value);
                if current != Some(*expected_right) {
                    return Err(StoreError::EditConflict);
                }
            }
        }

        if let Some(shift) = edit.shift {
            for role in state.roles.values_mut().filter(|role| &role.ctx == ctx) {
                if role.left_value > shift.left_gt {
                    role.left_value += shift.delta;
                }
                if role.right_value >= shift.right_ge {
                    role.right_value += shift.delta;
                }
            }
        }

        state.next_role_id += 1;
        let now = Utc::now();
        let seed = edit.insert;
        let record = RoleRecord {
            id: RoleId::new(state.next_role_id),
            ctx: ctx.clone(),
            group_id: seed.group_id,
            name: seed.name,
            alias_name: seed.alias_name,
            description: seed.description,
            status: seed.status,
            parent_id: seed.parent_id,
            left_value: seed.left_value,
            right_value: seed.right_value,
            depth: seed.depth,
            created_on: now,
            updated_on: now,
        };
        state.roles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_role(&self, ctx: &TenantId, id: RoleId) -> StoreResult<Option<RoleRecord>> {
        let state = self.read();
        Ok(state
            .roles
            .get(&id)
            .filter(|role| &role.ctx == ctx)
            .cloned())
    }

    async fn find_role_by_name(
        &self,
        ctx: &TenantId,
        name: &str,
    ) -> StoreResult<Option<RoleRecord>> {
        let state = self.read();
        Ok(state
            .roles
            .values()
            .find(|role| &role.ctx == ctx && role.name == name)
            .cloned())
    }

    async fn list_roles(
        &self,
        ctx: &TenantId,
        filter: &RoleFilter,
    ) -> StoreResult<Vec<RoleRecord>> {
        let state = self.read();
        let mut roles: Vec<RoleRecord> = state
            .roles
            .values()
            .filter(|role| &role.ctx == ctx)
            .filter(|role| filter.parent.is_none_or(|parent| role.parent_id == Some(parent)))
            .filter(|role| filter.status.is_none_or(|status| role.status == status))
            .filter(|role| keyword_matches(filter.keyword.as_deref(), &role.name, &role.alias_name))
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.left_value);
        Ok(roles)
    }

    async fn save_role(&self, role: &RoleRecord) -> StoreResult<()> {
        let mut state = self.write();
        let row = state
            .roles
            .get_mut(&role.id)
            .filter(|row| row.ctx == role.ctx)
            .ok_or_else(|| missing_row("role"))?;
        // Non-structural fields only; coordinates stay as stored.
        row.group_id = role.group_id;
        row.name = role.name.clone();
        row.alias_name = role.alias_name.clone();
        row.description = role.description.clone();
        row.status = role.status;
        row.updated_on = Utc::now();
        Ok(())
    }

    async fn fetch_roles(&self, ctx: &TenantId, ids: &[RoleId]) -> StoreResult<Vec<RoleRecord>> {
        let state = self.read();
        let unique: HashSet<RoleId> = ids.iter().copied().collect();
        let mut roles: Vec<RoleRecord> = unique
            .into_iter()
            .filter_map(|id| state.roles.get(&id))
            .filter(|role| &role.ctx == ctx)
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.left_value);
        Ok(roles)
    }

    async fn max_right(&self, ctx: &TenantId) -> StoreResult<Option<i64>> {
        let state = self.read();
        Ok(state.max_right(ctx))
    }

    async fn ancestors_of(
        &self,
        ctx: &TenantId,
        left: i64,
        right: i64,
        strict: bool,
    ) -> StoreResult<Vec<RoleRecord>> {
        let state = self.read();
        let mut roles: Vec<RoleRecord> = state
            .roles
            .values()
            .filter(|role| &role.ctx == ctx)
            .filter(|role| {
                if strict {
                    role.left_value < left && role.right_value > right
                } else {
                    role.left_value <= left && role.right_value >= right
                }
            })
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.left_value);
        Ok(roles)
    }

    async fn descendants_of(
        &self,
        ctx: &TenantId,
        left: i64,
        right: i64,
        strict: bool,
    ) -> StoreResult<Vec<RoleRecord>> {
        let state = self.read();
        let mut roles: Vec<RoleRecord> = state
            .roles
            .values()
            .filter(|role| &role.ctx == ctx)
            .filter(|role| {
                if strict {
                    role.left_value > left && role.right_value < right
                } else {
                    role.left_value >= left && role.right_value <= right
                }
            })
            .cloned()
            .collect();
        roles.sort_by_key(|role| role.left_value);
        Ok(roles)
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn attach_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for permission in permissions {
            state
                .role_permissions
                .insert((ctx.clone(), role, *permission));
        }
        Ok(())
    }

    async fn detach_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for permission in permissions {
            state
                .role_permissions
                .remove(&(ctx.clone(), role, *permission));
        }
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        state
            .role_permissions
            .retain(|(row_ctx, row_role, _)| !(row_ctx == ctx && *row_role == role));
        for permission in permissions {
            state
                .role_permissions
                .insert((ctx.clone(), role, *permission));
        }
        Ok(())
    }

    async fn role_permission_ids(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> StoreResult<Vec<PermissionId>> {
        let state = self.read();
        let mut ids: Vec<PermissionId> = state
            .role_permissions
            .iter()
            .filter(|(row_ctx, row_role, _)| row_ctx == ctx && *row_role == role)
            .map(|(_, _, permission)| *permission)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn insert_grants(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for role in roles {
            state.grants.insert((ctx.clone(), *role, target.clone()));
        }
        Ok(())
    }

    async fn delete_grants(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for role in roles {
            state.grants.remove(&(ctx.clone(), *role, target.clone()));
        }
        Ok(())
    }

    async fn delete_all_grants(&self, ctx: &TenantId, target: &TargetId) -> StoreResult<()> {
        let mut state = self.write();
        state
            .grants
            .retain(|(row_ctx, _, row_target)| !(row_ctx == ctx && row_target == target));
        Ok(())
    }

    async fn replace_target_roles(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> StoreResult<()> {
        let mut state = self.write();
        state
            .grants
            .retain(|(row_ctx, _, row_target)| !(row_ctx == ctx && row_target == target));
        for role in roles {
            state.grants.insert((ctx.clone(), *role, target.clone()));
        }
        Ok(())
    }

    async fn target_role_ids(
        &self,
        ctx: &TenantId,
        target: &TargetId,
    ) -> StoreResult<Vec<RoleId>> {
        let state = self.read();
        let mut ids: Vec<RoleId> = state
            .grants
            .iter()
            .filter(|(row_ctx, _, row_target)| row_ctx == ctx && row_target == target)
            .map(|(_, role, _)| *role)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ConstraintStore for MemoryStore {
    async fn insert_role_mutexes(
        &self,
        ctx: &TenantId,
        pairs: &[(RoleId, RoleId)],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (a, b) in pairs {
            state.role_mutexes.insert((ctx.clone(), *a, *b));
        }
        Ok(())
    }

    async fn delete_role_mutexes(
        &self,
        ctx: &TenantId,
        pairs: &[(RoleId, RoleId)],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (a, b) in pairs {
            state.role_mutexes.remove(&(ctx.clone(), *a, *b));
        }
        Ok(())
    }

    async fn clear_role_mutexes(&self, ctx: &TenantId, role: RoleId) -> StoreResult<()> {
        let mut state = self.write();
        state
            .role_mutexes
            .retain(|(row_ctx, a, b)| !(row_ctx == ctx && (*a == role || *b == role)));
        Ok(())
    }

    async fn role_mutex_exists(&self, ctx: &TenantId, a: RoleId, b: RoleId) -> StoreResult<bool> {
        let state = self.read();
        Ok(state.role_mutexes.contains(&(ctx.clone(), a, b)))
    }

    async fn list_role_mutexes(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> StoreResult<Vec<RoleMutexEdge>> {
        let state = self.read();
        let mut edges: Vec<RoleMutexEdge> = state
            .role_mutexes
            .iter()
            .filter(|(row_ctx, a, _)| row_ctx == ctx && *a == role)
            .map(|(_, a, b)| RoleMutexEdge {
                role_id: *a,
                role_name: state.role_name(*a),
                mutex_role_id: *b,
                mutex_role_name: state.role_name(*b),
            })
            .collect();
        edges.sort_by_key(|edge| edge.mutex_role_id);
        Ok(edges)
    }

    async fn insert_pre_roles(
        &self,
        ctx: &TenantId,
        edges: &[(RoleId, RoleId)],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (role, pre) in edges {
            state.pre_roles.insert((ctx.clone(), *role, *pre));
        }
        Ok(())
    }

    async fn delete_pre_roles(
        &self,
        ctx: &TenantId,
        edges: &[(RoleId, RoleId)],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (role, pre) in edges {
            state.pre_roles.remove(&(ctx.clone(), *role, *pre));
        }
        Ok(())
    }

    async fn clear_pre_roles(&self, ctx: &TenantId, role: RoleId) -> StoreResult<()> {
        let mut state = self.write();
        state
            .pre_roles
            .retain(|(row_ctx, row_role, _)| !(row_ctx == ctx && *row_role == role));
        Ok(())
    }

    async fn list_pre_roles(&self, ctx: &TenantId, role: RoleId) -> StoreResult<Vec<PreRoleEdge>> {
        let state = self.read();
        let mut edges: Vec<PreRoleEdge> = state
            .pre_roles
            .iter()
            .filter(|(row_ctx, row_role, _)| row_ctx == ctx && *row_role == role)
            .map(|(_, row_role, pre)| PreRoleEdge {
                role_id: *row_role,
                role_name: state.role_name(*row_role),
                pre_role_id: *pre,
                pre_role_name: state.role_name(*pre),
            })
            .collect();
        edges.sort_by_key(|edge| edge.pre_role_id);
        Ok(edges)
    }

    async fn insert_pre_permissions(
        &self,
        ctx: &TenantId,
        edges: &[(PermissionId, PermissionId)],
        auto_grant: bool,
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (permission, pre) in edges {
            state
                .pre_permissions
                .entry((ctx.clone(), *permission, *pre))
                .or_insert(auto_grant);
        }
        Ok(())
    }

    async fn delete_pre_permissions(
        &self,
        ctx: &TenantId,
        edges: &[(PermissionId, PermissionId)],
    ) -> StoreResult<()> {
        let mut state = self.write();
        for (permission, pre) in edges {
            state
                .pre_permissions
                .remove(&(ctx.clone(), *permission, *pre));
        }
        Ok(())
    }

    async fn clear_pre_permissions(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> StoreResult<()> {
        let mut state = self.write();
        state
            .pre_permissions
            .retain(|(row_ctx, row_permission, _), _| {
                !(row_ctx == ctx && *row_permission == permission)
            });
        Ok(())
    }

    async fn list_pre_permissions(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> StoreResult<Vec<PrePermissionEdge>> {
        let state = self.read();
        let mut edges: Vec<PrePermissionEdge> = state
            .pre_permissions
            .iter()
            .filter(|((row_ctx, row_permission, _), _)| {
                row_ctx == ctx && *row_permission == permission
            })
            .map(|((_, row_permission, pre), auto_grant)| PrePermissionEdge {
                permission_id: *row_permission,
                permission_name: state.permission_name(*row_permission),
                pre_permission_id: *pre,
                pre_permission_name: state.permission_name(*pre),
                auto_grant: *auto_grant,
            })
            .collect();
        edges.sort_by_key(|edge| edge.pre_permission_id);
        Ok(edges)
    }
}
