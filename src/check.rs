//! Read-only authorization checks.
//!
//! Checks are *direct*: only roles explicitly granted to the target count,
//! and only the permissions explicitly attached to those roles. The role
//! hierarchy is consulted solely by the accessibility operations, which ask
//! whether a role is already effectively held through an ancestor grant.
//!
//! Every operation returns `Result`; a storage failure is an `Err`, never a
//! silent `false`.

use crate::cache::Cache;
use crate::engine::Rbac;
use crate::error::{Error, Result};
use crate::record::{GrantedRole, RoleRecord};
use crate::store::{RoleFilter, Store};
use crate::types::{PermissionId, RoleId, TargetId, TenantId};
use std::collections::{HashMap, HashSet};

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Returns whether the target may exercise the named permission.
    ///
    /// True iff some enabled role granted to the target carries an enabled
    /// permission with this name. Unknown names evaluate to `false`.
    pub async fn check(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        permission_name: &str,
    ) -> Result<bool> {
        let names = self.effective_permission_names(ctx, target).await?;
        Ok(names.iter().any(|name| name == permission_name))
    }

    /// Batch form of [`Rbac::check`]: one entry per requested name, each
    /// evaluated against a single snapshot of the target's effective set.
    pub async fn check_list(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        permission_names: &[&str],
    ) -> Result<HashMap<String, bool>> {
        let names: HashSet<String> = self
            .effective_permission_names(ctx, target)
            .await?
            .into_iter()
            .collect();
        Ok(permission_names
            .iter()
            .map(|name| (name.to_string(), names.contains(*name)))
            .collect())
    }

    /// Returns whether the target directly holds the named enabled role.
    pub async fn check_role(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role_name: &str,
    ) -> Result<bool> {
        let Some(role) = self
            .store
            .find_role_by_name(ctx, role_name)
            .await
            .map_err(Error::from)?
        else {
            return Ok(false);
        };
        self.held_enabled(ctx, target, &role).await
    }

    /// Returns whether the target directly holds the enabled role with this
    /// id.
    pub async fn check_role_with_id(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role: RoleId,
    ) -> Result<bool> {
        let Some(role) = self
            .store
            .find_role(ctx, role)
            .await
            .map_err(Error::from)?
        else {
            return Ok(false);
        };
        self.held_enabled(ctx, target, &role).await
    }

    /// Returns whether the named role may still be granted to the target.
    ///
    /// A role is accessible iff no Grant row exists for the role itself nor
    /// for any strict ancestor. Grant-row presence alone counts; role status
    /// is not consulted. Unknown roles fail with [`Error::RoleNotExist`].
    pub async fn check_role_accessible(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role_name: &str,
    ) -> Result<bool> {
        let role = self.get_role_by_name(ctx, role_name).await?;
        self.accessible(ctx, target, &role).await
    }

    /// Id form of [`Rbac::check_role_accessible`].
    pub async fn check_role_accessible_with_id(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role: RoleId,
    ) -> Result<bool> {
        let role = self.require_role(ctx, role).await?;
        self.accessible(ctx, target, &role).await
    }

    /// Lists the tenant's roles with grant flags for the target.
    ///
    /// `granted` marks a direct grant; `can_access` marks a grant on the role
    /// itself or any strict ancestor, so rows with `can_access == false` are
    /// the ones that may still be granted. Without `with_children` only root
    /// roles are listed; with it the whole forest in depth-first order.
    pub async fn get_granted_roles(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        with_children: bool,
    ) -> Result<Vec<GrantedRole>> {
        let held = self.held_role_ids(ctx, target).await?;
        let mut roles = self
            .store
            .list_roles(ctx, &RoleFilter::default())
            .await
            .map_err(Error::from)?;
        roles.sort_by_key(|role| role.left_value);

        // One left-to-right sweep: the stack holds the enclosing spans of the
        // current role, so ancestor grants are known without extra queries.
        let mut stack: Vec<(i64, bool)> = Vec::new();
        let mut rows = Vec::new();
        for role in roles {
            while stack
                .last()
                .is_some_and(|(right, _)| *right < role.left_value)
            {
                stack.pop();
            }
            let granted = held.contains(&role.id);
            let ancestor_granted = stack.iter().any(|(_, granted)| *granted);
            stack.push((role.right_value, granted));
            if with_children || role.depth == 1 {
                rows.push(GrantedRole {
                    can_access: granted || ancestor_granted,
                    granted,
                    role,
                });
            }
        }
        Ok(rows)
    }

    /// Computes the target's effective permission names through the cache.
    async fn effective_permission_names(
        &self,
        ctx: &TenantId,
        target: &TargetId,
    ) -> Result<Vec<String>> {
        if let Some(names) = self.cache.get_permission_names(ctx, target).await {
            return Ok(names);
        }

        let role_ids = self
            .store
            .target_role_ids(ctx, target)
            .await
            .map_err(Error::from)?;
        let roles = self
            .store
            .fetch_roles(ctx, &role_ids)
            .await
            .map_err(Error::from)?;

        let mut permission_ids: HashSet<PermissionId> = HashSet::new();
        for role in roles.iter().filter(|role| role.status.is_enabled()) {
            let ids = self
                .store
                .role_permission_ids(ctx, role.id)
                .await
                .map_err(Error::from)?;
            permission_ids.extend(ids);
        }

        let ids: Vec<PermissionId> = permission_ids.into_iter().collect();
        let permissions = self
            .store
            .fetch_permissions(ctx, &ids)
            .await
            .map_err(Error::from)?;
        let names: Vec<String> = permissions
            .into_iter()
            .filter(|permission| permission.status.is_enabled())
            .map(|permission| permission.name)
            .collect();

        self.cache
            .set_permission_names(ctx, target, names.clone())
            .await;
        Ok(names)
    }

    async fn held_role_ids(&self, ctx: &TenantId, target: &TargetId) -> Result<HashSet<RoleId>> {
        let ids = self
            .store
            .target_role_ids(ctx, target)
            .await
            .map_err(Error::from)?;
        Ok(ids.into_iter().collect())
    }

    async fn held_enabled(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role: &RoleRecord,
    ) -> Result<bool> {
        if !role.status.is_enabled() {
            return Ok(false);
        }
        let held = self.held_role_ids(ctx, target).await?;
        Ok(held.contains(&role.id))
    }

    async fn accessible(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        role: &RoleRecord,
    ) -> Result<bool> {
        let held = self.held_role_ids(ctx, target).await?;
        if held.contains(&role.id) {
            return Ok(false);
        }
        let ancestors = self
            .store
            .ancestors_of(ctx, role.left_value, role.right_value, true)
            .await
            .map_err(Error::from)?;
        Ok(!ancestors.iter().any(|ancestor| held.contains(&ancestor.id)))
    }
}
