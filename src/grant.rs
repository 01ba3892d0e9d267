//! Grant ledger: role→target grants and permission→role attachments.
//!
//! All inserts are insert-or-ignore, so grants are idempotent sets and
//! concurrent grants to the same key are safe without extra locking. The
//! `regrant_*` pair atomically replaces the whole set through the store's
//! replace primitive.

use crate::cache::Cache;
use crate::engine::Rbac;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{PermissionId, RoleId, TargetId, TenantId};
use std::collections::HashSet;
use tracing::debug;

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Attaches permissions to a role.
    ///
    /// The role must exist and be enabled. Requested permissions that are
    /// missing or disabled are dropped; if nothing survives the filter the
    /// call fails with [`Error::GrantFailed`] without writing. Prerequisite
    /// edges flagged `auto_grant` pull their prerequisites into the set.
    pub async fn grant_permission(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        self.require_enabled_role(ctx, role).await?;
        let selected = self.grantable_permissions(ctx, permissions).await?;
        self.store
            .attach_permissions(ctx, role, &selected)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_tenant(ctx).await;
        debug!(ctx = %ctx, role = %role, count = selected.len(), "permissions granted");
        Ok(())
    }

    /// Detaches permissions from a role. Missing rows are not an error.
    pub async fn revoke_permission(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        self.store
            .detach_permissions(ctx, role, permissions)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_tenant(ctx).await;
        debug!(ctx = %ctx, role = %role, count = permissions.len(), "permissions revoked");
        Ok(())
    }

    /// Atomically replaces the role's entire permission set with the filtered
    /// new set. A reader observes either the old set or the new set, never a
    /// mixture; a failed call leaves the old set intact.
    pub async fn regrant_permission(
        &self,
        ctx: &TenantId,
        role: RoleId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        self.require_enabled_role(ctx, role).await?;
        let selected = self.grantable_permissions(ctx, permissions).await?;
        self.store
            .replace_role_permissions(ctx, role, &selected)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_tenant(ctx).await;
        debug!(ctx = %ctx, role = %role, count = selected.len(), "permissions regranted");
        Ok(())
    }

    /// Grants roles to a target.
    ///
    /// The target must be non-empty and `roles` must name at least one role;
    /// requested roles that are missing or disabled are dropped, and an empty
    /// filtered set fails with [`Error::GrantFailed`] without writing.
    /// Granting an already-granted role is a no-op.
    pub async fn grant_role(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> Result<()> {
        let selected = self.grantable_roles(ctx, target, roles).await?;
        self.store
            .insert_grants(ctx, target, &selected)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_target(ctx, target).await;
        debug!(ctx = %ctx, target = %target, count = selected.len(), "roles granted");
        Ok(())
    }

    /// Revokes roles from a target. Missing rows are not an error.
    pub async fn revoke_role(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> Result<()> {
        self.store
            .delete_grants(ctx, target, roles)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_target(ctx, target).await;
        debug!(ctx = %ctx, target = %target, count = roles.len(), "roles revoked");
        Ok(())
    }

    /// Revokes every role held by a target.
    pub async fn revoke_all_role(&self, ctx: &TenantId, target: &TargetId) -> Result<()> {
        self.store
            .delete_all_grants(ctx, target)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_target(ctx, target).await;
        debug!(ctx = %ctx, target = %target, "all roles revoked");
        Ok(())
    }

    /// Atomically replaces the target's entire role set with the filtered new
    /// set, with the same all-or-nothing contract as
    /// [`Rbac::regrant_permission`].
    pub async fn regrant_role(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> Result<()> {
        let selected = self.grantable_roles(ctx, target, roles).await?;
        self.store
            .replace_target_roles(ctx, target, &selected)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_target(ctx, target).await;
        debug!(ctx = %ctx, target = %target, count = selected.len(), "roles regranted");
        Ok(())
    }

    /// Filters requested permissions to enabled existing ones and expands the
    /// transitive closure of `auto_grant` prerequisite edges. The
    /// [`Error::GrantFailed`] decision is made on the requested set alone.
    async fn grantable_permissions(
        &self,
        ctx: &TenantId,
        permissions: &[PermissionId],
    ) -> Result<Vec<PermissionId>> {
        let requested = self.enabled_permission_ids(ctx, permissions).await?;
        if requested.is_empty() {
            return Err(Error::grant_failed(ctx));
        }

        let mut selected: HashSet<PermissionId> = requested.iter().copied().collect();
        let mut queue: Vec<PermissionId> = requested;
        while let Some(permission) = queue.pop() {
            let edges = self
                .store
                .list_pre_permissions(ctx, permission)
                .await
                .map_err(Error::from)?;
            let candidates: Vec<PermissionId> = edges
                .into_iter()
                .filter(|edge| edge.auto_grant)
                .map(|edge| edge.pre_permission_id)
                .filter(|pre| !selected.contains(pre))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            for pre in self.enabled_permission_ids(ctx, &candidates).await? {
                if selected.insert(pre) {
                    queue.push(pre);
                }
            }
        }
        Ok(selected.into_iter().collect())
    }

    /// Validates grant-role inputs and filters to enabled existing roles.
    async fn grantable_roles(
        &self,
        ctx: &TenantId,
        target: &TargetId,
        roles: &[RoleId],
    ) -> Result<Vec<RoleId>> {
        if target.as_str().trim().is_empty() {
            return Err(Error::ObjectNotAllowed);
        }
        if roles.is_empty() {
            return Err(Error::role_not_exist(ctx));
        }
        let records = self
            .store
            .fetch_roles(ctx, roles)
            .await
            .map_err(Error::from)?;
        let selected: Vec<RoleId> = records
            .into_iter()
            .filter(|role| role.status.is_enabled())
            .map(|role| role.id)
            .collect();
        if selected.is_empty() {
            return Err(Error::grant_failed(ctx));
        }
        Ok(selected)
    }

    async fn enabled_permission_ids(
        &self,
        ctx: &TenantId,
        ids: &[PermissionId],
    ) -> Result<Vec<PermissionId>> {
        let records = self
            .store
            .fetch_permissions(ctx, ids)
            .await
            .map_err(Error::from)?;
        Ok(records
            .into_iter()
            .filter(|permission| permission.status.is_enabled())
            .map(|permission| permission.id)
            .collect())
    }
}
