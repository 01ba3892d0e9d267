//! Mutual-exclusion and prerequisite constraint bookkeeping.
//!
//! Constraints are recorded and reported; they do not gate the grant
//! operations themselves. Callers consult [`Rbac::check_role_mutex`] and the
//! listing operations before granting. The one exception is the `auto_grant`
//! flag on permission prerequisites, which [`Rbac::grant_permission`] honors.

use crate::cache::Cache;
use crate::engine::Rbac;
use crate::error::{Error, Result};
use crate::record::{PreRoleEdge, PrePermissionEdge, RoleMutexEdge};
use crate::store::Store;
use crate::types::{PermissionId, RoleId, TenantId};
use tracing::debug;

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Declares `role` mutually exclusive with each of `mutex_roles`.
    ///
    /// Edges are stored in symmetric pairs; duplicates and self-pairs are
    /// skipped, and unknown roles are ignored.
    pub async fn add_role_mutex(
        &self,
        ctx: &TenantId,
        role: RoleId,
        mutex_roles: &[RoleId],
    ) -> Result<()> {
        self.require_role(ctx, role).await?;
        let others = self.existing_role_ids(ctx, mutex_roles).await?;
        let pairs = symmetric_pairs(role, &others);
        if pairs.is_empty() {
            return Ok(());
        }
        self.store
            .insert_role_mutexes(ctx, &pairs)
            .await
            .map_err(Error::from)?;
        debug!(ctx = %ctx, role = %role, edges = pairs.len(), "role mutex edges added");
        Ok(())
    }

    /// Removes the mutex relation between `role` and each of `mutex_roles`,
    /// in both directions.
    pub async fn remove_role_mutex(
        &self,
        ctx: &TenantId,
        role: RoleId,
        mutex_roles: &[RoleId],
    ) -> Result<()> {
        let pairs = symmetric_pairs(role, mutex_roles);
        if pairs.is_empty() {
            return Ok(());
        }
        self.store
            .delete_role_mutexes(ctx, &pairs)
            .await
            .map_err(Error::from)
    }

    /// Removes every mutex edge touching `role`, in both directions.
    pub async fn clean_role_mutex(&self, ctx: &TenantId, role: RoleId) -> Result<()> {
        self.store
            .clear_role_mutexes(ctx, role)
            .await
            .map_err(Error::from)
    }

    /// Returns whether a mutex edge exists between the two roles.
    pub async fn check_role_mutex(&self, ctx: &TenantId, a: RoleId, b: RoleId) -> Result<bool> {
        self.store
            .role_mutex_exists(ctx, a, b)
            .await
            .map_err(Error::from)
    }

    /// Lists the roles `role` is mutually exclusive with, with display names.
    pub async fn get_role_mutex_list(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> Result<Vec<RoleMutexEdge>> {
        self.store
            .list_role_mutexes(ctx, role)
            .await
            .map_err(Error::from)
    }

    /// Declares each of `pre_roles` a prerequisite of `role`.
    ///
    /// Edges are directed (`role` requires `pre_role`); duplicates and
    /// self-edges are skipped, and unknown roles are ignored.
    pub async fn add_pre_role(
        &self,
        ctx: &TenantId,
        role: RoleId,
        pre_roles: &[RoleId],
    ) -> Result<()> {
        self.require_role(ctx, role).await?;
        let pres = self.existing_role_ids(ctx, pre_roles).await?;
        let edges: Vec<(RoleId, RoleId)> = pres
            .into_iter()
            .filter(|pre| *pre != role)
            .map(|pre| (role, pre))
            .collect();
        if edges.is_empty() {
            return Ok(());
        }
        self.store
            .insert_pre_roles(ctx, &edges)
            .await
            .map_err(Error::from)?;
        debug!(ctx = %ctx, role = %role, edges = edges.len(), "pre-role edges added");
        Ok(())
    }

    /// Removes the prerequisite relation from `role` to each of `pre_roles`.
    pub async fn remove_pre_role(
        &self,
        ctx: &TenantId,
        role: RoleId,
        pre_roles: &[RoleId],
    ) -> Result<()> {
        let edges: Vec<(RoleId, RoleId)> =
            pre_roles.iter().map(|pre| (role, *pre)).collect();
        if edges.is_empty() {
            return Ok(());
        }
        self.store
            .delete_pre_roles(ctx, &edges)
            .await
            .map_err(Error::from)
    }

    /// Removes every prerequisite edge whose dependent side is `role`.
    pub async fn clean_pre_role(&self, ctx: &TenantId, role: RoleId) -> Result<()> {
        self.store
            .clear_pre_roles(ctx, role)
            .await
            .map_err(Error::from)
    }

    /// Lists the prerequisites of `role`, with display names.
    pub async fn get_pre_role_list(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> Result<Vec<PreRoleEdge>> {
        self.store
            .list_pre_roles(ctx, role)
            .await
            .map_err(Error::from)
    }

    /// Declares each of `pre_permissions` a prerequisite of `permission`,
    /// recording `auto_grant` on every new edge.
    ///
    /// Existing edges keep their recorded flag; duplicates and self-edges are
    /// skipped, and unknown permissions are ignored.
    pub async fn add_pre_permission(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
        pre_permissions: &[PermissionId],
        auto_grant: bool,
    ) -> Result<()> {
        self.get_permission(ctx, permission).await?;
        let pres = self.existing_permission_ids(ctx, pre_permissions).await?;
        let edges: Vec<(PermissionId, PermissionId)> = pres
            .into_iter()
            .filter(|pre| *pre != permission)
            .map(|pre| (permission, pre))
            .collect();
        if edges.is_empty() {
            return Ok(());
        }
        self.store
            .insert_pre_permissions(ctx, &edges, auto_grant)
            .await
            .map_err(Error::from)?;
        debug!(
            ctx = %ctx,
            permission = %permission,
            edges = edges.len(),
            auto_grant,
            "pre-permission edges added"
        );
        Ok(())
    }

    /// Removes the prerequisite relation from `permission` to each of
    /// `pre_permissions`.
    pub async fn remove_pre_permission(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
        pre_permissions: &[PermissionId],
    ) -> Result<()> {
        let edges: Vec<(PermissionId, PermissionId)> = pre_permissions
            .iter()
            .map(|pre| (permission, *pre))
            .collect();
        if edges.is_empty() {
            return Ok(());
        }
        self.store
            .delete_pre_permissions(ctx, &edges)
            .await
            .map_err(Error::from)
    }

    /// Removes every prerequisite edge whose dependent side is `permission`.
    pub async fn clean_pre_permission(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> Result<()> {
        self.store
            .clear_pre_permissions(ctx, permission)
            .await
            .map_err(Error::from)
    }

    /// Lists the prerequisites of `permission`, with display names and the
    /// recorded `auto_grant` flag.
    pub async fn get_pre_permission_list(
        &self,
        ctx: &TenantId,
        permission: PermissionId,
    ) -> Result<Vec<PrePermissionEdge>> {
        self.store
            .list_pre_permissions(ctx, permission)
            .await
            .map_err(Error::from)
    }

    async fn existing_role_ids(&self, ctx: &TenantId, ids: &[RoleId]) -> Result<Vec<RoleId>> {
        let records = self
            .store
            .fetch_roles(ctx, ids)
            .await
            .map_err(Error::from)?;
        Ok(records.into_iter().map(|role| role.id).collect())
    }

    async fn existing_permission_ids(
        &self,
        ctx: &TenantId,
        ids: &[PermissionId],
    ) -> Result<Vec<PermissionId>> {
        let records = self
            .store
            .fetch_permissions(ctx, ids)
            .await
            .map_err(Error::from)?;
        Ok(records.into_iter().map(|permission| permission.id).collect())
    }
}

fn symmetric_pairs(role: RoleId, others: &[RoleId]) -> Vec<(RoleId, RoleId)> {
    let mut pairs = Vec::with_capacity(others.len() * 2);
    for other in others {
        if *other == role {
            continue;
        }
        pairs.push((role, *other));
        pairs.push((*other, role));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::symmetric_pairs;
    use crate::types::RoleId;

    #[test]
    fn symmetric_pairs_skip_self() {
        let a = RoleId::new(1);
        let b = RoleId::new(2);
        let pairs = symmetric_pairs(a, &[a, b]);
        assert_eq!(pairs, vec![(a, b), (b, a)]);
    }
}
