//! Group and permission catalog operations.

use crate::cache::Cache;
use crate::engine::Rbac;
use crate::error::{Error, Result};
use crate::record::{
    GroupChanges, GroupKind, GroupRecord, NewGroup, NewPermission, PermissionChanges,
    PermissionRecord, Status,
};
use crate::store::{GroupFilter, PermissionFilter, Store};
use crate::types::{GroupId, PermissionId, RoleId, TenantId};
use tracing::debug;

fn require_display_name(name: &str, kind: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidId(format!("{kind} name must not be empty")));
    }
    Ok(())
}

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Creates a group. Names are unique per `(ctx, kind)`.
    pub async fn create_group(&self, ctx: &TenantId, group: NewGroup) -> Result<GroupRecord> {
        require_display_name(&group.name, "group")?;
        if self
            .store
            .find_group_by_name(ctx, group.kind, &group.name)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::GroupExists {
                ctx: ctx.clone(),
                name: group.name,
            });
        }
        let record = self
            .store
            .insert_group(ctx, group)
            .await
            .map_err(Error::from)?;
        debug!(ctx = %ctx, group = %record.id, name = %record.name, "group created");
        Ok(record)
    }

    /// Loads a group or fails with [`Error::GroupNotExist`].
    pub async fn get_group(&self, ctx: &TenantId, id: GroupId) -> Result<GroupRecord> {
        self.store
            .find_group(ctx, id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::GroupNotExist {
                ctx: ctx.clone(),
                id,
            })
    }

    /// Lists groups matching the filter.
    pub async fn get_groups(
        &self,
        ctx: &TenantId,
        filter: &GroupFilter,
    ) -> Result<Vec<GroupRecord>> {
        self.store
            .list_groups(ctx, filter)
            .await
            .map_err(Error::from)
    }

    /// Updates a group's name, alias, or status.
    pub async fn update_group(
        &self,
        ctx: &TenantId,
        id: GroupId,
        changes: GroupChanges,
    ) -> Result<GroupRecord> {
        let mut group = self.get_group(ctx, id).await?;
        if let Some(name) = changes.name {
            require_display_name(&name, "group")?;
            if name != group.name
                && self
                    .store
                    .find_group_by_name(ctx, group.kind, &name)
                    .await
                    .map_err(Error::from)?
                    .is_some()
            {
                return Err(Error::GroupExists {
                    ctx: ctx.clone(),
                    name,
                });
            }
            group.name = name;
        }
        if let Some(alias_name) = changes.alias_name {
            group.alias_name = alias_name;
        }
        if let Some(status) = changes.status {
            group.status = status;
        }
        self.store.save_group(&group).await.map_err(Error::from)?;
        Ok(group)
    }

    /// Removes a group. Fails with [`Error::RemoveGroupNotAllowed`] when any
    /// permission or role still references it.
    pub async fn remove_group(&self, ctx: &TenantId, id: GroupId) -> Result<()> {
        let group = self.get_group(ctx, id).await?;
        let members = self
            .store
            .group_member_count(ctx, id, group.kind)
            .await
            .map_err(Error::from)?;
        if members > 0 {
            return Err(Error::RemoveGroupNotAllowed {
                ctx: ctx.clone(),
                id,
            });
        }
        self.store
            .delete_group(ctx, id)
            .await
            .map_err(Error::from)?;
        debug!(ctx = %ctx, group = %id, "group removed");
        Ok(())
    }

    /// Creates a permission inside a permission group.
    ///
    /// Names are unique per `ctx`; the optional machine identifier is unique
    /// per `ctx` as well.
    pub async fn create_permission(
        &self,
        ctx: &TenantId,
        permission: NewPermission,
    ) -> Result<PermissionRecord> {
        require_display_name(&permission.name, "permission")?;
        let group = self.get_group(ctx, permission.group).await?;
        if group.kind != GroupKind::Permission {
            return Err(Error::GroupNotExist {
                ctx: ctx.clone(),
                id: permission.group,
            });
        }
        if self
            .store
            .find_permission_by_name(ctx, &permission.name)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::PermissionNameExists {
                ctx: ctx.clone(),
                name: permission.name,
            });
        }
        if let Some(identifier) = permission.identifier.as_deref()
            && self
                .store
                .find_permission_by_identifier(ctx, identifier)
                .await
                .map_err(Error::from)?
                .is_some()
        {
            return Err(Error::PermissionIdentifierExists {
                ctx: ctx.clone(),
                identifier: identifier.to_string(),
            });
        }
        let record = self
            .store
            .insert_permission(ctx, permission)
            .await
            .map_err(Error::from)?;
        debug!(ctx = %ctx, permission = %record.id, name = %record.name, "permission created");
        Ok(record)
    }

    /// Loads a permission or fails with [`Error::PermissionNotExist`].
    pub async fn get_permission(
        &self,
        ctx: &TenantId,
        id: PermissionId,
    ) -> Result<PermissionRecord> {
        self.store
            .find_permission(ctx, id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::PermissionNotExist { ctx: ctx.clone() })
    }

    /// Lists permissions matching the filter.
    pub async fn get_permissions(
        &self,
        ctx: &TenantId,
        filter: &PermissionFilter,
    ) -> Result<Vec<PermissionRecord>> {
        self.store
            .list_permissions(ctx, filter)
            .await
            .map_err(Error::from)
    }

    /// Updates a permission's non-status fields.
    pub async fn update_permission(
        &self,
        ctx: &TenantId,
        id: PermissionId,
        changes: PermissionChanges,
    ) -> Result<PermissionRecord> {
        let mut permission = self.get_permission(ctx, id).await?;
        if let Some(group_id) = changes.group {
            let group = self.get_group(ctx, group_id).await?;
            if group.kind != GroupKind::Permission {
                return Err(Error::GroupNotExist {
                    ctx: ctx.clone(),
                    id: group_id,
                });
            }
            permission.group_id = group_id;
        }
        if let Some(name) = changes.name {
            require_display_name(&name, "permission")?;
            if name != permission.name
                && self
                    .store
                    .find_permission_by_name(ctx, &name)
                    .await
                    .map_err(Error::from)?
                    .is_some()
            {
                return Err(Error::PermissionNameExists {
                    ctx: ctx.clone(),
                    name,
                });
            }
            permission.name = name;
        }
        if let Some(alias_name) = changes.alias_name {
            permission.alias_name = alias_name;
        }
        if let Some(identifier) = changes.identifier {
            if let Some(value) = identifier.as_deref()
                && permission.identifier.as_deref() != Some(value)
                && self
                    .store
                    .find_permission_by_identifier(ctx, value)
                    .await
                    .map_err(Error::from)?
                    .is_some()
            {
                return Err(Error::PermissionIdentifierExists {
                    ctx: ctx.clone(),
                    identifier: value.to_string(),
                });
            }
            permission.identifier = identifier;
        }
        if let Some(description) = changes.description {
            permission.description = description;
        }
        self.store
            .save_permission(&permission)
            .await
            .map_err(Error::from)?;
        Ok(permission)
    }

    /// Toggles a permission's status and purges cached answers for the
    /// tenant, since a disabled permission stops matching checks immediately.
    pub async fn update_permission_status(
        &self,
        ctx: &TenantId,
        id: PermissionId,
        status: Status,
    ) -> Result<()> {
        let mut permission = self.get_permission(ctx, id).await?;
        if permission.status == status {
            return Ok(());
        }
        permission.status = status;
        self.store
            .save_permission(&permission)
            .await
            .map_err(Error::from)?;
        self.cache.invalidate_tenant(ctx).await;
        debug!(ctx = %ctx, permission = %id, ?status, "permission status updated");
        Ok(())
    }

    /// Returns the permissions attached to a role, regardless of status.
    pub async fn permissions_of_role(
        &self,
        ctx: &TenantId,
        role: RoleId,
    ) -> Result<Vec<PermissionRecord>> {
        self.require_role(ctx, role).await?;
        let ids = self
            .store
            .role_permission_ids(ctx, role)
            .await
            .map_err(Error::from)?;
        self.store
            .fetch_permissions(ctx, &ids)
            .await
            .map_err(Error::from)
    }
}
