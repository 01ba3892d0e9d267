//! Nested-set role hierarchy maintenance and range queries.
//!
//! Each tenant's roles form one forest encoded with the nested-set model:
//! a role's `(left_value, right_value)` span strictly contains the spans of
//! all its descendants and is disjoint from everything else. Ancestor and
//! descendant queries are interval comparisons; no recursion anywhere.

use crate::cache::Cache;
use crate::engine::Rbac;
use crate::error::{Error, Result, tree_edit_error};
use crate::record::{GroupKind, NewRole, RoleChanges, RoleRecord, Status};
use crate::store::{RangeShift, RoleFilter, RoleSeed, Store, TreeAnchor, TreeEdit};
use crate::types::{RoleId, TenantId};
use tracing::debug;

/// Width of a leaf span: a freshly inserted role occupies `(left, left + 1)`.
const LEAF_SPAN: i64 = 2;

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Inserts a role into the tenant's tree.
    ///
    /// Without a parent the role becomes a new root appended after the
    /// tenant's current maximum `right_value`. With a parent it becomes the
    /// parent's last child: every span at or after the parent's right
    /// boundary is shifted right by two, then the role is inserted into the
    /// opened gap. The shift and the insert are one atomic store operation;
    /// a concurrent edit of the same tenant surfaces as [`Error::Conflict`]
    /// and leaves the tree untouched.
    pub async fn add_role(&self, ctx: &TenantId, role: NewRole) -> Result<RoleRecord> {
        if role.name.trim().is_empty() {
            return Err(Error::InvalidId("role name must not be empty".to_string()));
        }
        if self
            .store
            .find_role_by_name(ctx, &role.name)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::RoleNameExists {
                ctx: ctx.clone(),
                name: role.name,
            });
        }
        if let Some(group_id) = role.group {
            let group = self.get_group(ctx, group_id).await?;
            if group.kind != GroupKind::Role {
                return Err(Error::GroupNotExist {
                    ctx: ctx.clone(),
                    id: group_id,
                });
            }
        }

        let edit = match role.parent {
            None => {
                let max_right = self.store.max_right(ctx).await.map_err(Error::from)?;
                let left = max_right.unwrap_or(0) + 1;
                TreeEdit {
                    anchor: TreeAnchor::Root {
                        expected_max_right: max_right,
                    },
                    shift: None,
                    insert: RoleSeed {
                        group_id: role.group,
                        name: role.name,
                        alias_name: role.alias_name,
                        description: role.description,
                        status: role.status,
                        parent_id: None,
                        left_value: left,
                        right_value: left + 1,
                        depth: 1,
                    },
                }
            }
            Some(parent_id) => {
                let parent = self.require_role(ctx, parent_id).await?;
                TreeEdit {
                    anchor: TreeAnchor::Child {
                        parent: parent_id,
                        expected_right: parent.right_value,
                    },
                    shift: Some(RangeShift {
                        left_gt: parent.right_value,
                        right_ge: parent.right_value,
                        delta: LEAF_SPAN,
                    }),
                    insert: RoleSeed {
                        group_id: role.group,
                        name: role.name,
                        alias_name: role.alias_name,
                        description: role.description,
                        status: role.status,
                        parent_id: Some(parent_id),
                        left_value: parent.right_value,
                        right_value: parent.right_value + 1,
                        depth: parent.depth + 1,
                    },
                }
            }
        };

        let record = self
            .store
            .apply_tree_edit(ctx, edit)
            .await
            .map_err(|error| tree_edit_error(ctx, error))?;
        debug!(
            ctx = %ctx,
            role = %record.id,
            name = %record.name,
            left = record.left_value,
            right = record.right_value,
            depth = record.depth,
            "role inserted"
        );
        Ok(record)
    }

    /// Loads a role or fails with [`Error::RoleNotExist`].
    pub async fn get_role(&self, ctx: &TenantId, id: RoleId) -> Result<RoleRecord> {
        self.require_role(ctx, id).await
    }

    /// Loads a role by name or fails with [`Error::RoleNotExist`].
    pub async fn get_role_by_name(&self, ctx: &TenantId, name: &str) -> Result<RoleRecord> {
        self.store
            .find_role_by_name(ctx, name)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::role_not_exist(ctx))
    }

    /// Lists roles matching the filter. `filter.parent` restricts to direct
    /// children; `filter.keyword` is a substring match on name or alias.
    pub async fn get_roles(&self, ctx: &TenantId, filter: &RoleFilter) -> Result<Vec<RoleRecord>> {
        self.store
            .list_roles(ctx, filter)
            .await
            .map_err(Error::from)
    }

    /// Returns the role's ancestors, root first. With `include_self` the role
    /// itself closes the list.
    pub async fn ancestors_of(
        &self,
        ctx: &TenantId,
        role: RoleId,
        include_self: bool,
    ) -> Result<Vec<RoleRecord>> {
        let role = self.require_role(ctx, role).await?;
        self.store
            .ancestors_of(ctx, role.left_value, role.right_value, !include_self)
            .await
            .map_err(Error::from)
    }

    /// Returns the role's descendants in depth-first (left) order. With
    /// `include_self` the role itself opens the list.
    pub async fn descendants_of(
        &self,
        ctx: &TenantId,
        role: RoleId,
        include_self: bool,
    ) -> Result<Vec<RoleRecord>> {
        let role = self.require_role(ctx, role).await?;
        self.store
            .descendants_of(ctx, role.left_value, role.right_value, !include_self)
            .await
            .map_err(Error::from)
    }

    /// Updates a role's non-structural fields. The tree shape (parent, span,
    /// depth) never changes here.
    pub async fn update_role(
        &self,
        ctx: &TenantId,
        id: RoleId,
        changes: RoleChanges,
    ) -> Result<RoleRecord> {
        let mut role = self.require_role(ctx, id).await?;
        if let Some(group) = changes.group {
            if let Some(group_id) = group {
                let record = self.get_group(ctx, group_id).await?;
                if record.kind != GroupKind::Role {
                    return Err(Error::GroupNotExist {
                        ctx: ctx.clone(),
                        id: group_id,
                    });
                }
            }
            role.group_id = group;
        }
        if let Some(name) = changes.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidId("role name must not be empty".to_string()));
            }
            if name != role.name
                && self
                    .store
                    .find_role_by_name(ctx, &name)
                    .await
                    .map_err(Error::from)?
                    .is_some()
            {
                return Err(Error::RoleNameExists {
                    ctx: ctx.clone(),
                    name,
                });
            }
            role.name = name;
        }
        if let Some(alias_name) = changes.alias_name {
            role.alias_name = alias_name;
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        self.store.save_role(&role).await.map_err(Error::from)?;
        Ok(role)
    }

    /// Toggles a role's status and purges cached answers for the tenant,
    /// since a disabled role stops contributing to checks immediately.
    pub async fn update_role_status(
        &self,
        ctx: &TenantId,
        id: RoleId,
        status: Status,
    ) -> Result<()> {
        let mut role = self.require_role(ctx, id).await?;
        if role.status == status {
            return Ok(());
        }
        role.status = status;
        self.store.save_role(&role).await.map_err(Error::from)?;
        self.cache.invalidate_tenant(ctx).await;
        debug!(ctx = %ctx, role = %id, ?status, "role status updated");
        Ok(())
    }
}
