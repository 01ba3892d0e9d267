//! Multi-tenant hierarchical RBAC engine.
//!
//! This crate stores permissions, roles, and groupings per tenant, keeps the
//! role hierarchy as a nested-set tree, records grants to external targets,
//! tracks mutual-exclusion and prerequisite constraints, and answers
//! authorization queries. It is a library for host applications: storage is
//! pluggable through the async [`Store`] port, and the hot check path can be
//! fronted by a [`Cache`].
//!
//! # Examples
//!
//! End-to-end flow with the bundled in-memory store (feature `memory-store`,
//! on by default):
//! ```no_run
//! use nested_rbac::{
//!     GroupKind, NewGroup, NewPermission, NewRole, RbacBuilder, Status, TargetId, TenantId,
//! };
//! # #[cfg(feature = "memory-store")]
//! # {
//! use nested_rbac::MemoryStore;
//! # async fn run() -> nested_rbac::Result<()> {
//! let rbac = RbacBuilder::new(MemoryStore::new()).build();
//! let ctx = TenantId::try_from("tenant_1")?;
//! let target = TargetId::try_from("user_1")?;
//!
//! let group = rbac
//!     .create_group(
//!         &ctx,
//!         NewGroup {
//!             kind: GroupKind::Permission,
//!             name: "billing".to_string(),
//!             alias_name: String::new(),
//!             status: Status::Enabled,
//!         },
//!     )
//!     .await?;
//! let read = rbac
//!     .create_permission(
//!         &ctx,
//!         NewPermission {
//!             group: group.id,
//!             name: "invoice-read".to_string(),
//!             alias_name: String::new(),
//!             identifier: None,
//!             description: String::new(),
//!             status: Status::Enabled,
//!         },
//!     )
//!     .await?;
//! let admin = rbac
//!     .add_role(
//!         &ctx,
//!         NewRole {
//!             parent: None,
//!             group: None,
//!             name: "admin".to_string(),
//!             alias_name: String::new(),
//!             description: String::new(),
//!             status: Status::Enabled,
//!         },
//!     )
//!     .await?;
//!
//! rbac.grant_permission(&ctx, admin.id, &[read.id]).await?;
//! rbac.grant_role(&ctx, &target, &[admin.id]).await?;
//! assert!(rbac.check(&ctx, &target, "invoice-read").await?);
//! # Ok(())
//! # }
//! # }
//! ```
#![forbid(unsafe_code)]

mod cache;
mod catalog;
mod check;
mod constraint;
mod engine;
mod error;
mod grant;
mod hierarchy;
mod record;
mod store;
mod types;

#[cfg(feature = "memory-cache")]
mod memory_cache;

#[cfg(feature = "memory-store")]
mod memory_store;

pub use crate::cache::{Cache, NoCache};
pub use crate::engine::{Rbac, RbacBuilder};
pub use crate::error::{Error, Result, StoreError};
pub use crate::record::{
    GrantedRole, GroupChanges, GroupKind, GroupRecord, NewGroup, NewPermission, NewRole,
    PermissionChanges, PermissionRecord, PreRoleEdge, PrePermissionEdge, RoleChanges,
    RoleMutexEdge, RoleRecord, Status,
};
pub use crate::store::{
    CatalogStore, ConstraintStore, GrantStore, GroupFilter, PermissionFilter, RangeShift,
    RoleFilter, RoleSeed, RoleTreeStore, Store, StoreResult, TreeAnchor, TreeEdit,
};
pub use crate::types::{GroupId, PermissionId, RoleId, TargetId, TenantId};

#[cfg(feature = "memory-store")]
pub use crate::memory_store::MemoryStore;

#[cfg(feature = "memory-cache")]
pub use crate::memory_cache::MemoryCache;
