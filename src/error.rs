use crate::types::{GroupId, TenantId};
use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a persistence-port implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A tree edit's anchor precondition no longer held when the store tried
    /// to apply it. The tree is unchanged; the caller may re-read and retry.
    #[error("concurrent hierarchy edit detected")]
    EditConflict,
    /// Any other backend failure (connectivity, transaction abort, ...).
    #[error("backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps an arbitrary backend error.
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }
}

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// A group with the same name already exists in the tenant.
    #[error("group {name:?} already exists in tenant {ctx}")]
    GroupExists { ctx: TenantId, name: String },
    /// Referenced group does not exist.
    #[error("group {id} does not exist in tenant {ctx}")]
    GroupNotExist { ctx: TenantId, id: GroupId },
    /// Removal of a group that still has members.
    #[error("group {id} in tenant {ctx} is not empty and cannot be removed")]
    RemoveGroupNotAllowed { ctx: TenantId, id: GroupId },
    /// A permission with the same name already exists in the tenant.
    #[error("permission {name:?} already exists in tenant {ctx}")]
    PermissionNameExists { ctx: TenantId, name: String },
    /// A permission with the same identifier already exists in the tenant.
    #[error("permission identifier {identifier:?} already exists in tenant {ctx}")]
    PermissionIdentifierExists { ctx: TenantId, identifier: String },
    /// A role with the same name already exists in the tenant.
    #[error("role {name:?} already exists in tenant {ctx}")]
    RoleNameExists { ctx: TenantId, name: String },
    /// Referenced role missing, or disabled where an enabled role is required.
    #[error("role does not exist in tenant {ctx}")]
    RoleNotExist { ctx: TenantId },
    /// Referenced permission does not exist.
    #[error("permission does not exist in tenant {ctx}")]
    PermissionNotExist { ctx: TenantId },
    /// Empty or invalid target identifier supplied to a grant operation.
    #[error("target identifier is empty or not allowed")]
    ObjectNotAllowed,
    /// Every candidate entity was filtered out (disabled or nonexistent).
    #[error("grant failed: no enabled candidates left in tenant {ctx}")]
    GrantFailed { ctx: TenantId },
    /// A concurrent edit won the race for the same tenant's role tree.
    #[error("conflicting hierarchy edit in tenant {ctx}; retry the operation")]
    Conflict { ctx: TenantId },
    /// Store error wrapper.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl Error {
    pub(crate) fn role_not_exist(ctx: &TenantId) -> Self {
        Self::RoleNotExist { ctx: ctx.clone() }
    }

    pub(crate) fn grant_failed(ctx: &TenantId) -> Self {
        Self::GrantFailed { ctx: ctx.clone() }
    }
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

/// Remaps [`StoreError::EditConflict`] to [`Error::Conflict`] so callers can
/// match the retryable case without digging into the store layer.
pub(crate) fn tree_edit_error(ctx: &TenantId, error: StoreError) -> Error {
    match error {
        StoreError::EditConflict => Error::Conflict { ctx: ctx.clone() },
        other => Error::Store(other),
    }
}
