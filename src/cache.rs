use crate::types::{TargetId, TenantId};
use async_trait::async_trait;

/// Cache interface for a target's effective permission names.
///
/// The engine consults the cache on the hot check path and calls
/// [`Cache::invalidate_target`] (the invalidation hook keyed by
/// `(ctx, target)`) after every grant/revoke touching that target.
/// Mutations whose affected target set is unknown fall back to
/// [`Cache::invalidate_tenant`].
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets cached permission names for a (ctx, target) pair.
    async fn get_permission_names(
        &self,
        ctx: &TenantId,
        target: &TargetId,
    ) -> Option<Vec<String>>;

    /// Sets cached permission names for a (ctx, target) pair.
    async fn set_permission_names(&self, ctx: &TenantId, target: &TargetId, names: Vec<String>);

    /// Invalidates cached answers for a target.
    async fn invalidate_target(&self, ctx: &TenantId, target: &TargetId);

    /// Invalidates cached answers for a whole tenant.
    async fn invalidate_tenant(&self, ctx: &TenantId);
}

/// No-op cache implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get_permission_names(
        &self,
        _ctx: &TenantId,
        _target: &TargetId,
    ) -> Option<Vec<String>> {
        None
    }

    async fn set_permission_names(&self, _ctx: &TenantId, _target: &TargetId, _names: Vec<String>) {
    }

    async fn invalidate_target(&self, _ctx: &TenantId, _target: &TargetId) {}

    async fn invalidate_tenant(&self, _ctx: &TenantId) {}
}
