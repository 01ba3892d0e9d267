use crate::cache::{Cache, NoCache};
use crate::error::{Error, Result};
use crate::record::RoleRecord;
use crate::store::Store;
use crate::types::{RoleId, TenantId};

/// Multi-tenant RBAC engine with pluggable store and optional cache.
///
/// One instance is the whole service surface: catalog management, role
/// hierarchy maintenance, constraint bookkeeping, the grant ledger, and
/// authorization checks. The engine holds no state of its own between calls;
/// every answer is a function of the store contents at call time.
#[derive(Debug)]
pub struct Rbac<S, C = NoCache> {
    pub(crate) store: S,
    pub(crate) cache: C,
}

/// Builder for [`Rbac`].
pub struct RbacBuilder<S, C = NoCache> {
    store: S,
    cache: C,
}

impl<S> RbacBuilder<S, NoCache> {
    /// Creates a new builder without caching.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: NoCache,
        }
    }
}

impl<S, C> RbacBuilder<S, C> {
    /// Sets the cache implementation.
    pub fn cache<C2: Cache>(self, cache: C2) -> RbacBuilder<S, C2> {
        RbacBuilder {
            store: self.store,
            cache,
        }
    }

    /// Builds the engine.
    pub fn build(self) -> Rbac<S, C> {
        Rbac {
            store: self.store,
            cache: self.cache,
        }
    }
}

impl<S, C> Rbac<S, C>
where
    S: Store,
    C: Cache,
{
    /// Loads a role or fails with [`Error::RoleNotExist`].
    pub(crate) async fn require_role(&self, ctx: &TenantId, id: RoleId) -> Result<RoleRecord> {
        self.store
            .find_role(ctx, id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::role_not_exist(ctx))
    }

    /// Loads a role that must exist and be enabled.
    pub(crate) async fn require_enabled_role(
        &self,
        ctx: &TenantId,
        id: RoleId,
    ) -> Result<RoleRecord> {
        let role = self.require_role(ctx, id).await?;
        if !role.status.is_enabled() {
            return Err(Error::role_not_exist(ctx));
        }
        Ok(role)
    }
}
