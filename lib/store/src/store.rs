//! The storage seam used by the validator.

use crate::error::StoreError;
use crate::record::{LaravelUser, SessionRecord};
use async_trait::async_trait;
use rootcause::prelude::Report;
use sessionbridge_core::UserId;
use sessionbridge_session::Permissions;

/// Read-only access to sessions, users, and authorization data.
///
/// Implementations must be safe to share between concurrent validations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetches a session by ID.
    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, Report<StoreError>>;

    /// Fetches a non-deleted user by ID.
    async fn get_user(&self, id: UserId) -> Result<Option<LaravelUser>, Report<StoreError>>;

    /// Returns the user's primary role.
    ///
    /// The role is never queried on its own: it is read from the permission
    /// lookup.
    async fn get_user_role(&self, id: UserId) -> Result<Option<String>, Report<StoreError>> {
        let permissions = self.get_user_permissions(id).await?;
        Ok(permissions
            .as_ref()
            .and_then(Permissions::role)
            .map(str::to_string))
    }

    /// Resolves the user's permissions, preferring their latest session's
    /// payload and falling back to the role/permission join tables.
    async fn get_user_permissions(
        &self,
        id: UserId,
    ) -> Result<Option<Permissions>, Report<StoreError>>;

    /// Releases pooled connections.
    async fn close(&self);
}
