//! Token store seam.

use async_trait::async_trait;
use uuid::Uuid;

use carelink_core::result::AppResult;
use carelink_database::repositories::device_token::DeviceTokenRepository;
use carelink_entity::device_token::DeviceToken;

/// The slice of token persistence the delivery path needs.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug + 'static {
    /// Non-revoked tokens for a user.
    async fn active_tokens(&self, user_id: Uuid) -> AppResult<Vec<DeviceToken>>;

    /// Record a delivery attempt against a token.
    async fn touch(&self, id: Uuid) -> AppResult<()>;

    /// Flag a token permanently invalid.
    async fn revoke(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
impl TokenStore for DeviceTokenRepository {
    async fn active_tokens(&self, user_id: Uuid) -> AppResult<Vec<DeviceToken>> {
        self.find_active_by_user(user_id).await
    }

    async fn touch(&self, id: Uuid) -> AppResult<()> {
        DeviceTokenRepository::touch(self, id).await
    }

    async fn revoke(&self, id: Uuid) -> AppResult<()> {
        DeviceTokenRepository::revoke(self, id).await
    }
}
