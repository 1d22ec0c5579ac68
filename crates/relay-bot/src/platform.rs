use async_trait::async_trait;
use relay_core::types::{IncomingMessage, MessageId, Tier, UserId};

use crate::error::PlatformError;

// ─── Sessions ─────────────────────────────────────────────────────────────

/// An authenticated client acting as one user.
#[async_trait]
pub trait PrivilegedSession: Send + Sync + 'static {
    /// Disconnect the client. Called once when the owning job ends.
    async fn stop(&self) -> Result<(), PlatformError>;
}

/// Builds and starts a [`PrivilegedSession`] from stored credential material.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: PrivilegedSession;

    async fn start(&self, user: UserId, credential: &str) -> Result<Self::Session, PlatformError>;
}

/// Persistent per-user credential material.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn stored_session(&self, user: UserId) -> Result<Option<String>, PlatformError>;
}

// ─── Fetching ─────────────────────────────────────────────────────────────

/// One fetch-and-deliver call.
pub struct FetchRequest<'a, S> {
    /// `None` for public links.
    pub session: Option<&'a S>,
    pub user: UserId,
    /// The "Processing..." message the fetcher may edit with progress.
    pub placeholder: MessageId,
    pub reference: &'a str,
    pub attempt: u32,
    pub origin: &'a IncomingMessage,
}

/// Downloads the referenced content and uploads it back to the user.
#[async_trait]
pub trait ContentFetcher<S: PrivilegedSession>: Send + Sync {
    async fn fetch_and_deliver(&self, request: FetchRequest<'_, S>) -> Result<(), PlatformError>;
}

// ─── Users ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn resolve_tier(&self, origin: &IncomingMessage, user: UserId) -> Tier;

    /// Verified users skip the cooldown regardless of tier.
    async fn is_user_exempt(&self, user: UserId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Proceed,
    /// The gate has already told the user what to do.
    Blocked,
}

#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn require_subscription(&self, origin: &IncomingMessage) -> Subscription;
}

// ─── Messaging ────────────────────────────────────────────────────────────

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat: UserId, text: &str) -> Result<MessageId, PlatformError>;

    async fn reply(&self, origin: &IncomingMessage, text: &str) -> Result<MessageId, PlatformError>;

    async fn edit(&self, chat: UserId, message: MessageId, text: &str)
        -> Result<(), PlatformError>;

    async fn delete(&self, chat: UserId, message: MessageId) -> Result<(), PlatformError>;

    async fn pin(&self, chat: UserId, message: MessageId) -> Result<(), PlatformError>;

    /// Send `prompt` and wait for the user's next reply.
    async fn ask(&self, chat: UserId, prompt: &str) -> Result<String, PlatformError>;
}
