//! Collaborators for `relay dry-run`: they record and log what the bot
//! would do instead of talking to the messaging platform.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use relay_bot::{
    ContentFetcher, FetchRequest, Messenger, PlatformError, PrivilegedSession, SessionFactory,
    Subscription, SubscriptionGate, TierResolver,
};
use relay_core::types::{IncomingMessage, MessageId, Tier, UserId};
use tracing::info;

// ---------------------------------------------------------------------------
// Messenger
// ---------------------------------------------------------------------------

/// Records every outbound call as a transcript line.
#[derive(Default)]
pub struct ConsoleMessenger {
    transcript: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl ConsoleMessenger {
    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, line: String) {
        info!("{line}");
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn one_line(text: &str) -> String {
    text.replace('\n', " / ")
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, chat: UserId, text: &str) -> Result<MessageId, PlatformError> {
        let id = self.next_id();
        self.record(format!("send #{id} to {chat}: {}", one_line(text)));
        Ok(id)
    }

    async fn reply(&self, origin: &IncomingMessage, text: &str) -> Result<MessageId, PlatformError> {
        let id = self.next_id();
        self.record(format!(
            "reply #{id} to {}#{}: {}",
            origin.chat,
            origin.id,
            one_line(text)
        ));
        Ok(id)
    }

    async fn edit(&self, _chat: UserId, message: MessageId, text: &str) -> Result<(), PlatformError> {
        self.record(format!("edit #{message}: {}", one_line(text)));
        Ok(())
    }

    async fn delete(&self, _chat: UserId, message: MessageId) -> Result<(), PlatformError> {
        self.record(format!("delete #{message}"));
        Ok(())
    }

    async fn pin(&self, _chat: UserId, message: MessageId) -> Result<(), PlatformError> {
        self.record(format!("pin #{message}"));
        Ok(())
    }

    async fn ask(&self, _chat: UserId, prompt: &str) -> Result<String, PlatformError> {
        Err(PlatformError::Unavailable(format!(
            "dry run cannot answer prompt {prompt:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub struct ConsoleSession {
    label: String,
}

impl ConsoleSession {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl PrivilegedSession for ConsoleSession {
    async fn stop(&self) -> Result<(), PlatformError> {
        info!(session = %self.label, "session stopped");
        Ok(())
    }
}

/// Accepts any non-empty credential.
pub struct ConsoleSessionFactory;

#[async_trait]
impl SessionFactory for ConsoleSessionFactory {
    type Session = ConsoleSession;

    async fn start(&self, user: UserId, credential: &str) -> Result<ConsoleSession, PlatformError> {
        if credential.is_empty() {
            return Err(PlatformError::Other("empty credential".into()));
        }
        info!(user = %user, "session started");
        Ok(ConsoleSession::new(format!("user-{user}")))
    }
}

// ---------------------------------------------------------------------------
// Fetcher, tiers, subscription
// ---------------------------------------------------------------------------

/// Logs the fetch it would have performed.
pub struct LoggingFetcher;

#[async_trait]
impl ContentFetcher<ConsoleSession> for LoggingFetcher {
    async fn fetch_and_deliver(
        &self,
        request: FetchRequest<'_, ConsoleSession>,
    ) -> Result<(), PlatformError> {
        let via = request
            .session
            .map(|s| s.label.as_str())
            .unwrap_or("anonymous");
        info!(
            user = %request.user,
            reference = %request.reference,
            via,
            "fetch: would transfer"
        );
        Ok(())
    }
}

pub struct FixedTier(pub Tier);

#[async_trait]
impl TierResolver for FixedTier {
    async fn resolve_tier(&self, _origin: &IncomingMessage, _user: UserId) -> Tier {
        self.0
    }

    async fn is_user_exempt(&self, _user: UserId) -> bool {
        false
    }
}

pub struct OpenGate;

#[async_trait]
impl SubscriptionGate for OpenGate {
    async fn require_subscription(&self, _origin: &IncomingMessage) -> Subscription {
        Subscription::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcript_keeps_call_order_and_ids() {
        let m = ConsoleMessenger::default();
        let origin = IncomingMessage::new(7, 3, "hi");
        let id = m.reply(&origin, "Processing...").await.unwrap();
        m.edit(UserId(7), id, "Batch started\nProcessing: 1/2")
            .await
            .unwrap();
        m.delete(UserId(7), id).await.unwrap();

        assert_eq!(
            m.transcript(),
            vec![
                "reply #1 to 7#3: Processing...",
                "edit #1: Batch started / Processing: 1/2",
                "delete #1",
            ]
        );
    }

    #[tokio::test]
    async fn ask_is_unavailable() {
        let m = ConsoleMessenger::default();
        assert!(matches!(
            m.ask(UserId(1), "Send start link").await,
            Err(PlatformError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn factory_rejects_empty_credential() {
        assert!(ConsoleSessionFactory.start(UserId(1), "").await.is_err());
        assert!(ConsoleSessionFactory.start(UserId(1), "abc").await.is_ok());
    }
}
