use std::ops::Deref;
use std::sync::Arc;

use relay_core::config::SessionsConfig;
use relay_core::types::UserId;
use tracing::{info, warn};

use crate::platform::{CredentialStore, Messenger, PrivilegedSession, SessionFactory};

const LOGIN_EXPIRED: &str = "Login expired. Login again.";

// ─── SessionHandle ────────────────────────────────────────────────────────

/// A privileged session held by one job.
///
/// `Owned` sessions were started for this job and are stopped when it ends.
/// `Shared` is the process-wide default session, which outlives every job.
pub enum SessionHandle<S> {
    Owned(S),
    Shared(Arc<S>),
}

impl<S> Deref for SessionHandle<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self {
            SessionHandle::Owned(s) => s,
            SessionHandle::Shared(s) => s.as_ref(),
        }
    }
}

impl<S: PrivilegedSession> SessionHandle<S> {
    pub fn is_owned(&self) -> bool {
        matches!(self, SessionHandle::Owned(_))
    }

    /// End the job's hold on the session. Owned sessions are stopped; a stop
    /// failure is logged, never escalated.
    pub async fn release(self, user: UserId) {
        if let SessionHandle::Owned(session) = self {
            if let Err(e) = session.stop().await {
                warn!(user = %user, error = %e, "session release: stop failed");
            }
        }
    }
}

// ─── SessionProvider ──────────────────────────────────────────────────────

/// Acquires a privileged session for a user, or reports that none is
/// available.
pub struct SessionProvider<S: PrivilegedSession> {
    credentials: Arc<dyn CredentialStore>,
    factory: Arc<dyn SessionFactory<Session = S>>,
    messenger: Arc<dyn Messenger>,
    default_session: Option<Arc<S>>,
    fallback_enabled: bool,
}

impl<S: PrivilegedSession> SessionProvider<S> {
    pub fn new(
        config: &SessionsConfig,
        credentials: Arc<dyn CredentialStore>,
        factory: Arc<dyn SessionFactory<Session = S>>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            credentials,
            factory,
            messenger,
            default_session: None,
            fallback_enabled: config.default_session_fallback,
        }
    }

    /// Register the shared session used for users without credentials.
    /// Only consulted when `default_session_fallback` is enabled.
    pub fn with_default_session(mut self, session: Arc<S>) -> Self {
        self.default_session = Some(session);
        self
    }

    /// Stored credential → freshly started session; no credential → shared
    /// default (when enabled); anything else → `None`.
    ///
    /// A credential that fails to start tells the user to log in again and
    /// yields `None`; it is not an error for the caller.
    pub async fn acquire(&self, user: UserId) -> Option<SessionHandle<S>> {
        let credential = match self.credentials.stored_session(user).await {
            Ok(c) => c,
            Err(e) => {
                warn!(user = %user, error = %e, "session acquire: credential lookup failed");
                None
            }
        };

        match credential {
            Some(credential) => match self.factory.start(user, &credential).await {
                Ok(session) => {
                    info!(user = %user, "session acquire: started user session");
                    Some(SessionHandle::Owned(session))
                }
                Err(e) => {
                    warn!(user = %user, error = %e, "session acquire: stored login rejected");
                    if let Err(e) = self.messenger.send(user, LOGIN_EXPIRED).await {
                        warn!(user = %user, error = %e, "session acquire: expiry notice not delivered");
                    }
                    None
                }
            },
            None if self.fallback_enabled => {
                let shared = self.default_session.clone().map(SessionHandle::Shared);
                if shared.is_some() {
                    info!(user = %user, "session acquire: using default session");
                } else {
                    warn!(user = %user, "session acquire: fallback enabled but no default session");
                }
                shared
            }
            None => {
                info!(user = %user, "session acquire: no stored login");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use async_trait::async_trait;
    use relay_core::types::{IncomingMessage, MessageId};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeSession {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PrivilegedSession for FakeSession {
        async fn stop(&self) -> Result<(), PlatformError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeFactory {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SessionFactory for FakeFactory {
        type Session = FakeSession;

        async fn start(&self, _user: UserId, credential: &str) -> Result<FakeSession, PlatformError> {
            if credential == "expired" {
                return Err(PlatformError::Other("AUTH_KEY_UNREGISTERED".into()));
            }
            Ok(FakeSession {
                stops: self.stops.clone(),
            })
        }
    }

    #[derive(Default)]
    struct MapStore(HashMap<UserId, String>);

    #[async_trait]
    impl CredentialStore for MapStore {
        async fn stored_session(&self, user: UserId) -> Result<Option<String>, PlatformError> {
            if user == UserId(666) {
                return Err(PlatformError::Unavailable("db down".into()));
            }
            Ok(self.0.get(&user).cloned())
        }
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<(UserId, String)>>);

    #[async_trait]
    impl Messenger for Outbox {
        async fn send(&self, chat: UserId, text: &str) -> Result<MessageId, PlatformError> {
            self.0.lock().unwrap().push((chat, text.to_string()));
            Ok(MessageId(1))
        }
        async fn reply(&self, o: &IncomingMessage, text: &str) -> Result<MessageId, PlatformError> {
            self.send(o.chat, text).await
        }
        async fn edit(&self, _: UserId, _: MessageId, _: &str) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn delete(&self, _: UserId, _: MessageId) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn pin(&self, _: UserId, _: MessageId) -> Result<(), PlatformError> {
            Ok(())
        }
        async fn ask(&self, _: UserId, _: &str) -> Result<String, PlatformError> {
            Ok(String::new())
        }
    }

    struct Fixture {
        outbox: Arc<Outbox>,
        stops: Arc<AtomicUsize>,
    }

    fn provider(fallback: bool, default: bool) -> (SessionProvider<FakeSession>, Fixture) {
        let stops = Arc::new(AtomicUsize::new(0));
        let outbox = Arc::new(Outbox::default());
        let mut store = MapStore::default();
        store.0.insert(UserId(1), "good".into());
        store.0.insert(UserId(2), "expired".into());
        let config = SessionsConfig {
            default_session_fallback: fallback,
            ..Default::default()
        };
        let mut provider = SessionProvider::<FakeSession>::new(
            &config,
            Arc::new(store),
            Arc::new(FakeFactory {
                stops: stops.clone(),
            }),
            outbox.clone(),
        );
        if default {
            provider = provider.with_default_session(Arc::new(FakeSession {
                stops: stops.clone(),
            }));
        }
        (provider, Fixture { outbox, stops })
    }

    #[tokio::test]
    async fn stored_credential_starts_owned_session() {
        let (provider, fx) = provider(false, false);
        let handle = provider.acquire(UserId(1)).await.unwrap();
        assert!(handle.is_owned());
        handle.release(UserId(1)).await;
        assert_eq!(fx.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_credential_notifies_and_yields_none() {
        let (provider, fx) = provider(true, true);
        assert!(provider.acquire(UserId(2)).await.is_none());
        let sent = fx.outbox.0.lock().unwrap().clone();
        assert_eq!(sent, vec![(UserId(2), LOGIN_EXPIRED.to_string())]);
    }

    #[tokio::test]
    async fn no_credential_without_fallback_is_none() {
        let (provider, fx) = provider(false, true);
        assert!(provider.acquire(UserId(3)).await.is_none());
        assert!(fx.outbox.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_credential_with_fallback_shares_default() {
        let (provider, fx) = provider(true, true);
        let handle = provider.acquire(UserId(3)).await.unwrap();
        assert!(!handle.is_owned());
        handle.release(UserId(3)).await;
        assert_eq!(fx.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_without_default_session_is_none() {
        let (provider, _fx) = provider(true, false);
        assert!(provider.acquire(UserId(3)).await.is_none());
    }

    #[tokio::test]
    async fn store_failure_is_treated_as_missing_credential() {
        let (provider, _fx) = provider(true, true);
        let handle = provider.acquire(UserId(666)).await.unwrap();
        assert!(!handle.is_owned());
    }
}
