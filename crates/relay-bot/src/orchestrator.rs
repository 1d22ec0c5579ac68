use std::sync::Arc;
use std::time::Duration;

use relay_core::batch::{ceiling_for, parse_count, BatchRequest};
use relay_core::config::Config;
use relay_core::cooldown::{Admission, CooldownGate};
use relay_core::link::{classify, extract_link};
use relay_core::registry::{JobGuard, JobRegistry};
use relay_core::types::{IncomingMessage, MessageId, Tier, UserId};
use tracing::{debug, info, warn};

use crate::error::{JobError, PlatformError};
use crate::platform::{
    ContentFetcher, FetchRequest, Messenger, PrivilegedSession, Subscription, SubscriptionGate,
    TierResolver,
};
use crate::session::{SessionHandle, SessionProvider};

const PROCESSING: &str = "Processing...";
const SINGLE_ALREADY_RUNNING: &str = "You already have a running process. Use /cancel.";
const BATCH_ALREADY_RUNNING: &str = "Batch already running.";
const NO_LINK: &str = "No valid link found in your message.";
const CANCELLED: &str = "Process cancelled.";
const NOTHING_TO_CANCEL: &str = "No active process.";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a job never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The subscription gate stopped the request (and replied itself).
    Blocked,
    AlreadyRunning,
    Cooldown { remaining_secs: u64 },
    BatchTooLarge { requested: u32, max: u32 },
    InvalidInput(String),
}

/// Terminal state of one orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { processed: u32, total: u32 },
    /// User-initiated stop; items processed so far stand.
    Cancelled { processed: u32, total: u32 },
    Rejected(Rejection),
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Platform-facing collaborators of the orchestrator.
pub struct Collaborators<S: PrivilegedSession> {
    pub fetcher: Arc<dyn ContentFetcher<S>>,
    pub messenger: Arc<dyn Messenger>,
    pub tiers: Arc<dyn TierResolver>,
    pub subscription: Arc<dyn SubscriptionGate>,
}

/// Admits, runs, and tears down per-user jobs.
///
/// Shared process-wide (usually behind an `Arc`); every inbound link or
/// command becomes one call on it. The registry and cooldown stores start
/// empty and live as long as the orchestrator.
pub struct Orchestrator<S: PrivilegedSession> {
    config: Config,
    registry: Arc<JobRegistry>,
    cooldown: Arc<CooldownGate>,
    sessions: SessionProvider<S>,
    fetcher: Arc<dyn ContentFetcher<S>>,
    messenger: Arc<dyn Messenger>,
    tiers: Arc<dyn TierResolver>,
    subscription: Arc<dyn SubscriptionGate>,
}

impl<S: PrivilegedSession> Orchestrator<S> {
    pub fn new(config: Config, sessions: SessionProvider<S>, collaborators: Collaborators<S>) -> Self {
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            cooldown: Arc::new(CooldownGate::new()),
            sessions,
            fetcher: collaborators.fetcher,
            messenger: collaborators.messenger,
            tiers: collaborators.tiers,
            subscription: collaborators.subscription,
        }
    }

    /// Use an externally owned registry, e.g. one shared with a cancel
    /// command handler living elsewhere.
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Arc<CooldownGate>) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn cooldown(&self) -> &Arc<CooldownGate> {
        &self.cooldown
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Single link
    // -----------------------------------------------------------------------

    /// Fetch and deliver the link found in `origin`.
    pub async fn handle_link(&self, origin: &IncomingMessage) -> JobOutcome {
        let user = origin.chat;
        info!(user = %user, "handle_link: request received");

        let (guard, _tier) = match self.admit(origin, SINGLE_ALREADY_RUNNING).await {
            Ok(admitted) => admitted,
            Err(rejection) => return JobOutcome::Rejected(rejection),
        };

        let Some(link) = extract_link(&origin.text) else {
            self.notify(user, NO_LINK).await;
            return JobOutcome::Rejected(Rejection::InvalidInput(NO_LINK.to_string()));
        };

        let placeholder = match self.messenger.reply(origin, PROCESSING).await {
            Ok(id) => id,
            Err(e) => return self.fail(user, e.into()).await,
        };

        let mut session = None;
        let outcome = self
            .run_single(origin, &link, placeholder, &mut session)
            .await;

        if let Some(session) = session {
            session.release(user).await;
        }
        self.cleanup(user, placeholder).await;
        drop(guard);

        info!(user = %user, outcome = ?outcome, "handle_link: finished");
        outcome
    }

    async fn run_single(
        &self,
        origin: &IncomingMessage,
        link: &str,
        placeholder: MessageId,
        session: &mut Option<SessionHandle<S>>,
    ) -> JobOutcome {
        let user = origin.chat;
        let kind = classify(link);
        debug!(user = %user, reference = %link, kind = %kind, "handle_link: classified");

        if kind.needs_session() {
            match self.sessions.acquire(user).await {
                Some(handle) => *session = Some(handle),
                None => return self.fail(user, JobError::AuthRequired).await,
            }
        }

        match self.fetch(origin, link, placeholder, session.as_deref()).await {
            Ok(()) => {
                self.cooldown.set(user, self.config.cooldown.single_secs);
                JobOutcome::Completed {
                    processed: 1,
                    total: 1,
                }
            }
            Err(e) => self.fail(user, e.into()).await,
        }
    }

    // -----------------------------------------------------------------------
    // Batch
    // -----------------------------------------------------------------------

    /// Prompt for a start link and a count, then fetch the sequential range.
    pub async fn handle_batch(&self, origin: &IncomingMessage) -> JobOutcome {
        let user = origin.chat;
        info!(user = %user, "handle_batch: request received");

        let (guard, tier) = match self.admit(origin, BATCH_ALREADY_RUNNING).await {
            Ok(admitted) => admitted,
            Err(rejection) => return JobOutcome::Rejected(rejection),
        };

        let request = match self.prompt_batch(user, tier).await {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };
        let total = request.count;
        info!(
            user = %user,
            start = %request.start_reference,
            total,
            "handle_batch: admitted"
        );

        let progress = match self.messenger.send(user, &progress_text(0, total)).await {
            Ok(id) => {
                if let Err(e) = self.messenger.pin(user, id).await {
                    warn!(user = %user, error = %e, "handle_batch: pin failed");
                }
                Some(id)
            }
            Err(e) => {
                warn!(user = %user, error = %e, "handle_batch: progress message not sent");
                None
            }
        };

        let mut session = None;
        let outcome = self
            .run_batch(origin, &guard, &request, progress, &mut session)
            .await;

        if let Some(session) = session {
            session.release(user).await;
        }
        drop(guard);

        info!(user = %user, outcome = ?outcome, "handle_batch: finished");
        outcome
    }

    async fn prompt_batch(&self, user: UserId, tier: Tier) -> Result<BatchRequest, JobOutcome> {
        let max = ceiling_for(tier, &self.config.limits);

        let start = match self.messenger.ask(user, "Send start link").await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(user, e.into()).await),
        };
        let Some(start) = extract_link(&start) else {
            return Err(self.reject_input(user, "Invalid start link.").await);
        };

        let prompt = format!("How many messages? (Max {max})");
        let count = match self.messenger.ask(user, &prompt).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(user, e.into()).await),
        };
        let count = match parse_count(&count) {
            Ok(n) => n,
            Err(_) => return Err(self.reject_input(user, "Please send a whole number.").await),
        };

        if count > max {
            warn!(user = %user, requested = count, max, "handle_batch: over tier ceiling");
            self.notify(
                user,
                &format!("Too many messages: you asked for {count}, your limit is {max}."),
            )
            .await;
            return Err(JobOutcome::Rejected(Rejection::BatchTooLarge {
                requested: count,
                max,
            }));
        }

        match BatchRequest::parse(&start, count) {
            Ok(request) => Ok(request),
            Err(e) => Err(self.reject_input(user, &e.to_string()).await),
        }
    }

    async fn run_batch(
        &self,
        origin: &IncomingMessage,
        guard: &JobGuard<'_>,
        request: &BatchRequest,
        progress: Option<MessageId>,
        session: &mut Option<SessionHandle<S>>,
    ) -> JobOutcome {
        let user = origin.chat;
        let total = request.count;
        let mut processed = 0;

        for reference in request.references() {
            if guard.is_cancelled() {
                info!(user = %user, processed, total, "handle_batch: cancelled");
                self.update_progress(user, progress, &format!("Batch cancelled at {processed}/{total}"))
                    .await;
                return JobOutcome::Cancelled { processed, total };
            }

            let placeholder = match self.messenger.send(user, PROCESSING).await {
                Ok(id) => id,
                Err(e) => return self.fail(user, e.into()).await,
            };

            let kind = classify(&reference);
            if kind.needs_session() && session.is_none() {
                match self.sessions.acquire(user).await {
                    Some(handle) => *session = Some(handle),
                    None => {
                        self.cleanup(user, placeholder).await;
                        return self.fail(user, JobError::AuthRequired).await;
                    }
                }
            }
            let item_session = if kind.needs_session() {
                session.as_deref()
            } else {
                None
            };

            let result = self
                .fetch(origin, &reference, placeholder, item_session)
                .await;
            self.cleanup(user, placeholder).await;
            if let Err(e) = result {
                warn!(user = %user, reference = %reference, processed, "handle_batch: item failed");
                return self.fail(user, e.into()).await;
            }

            processed += 1;
            debug!(user = %user, reference = %reference, processed, total, "handle_batch: item done");
            self.update_progress(user, progress, &progress_text(processed, total))
                .await;
        }

        self.cooldown.set(user, self.config.cooldown.batch_secs);
        self.update_progress(user, progress, "Batch completed 🎉")
            .await;
        JobOutcome::Completed { processed, total }
    }

    // -----------------------------------------------------------------------
    // Cancel
    // -----------------------------------------------------------------------

    /// Ask the user's running job to stop before its next item.
    /// Returns `false` when nothing was running.
    pub async fn cancel(&self, origin: &IncomingMessage) -> bool {
        let user = origin.chat;
        let cancelled = self.registry.request_cancel(user);
        info!(user = %user, cancelled, "cancel: request received");
        let text = if cancelled {
            CANCELLED
        } else {
            NOTHING_TO_CANCEL
        };
        if let Err(e) = self.messenger.reply(origin, text).await {
            warn!(user = %user, error = %e, "cancel: reply failed");
        }
        cancelled
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Subscription → job slot → tier → cooldown. On success the caller owns
    /// the slot through the returned guard.
    async fn admit(
        &self,
        origin: &IncomingMessage,
        busy_text: &str,
    ) -> Result<(JobGuard<'_>, Tier), Rejection> {
        let user = origin.chat;

        if self.subscription.require_subscription(origin).await == Subscription::Blocked {
            info!(user = %user, "admit: blocked by subscription gate");
            return Err(Rejection::Blocked);
        }

        let Some(guard) = self.registry.try_acquire(user) else {
            warn!(user = %user, "admit: job already running");
            self.notify_reply(origin, busy_text).await;
            return Err(Rejection::AlreadyRunning);
        };

        let tier = self.tiers.resolve_tier(origin, user).await;
        let exempt = tier.is_rate_limited() && self.tiers.is_user_exempt(user).await;

        let admission = self.cooldown.check(user, tier, exempt);
        if let Admission::Wait { remaining_secs } = admission {
            info!(user = %user, remaining_secs, "admit: cooling down");
            if let Some(text) = admission.message() {
                self.notify_reply(origin, &text).await;
            }
            return Err(Rejection::Cooldown { remaining_secs });
        }

        debug!(user = %user, tier = %tier, exempt, "admit: admitted");
        Ok((guard, tier))
    }

    async fn fetch(
        &self,
        origin: &IncomingMessage,
        reference: &str,
        placeholder: MessageId,
        session: Option<&S>,
    ) -> Result<(), PlatformError> {
        let privileged = session.is_some();
        self.fetcher
            .fetch_and_deliver(FetchRequest {
                session,
                user: origin.chat,
                placeholder,
                reference,
                attempt: 0,
                origin,
            })
            .await?;

        let delay = self.config.fetch.privileged_delay_secs;
        if privileged && delay > 0 {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
        Ok(())
    }

    async fn fail(&self, user: UserId, error: JobError) -> JobOutcome {
        warn!(user = %user, error = %error, "job failed");
        self.notify(user, &error.user_message()).await;
        JobOutcome::Failed(error)
    }

    async fn reject_input(&self, user: UserId, text: &str) -> JobOutcome {
        self.notify(user, text).await;
        JobOutcome::Rejected(Rejection::InvalidInput(text.to_string()))
    }

    async fn update_progress(&self, user: UserId, progress: Option<MessageId>, text: &str) {
        let Some(id) = progress else { return };
        if let Err(e) = self.messenger.edit(user, id, text).await {
            warn!(user = %user, error = %e, "progress edit failed");
        }
    }

    /// Delete a transient message; failure is logged only.
    async fn cleanup(&self, user: UserId, message: MessageId) {
        if let Err(e) = self.messenger.delete(user, message).await {
            warn!(user = %user, message = %message, error = %e, "cleanup: delete failed");
        }
    }

    async fn notify(&self, user: UserId, text: &str) {
        if let Err(e) = self.messenger.send(user, text).await {
            warn!(user = %user, error = %e, "notify failed");
        }
    }

    async fn notify_reply(&self, origin: &IncomingMessage, text: &str) {
        if let Err(e) = self.messenger.reply(origin, text).await {
            warn!(user = %origin.chat, error = %e, "reply failed");
        }
    }
}

fn progress_text(done: u32, total: u32) -> String {
    format!("Batch started\nProcessing: {done}/{total}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
