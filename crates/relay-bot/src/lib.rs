//! Per-user job orchestration for the relay bot.
//!
//! The orchestrator admits at most one job per user, gates rate-limited
//! users behind a cooldown, routes each link to an anonymous or a
//! privileged fetch, and lets a running batch be cancelled between items.
//! Everything that talks to the messaging platform is a collaborator trait
//! in [`platform`]; the bot glue supplies the implementations.
//!
//! ```text
//! IncomingMessage
//!     │
//!     ▼
//! Orchestrator ── SubscriptionGate, TierResolver
//!     │  JobRegistry (one slot per user), CooldownGate
//!     ▼
//! classify(link) ── Privileged ──► SessionProvider ─► CredentialStore
//!     │                                         └───► SessionFactory
//!     ▼
//! ContentFetcher::fetch_and_deliver
//! ```

pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod session;
pub mod store;

pub use error::{JobError, PlatformError};
pub use orchestrator::{Collaborators, JobOutcome, Orchestrator, Rejection};
pub use platform::{
    ContentFetcher, CredentialStore, FetchRequest, Messenger, PrivilegedSession, SessionFactory,
    Subscription, SubscriptionGate, TierResolver,
};
pub use session::{SessionHandle, SessionProvider};
pub use store::FileCredentialStore;
