use crate::console::{
    ConsoleMessenger, ConsoleSession, ConsoleSessionFactory, FixedTier, LoggingFetcher, OpenGate,
};
use crate::output::print_json;
use anyhow::Context;
use relay_bot::{Collaborators, FileCredentialStore, JobOutcome, Orchestrator, Rejection, SessionProvider};
use relay_core::config::Config;
use relay_core::types::{IncomingMessage, Tier};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub fn run(config_path: &Path, user: i64, tier: &str, text: &str, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path).context("failed to load config")?;
    let tier: Tier = tier.parse()?;

    // Nothing is transferred, so there is nothing to pace.
    config.fetch.privileged_delay_secs = 0;

    let messenger = Arc::new(ConsoleMessenger::default());
    let sessions = SessionProvider::<ConsoleSession>::new(
        &config.sessions,
        Arc::new(FileCredentialStore::new(&config.sessions.credentials_dir)),
        Arc::new(ConsoleSessionFactory),
        messenger.clone(),
    )
    .with_default_session(Arc::new(ConsoleSession::new("default")));

    let orchestrator = Orchestrator::new(
        config,
        sessions,
        Collaborators {
            fetcher: Arc::new(LoggingFetcher),
            messenger: messenger.clone(),
            tiers: Arc::new(FixedTier(tier)),
            subscription: Arc::new(OpenGate),
        },
    );

    let origin = IncomingMessage::new(user, 1, text);
    info!(user, tier = %tier, "dry-run: starting");

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(orchestrator.handle_link(&origin));

    let summary = describe(&outcome);
    if json {
        print_json(&serde_json::json!({
            "outcome": summary,
            "completed": outcome.is_completed(),
            "transcript": messenger.transcript(),
        }))?;
    } else {
        for line in messenger.transcript() {
            println!("{line}");
        }
        println!("outcome: {summary}");
    }

    if !outcome.is_completed() {
        anyhow::bail!("dry run did not complete: {summary}");
    }
    Ok(())
}

fn describe(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Completed { processed, total } => format!("completed {processed}/{total}"),
        JobOutcome::Cancelled { processed, total } => format!("cancelled at {processed}/{total}"),
        JobOutcome::Failed(e) => format!("failed: {e}"),
        JobOutcome::Rejected(r) => match r {
            Rejection::Blocked => "rejected: blocked".to_string(),
            Rejection::AlreadyRunning => "rejected: already running".to_string(),
            Rejection::Cooldown { remaining_secs } => {
                format!("rejected: cooling down for {remaining_secs}s")
            }
            Rejection::BatchTooLarge { requested, max } => {
                format!("rejected: {requested} is over the limit of {max}")
            }
            Rejection::InvalidInput(reason) => format!("rejected: {reason}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_bot::JobError;

    #[test]
    fn describe_covers_terminal_states() {
        assert_eq!(
            describe(&JobOutcome::Completed {
                processed: 1,
                total: 1
            }),
            "completed 1/1"
        );
        assert_eq!(
            describe(&JobOutcome::Failed(JobError::AuthRequired)),
            "failed: login required for private links"
        );
        assert_eq!(
            describe(&JobOutcome::Rejected(Rejection::Cooldown { remaining_secs: 12 })),
            "rejected: cooling down for 12s"
        );
    }
}
