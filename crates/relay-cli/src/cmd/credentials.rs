use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use relay_bot::FileCredentialStore;
use relay_core::config::Config;
use relay_core::types::UserId;
use std::path::Path;

#[derive(Subcommand)]
pub enum CredentialsSubcommand {
    /// Store a session string for a user
    Set {
        user: i64,
        /// Exported session string
        credential: String,
    },
    /// Remove a user's stored session
    Clear { user: i64 },
    /// Report whether a user has a stored session (the value is never printed)
    Show { user: i64 },
}

pub fn run(config_path: &Path, subcmd: CredentialsSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;
    let store = FileCredentialStore::new(&config.sessions.credentials_dir);

    match subcmd {
        CredentialsSubcommand::Set { user, credential } => {
            let user = UserId(user);
            if credential.trim().is_empty() {
                anyhow::bail!("credential must not be empty");
            }
            store
                .save(user, &credential)
                .with_context(|| format!("failed to store credential for {user}"))?;
            report(json, user, "stored", true)
        }
        CredentialsSubcommand::Clear { user } => {
            let user = UserId(user);
            let removed = store
                .clear(user)
                .with_context(|| format!("failed to clear credential for {user}"))?;
            report(json, user, if removed { "cleared" } else { "none" }, removed)
        }
        CredentialsSubcommand::Show { user } => {
            let user = UserId(user);
            let stored = store.load(user).is_some();
            report(json, user, if stored { "stored" } else { "none" }, stored)
        }
    }
}

fn report(json: bool, user: UserId, status: &str, flag: bool) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({
            "user": user,
            "status": status,
            "ok": flag,
        }))?;
    } else {
        println!("{user}: {status}");
    }
    Ok(())
}
