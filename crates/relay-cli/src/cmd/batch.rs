use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use relay_core::batch::{ceiling_for, parse_count, BatchRequest};
use relay_core::config::Config;
use relay_core::link::{classify, extract_link};
use relay_core::types::Tier;
use std::path::Path;

#[derive(Subcommand)]
pub enum BatchSubcommand {
    /// Check a batch against the tier ceiling and list the references it covers
    Plan {
        /// First message link of the range
        start: String,
        /// Number of messages
        count: String,
        /// Tier: free or premium
        #[arg(long, default_value = "free")]
        tier: String,
    },
}

pub fn run(config_path: &Path, subcmd: BatchSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BatchSubcommand::Plan { start, count, tier } => {
            plan(config_path, &start, &count, &tier, json)
        }
    }
}

fn plan(config_path: &Path, start: &str, count: &str, tier: &str, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path).context("failed to load config")?;
    let tier: Tier = tier.parse()?;
    let count = parse_count(count)?;

    let max = ceiling_for(tier, &config.limits);
    if count > max {
        anyhow::bail!("{count} messages is over the {tier} limit of {max}");
    }

    let start = extract_link(start).unwrap_or_else(|| start.trim().to_string());
    let request = BatchRequest::parse(&start, count)
        .with_context(|| format!("cannot derive a range from '{start}'"))?;

    if json {
        let references: Vec<String> = request.references().collect();
        print_json(&serde_json::json!({
            "tier": tier.as_str(),
            "max": max,
            "request": request,
            "references": references,
        }))?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = request
        .references()
        .enumerate()
        .map(|(i, reference)| {
            let kind = classify(&reference);
            vec![(i + 1).to_string(), reference, kind.to_string()]
        })
        .collect();
    print_table(&["#", "REFERENCE", "KIND"], rows);
    println!("\n{count} of max {max} ({tier})");
    Ok(())
}
