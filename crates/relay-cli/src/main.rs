use clap::{Parser, Subcommand};
use relay_cli::cmd::{
    self, batch::BatchSubcommand, config::ConfigSubcommand, credentials::CredentialsSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Operator tools for the relay bot: inspect links, plan batches, manage config and stored logins",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file
    #[arg(
        long,
        global = true,
        env = "RELAY_CONFIG",
        default_value = ".relay/config.yaml"
    )]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a message reference as public or privileged
    Classify { reference: String },

    /// Pull the first message link out of free text
    Extract { text: String },

    /// Plan sequential batch ranges
    Batch {
        #[command(subcommand)]
        subcommand: BatchSubcommand,
    },

    /// Show, validate, or initialize the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage stored per-user logins
    Credentials {
        #[command(subcommand)]
        subcommand: CredentialsSubcommand,
    },

    /// Run a single-link job against console collaborators (nothing is transferred)
    DryRun {
        /// Acting user id
        #[arg(long, default_value_t = 1)]
        user: i64,
        /// Tier: free or premium
        #[arg(long, default_value = "free")]
        tier: String,
        /// Message text containing the link
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::DryRun { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Classify { reference } => cmd::classify::run(&reference, cli.json),
        Commands::Extract { text } => cmd::extract::run(&text, cli.json),
        Commands::Batch { subcommand } => cmd::batch::run(&cli.config, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
        Commands::Credentials { subcommand } => {
            cmd::credentials::run(&cli.config, subcommand, cli.json)
        }
        Commands::DryRun { user, tier, text } => {
            cmd::dry_run::run(&cli.config, user, &tier, &text, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
