//! CLI argument definitions

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "muezzin")]
#[command(version, about = "Operate the Muezzin prayer notification engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (.toml, .yaml, .yml or .json)
    #[arg(short, long, global = true, env = "MUEZZIN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one job invocation now
    Run(RunArgs),

    /// Send a test notification to a user, bypassing scheduling
    Test {
        /// User id
        #[arg(long)]
        user: String,
    },

    /// Show a user's token state, prayer deltas and today's markers
    Status {
        /// User id
        #[arg(long)]
        user: String,

        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Load user records from a JSON, YAML or TOML file
    Import {
        /// File holding a `users` list
        file: PathBuf,
    },

    /// Queue a like for the deferred digest
    Like(LikeArgs),

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Job to run
    #[arg(value_enum)]
    pub job: Job,

    /// Run as if it were this instant (RFC 3339)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Job {
    /// Per-minute prayer reminders
    PrayerLoop,
    /// Silent prayer-blocker activation
    Blocker,
    /// Like digest
    Likes,
}

#[derive(Args)]
pub struct LikeArgs {
    /// Liked post
    pub post: String,

    /// Owner of the post, who receives the digest
    #[arg(long)]
    pub recipient: String,

    /// Display name of the user who liked
    #[arg(long)]
    pub actor: String,

    /// When the like happened (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
