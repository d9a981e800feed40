use std::path::PathBuf;

use clap::Parser;

use voidcheck_core::{FailurePolicy, SchemaVersion};

/// Reputation lookups for IPv4 addresses and domains.
///
/// Reads a JSON array of indicators (`{"value", "kind", "is_private"}`),
/// runs one bounded-concurrency batch, and prints the results as JSON on
/// stdout. Logs go to stderr; set `RUST_LOG` to see more of them.
#[derive(Parser, Debug)]
#[command(name = "voidcheck", about = "IP and domain reputation lookups")]
pub struct CliArgs {
    /// Indicator file (JSON array). Reads stdin when omitted or `-`.
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Config profile; keys resolve as `{PROFILE}_{KEY}` before `{KEY}`
    #[arg(long, env = "VOIDCHECK_PROFILE", default_value = "")]
    pub profile: String,

    /// API key (overrides VOIDCHECK_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// API base URL (overrides VOIDCHECK_API_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Only return indicators with at least one blocklist detection
    #[arg(long, conflicts_with = "all")]
    pub blocklisted_only: bool,

    /// Return every looked-up indicator, detected or not
    #[arg(long)]
    pub all: bool,

    /// Maximum lookups in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Response schema: flat, envelope, flat-with-quota, or auto
    #[arg(long)]
    pub schema: Option<SchemaVersion>,

    /// What a single failed lookup does to the batch: fail-batch or inline
    #[arg(long)]
    pub failure_policy: Option<FailurePolicy>,

    /// Print the effective (redacted) config and exit
    #[arg(long)]
    pub show_config: bool,
}

impl CliArgs {
    /// The blocklisted-only override, if either switch was given.
    pub fn blocklisted_override(&self) -> Option<bool> {
        match (self.blocklisted_only, self.all) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
