//! Process configuration. `clap::Parser` derive, in the same style used by
//! this crate's other CLI entrypoints; secrets still come from the
//! environment rather than a flag default, so they never show up in
//! `--help` or a process listing.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Pineapple hold'em room server", long_about = None)]
pub struct Config {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// HMAC secret used to verify incoming JWTs. Falls back to $JWT_SECRET.
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: String,

    #[arg(long, default_value = "./data")]
    pub storage_root: String,

    #[arg(long, default_value_t = crate::constants::DEFAULT_TURN_SECONDS)]
    pub turn_seconds: u64,

    #[arg(long, default_value_t = crate::constants::DEFAULT_IDLE_LIMIT_MINUTES)]
    pub idle_limit_minutes: i64,

    #[arg(long, default_value_t = crate::constants::EXPIRY_WARNING_MINUTES)]
    pub expiry_warning_minutes: i64,

    #[arg(long, default_value_t = crate::constants::DEFAULT_SAVE_INTERVAL_SECS)]
    pub save_interval_secs: u64,

    #[arg(long, default_value_t = crate::constants::DEFAULT_CLEANUP_INTERVAL_SECS)]
    pub cleanup_interval_secs: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}
