//! Session and password hashing arguments.

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";
pub const ARG_SESSION_REAP_INTERVAL_SECONDS: &str = "session-reap-interval-seconds";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub session_ttl_seconds: i64,
    pub session_cookie_secure: bool,
    pub session_reap_interval_seconds: u64,
    pub bcrypt_cost: u32,
}

impl Options {
    /// Parse session and hashing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is out of range.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800);
        if session_ttl_seconds <= 0 {
            anyhow::bail!("--{ARG_SESSION_TTL_SECONDS} must be positive");
        }

        let session_reap_interval_seconds = matches
            .get_one::<u64>(ARG_SESSION_REAP_INTERVAL_SECONDS)
            .copied()
            .unwrap_or(3600);
        if session_reap_interval_seconds == 0 {
            anyhow::bail!("--{ARG_SESSION_REAP_INTERVAL_SECONDS} must be positive");
        }

        Ok(Self {
            session_ttl_seconds,
            session_cookie_secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
            session_reap_interval_seconds,
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(DEFAULT_COST),
        })
    }
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session TTL in seconds, renewed on every request")
                .env("NOTEKEEP_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("NOTEKEEP_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_SESSION_REAP_INTERVAL_SECONDS)
                .long(ARG_SESSION_REAP_INTERVAL_SECONDS)
                .help("How often expired sessions are purged")
                .env("NOTEKEEP_SESSION_REAP_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor")
                .env("NOTEKEEP_BCRYPT_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST))),
        )
}
