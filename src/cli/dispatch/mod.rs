//! Map validated CLI matches to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_DB_PASSWORD, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_password = matches
        .get_one::<String>(ARG_DB_PASSWORD)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.clone()));

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_password,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        session_cookie_secure: auth_opts.session_cookie_secure,
        session_reap_interval_seconds: auth_opts.session_reap_interval_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn builds_server_action() -> Result<()> {
        temp_env::with_vars(
            [
                ("NOTEKEEP_DSN", Some("postgres://notekeep@localhost:5432/notekeep")),
                ("NOTEKEEP_DB_PASSWORD", Some("s3cret")),
                ("NOTEKEEP_PORT", None),
                ("NOTEKEEP_SESSION_TTL_SECONDS", Some("120")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["notekeep"]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 3000);
                assert_eq!(args.dsn, "postgres://notekeep@localhost:5432/notekeep");
                assert_eq!(
                    args.db_password.as_ref().map(|p| p.expose_secret().to_string()),
                    Some("s3cret".to_string())
                );
                assert_eq!(args.session_ttl_seconds, 120);
                Ok(())
            },
        )
    }

    #[test]
    fn empty_db_password_is_ignored() -> Result<()> {
        temp_env::with_vars(
            [
                ("NOTEKEEP_DSN", Some("postgres://notekeep@localhost/notekeep")),
                ("NOTEKEEP_DB_PASSWORD", Some("")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["notekeep"]);
                let Action::Server(args) = handler(&matches)?;
                assert!(args.db_password.is_none());
                Ok(())
            },
        )
    }
}
