use crate::{
    auth::{PasswordHasher, SessionConfig},
    notekeep,
};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_password: Option<SecretString>,
    pub session_ttl_seconds: i64,
    pub session_cookie_secure: bool,
    pub session_reap_interval_seconds: u64,
    pub bcrypt_cost: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = build_dsn(&args.dsn, args.db_password.as_ref())?;

    let hasher = PasswordHasher::new(args.bcrypt_cost)?;
    let session_config = SessionConfig::new()
        .with_ttl_seconds(args.session_ttl_seconds)
        .with_cookie_secure(args.session_cookie_secure)
        .with_reap_interval_seconds(args.session_reap_interval_seconds);

    debug!(
        port = args.port,
        session_ttl_seconds = args.session_ttl_seconds,
        bcrypt_cost = args.bcrypt_cost,
        "starting server"
    );

    notekeep::new(args.port, dsn, hasher, session_config).await
}

/// Inject the password into the DSN so it never has to appear on the
/// command line.
fn build_dsn(dsn: &str, password: Option<&SecretString>) -> Result<String> {
    let mut dsn = Url::parse(dsn)?;

    if let Some(password) = password {
        dsn.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    Ok(dsn.to_string())
}
