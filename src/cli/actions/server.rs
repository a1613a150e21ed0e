use crate::{
    api::{self, ApiState},
    auth::{
        ActivationPolicy, AuthWorkflow, CredentialHasher, InMemoryDirectory, PgDirectory,
        TokenIssuer, UserDirectory,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub jwt_key: SecretString,
    pub token_ttl: Duration,
    pub request_timeout: Duration,
    pub activation_policy: ActivationPolicy,
    pub bcrypt_cost: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the token issuer cannot be
/// built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let directory = directory(args.dsn.as_deref()).await?;

    let tokens = TokenIssuer::new(&args.jwt_key, args.token_ttl)
        .context("Invalid session token configuration")?;

    let workflow = AuthWorkflow::new(
        directory,
        CredentialHasher::new().with_cost(args.bcrypt_cost),
        tokens,
    )
    .with_activation_policy(args.activation_policy);

    let state = ApiState::new(workflow).with_request_timeout(args.request_timeout);

    api::new(args.port, state).await
}

async fn directory(dsn: Option<&str>) -> Result<Arc<dyn UserDirectory>> {
    let Some(dsn) = dsn else {
        warn!("No DSN configured, users are kept in memory");
        return Ok(Arc::new(InMemoryDirectory::new()));
    };

    info!("Connecting to database: {}", redact_dsn(dsn));

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let directory = PgDirectory::new(pool);
    directory
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    Ok(Arc::new(directory))
}

/// Hide the password component of a DSN before it is logged.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "<unparseable dsn>".to_string();
            }
            url.to_string()
        }
        Err(_) => "<unparseable dsn>".to_string(),
    }
}
