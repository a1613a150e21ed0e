use crate::auth::ActivationPolicy;
use anyhow::{anyhow, Context, Result};
use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_JWT_KEY: &str = "jwt-key";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_REQUEST_TIMEOUT_SECONDS: &str = "request-timeout-seconds";
pub const ARG_ACTIVATION_POLICY: &str = "activation-policy";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";

#[derive(Debug, Clone)]
pub struct Options {
    pub jwt_key: SecretString,
    pub token_ttl: Duration,
    pub request_timeout: Duration,
    pub activation_policy: ActivationPolicy,
    pub bcrypt_cost: u32,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing key is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_key = matches
            .get_one::<String>(ARG_JWT_KEY)
            .filter(|key| !key.trim().is_empty())
            .cloned()
            .map(SecretString::from)
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_JWT_KEY}"))?;

        let seconds = |id: &str| -> Result<Duration> {
            matches
                .get_one::<u64>(id)
                .copied()
                .map(Duration::from_secs)
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            jwt_key,
            token_ttl: seconds(ARG_TOKEN_TTL_SECONDS)?,
            request_timeout: seconds(ARG_REQUEST_TIMEOUT_SECONDS)?,
            activation_policy: matches
                .get_one::<ActivationPolicy>(ARG_ACTIVATION_POLICY)
                .copied()
                .unwrap_or_default(),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(bcrypt::DEFAULT_COST),
        })
    }
}

fn validator_activation_policy() -> ValueParser {
    ValueParser::from(|value: &str| value.parse::<ActivationPolicy>())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_KEY)
                .long(ARG_JWT_KEY)
                .help("HMAC key used to sign session tokens")
                .long_help(
                    "HMAC key used to sign session tokens. Rotating it invalidates every token issued with the previous key.",
                )
                .env("RAIKO_JWT_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("RAIKO_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT_SECONDS)
                .long(ARG_REQUEST_TIMEOUT_SECONDS)
                .help("Per-request timeout in seconds")
                .env("RAIKO_REQUEST_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ACTIVATION_POLICY)
                .long(ARG_ACTIVATION_POLICY)
                .help("Activation of new accounts: immediate or confirm")
                .env("RAIKO_ACTIVATION_POLICY")
                .default_value("immediate")
                .value_parser(validator_activation_policy()),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password digests")
                .env("RAIKO_BCRYPT_COST")
                .default_value("12")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
}
