//! Signed session tokens (JWT, HS256).

use super::{AuthError, Clock, Role, SessionClaims, SystemClock};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, error};

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Issues and verifies session tokens with one process-wide secret key.
///
/// Expiry is checked against the injected [`Clock`], not the `jsonwebtoken`
/// wall clock, so `now < exp` is evaluated with the same time source that
/// issued the token.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// # Errors
    /// Returns [`AuthError::InvalidInput`] if the secret is empty or the TTL
    /// is zero or does not fit in `i64` seconds.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(AuthError::InvalidInput);
        }
        let ttl_seconds = i64::try_from(ttl.as_secs()).map_err(|_| AuthError::InvalidInput)?;
        if ttl_seconds == 0 {
            return Err(AuthError::InvalidInput);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_seconds,
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign claims for `subject` expiring `ttl` after now.
    ///
    /// # Errors
    /// Returns [`AuthError::DependencyUnavailable`] if claims cannot be
    /// encoded or signed.
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, AuthError> {
        let iat = self.clock.now_unix_seconds();
        let claims = SessionClaims {
            sub: subject.to_string(),
            role,
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|err| {
            error!("Failed to sign session token: {}", err);
            AuthError::DependencyUnavailable
        })
    }

    /// Decode and validate a token.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenInvalid`] on a malformed token, a signature
    /// or algorithm mismatch, or when `now >= exp`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|err| {
            debug!("Rejected session token: {}", err);
            AuthError::TokenInvalid
        })?;

        if data.claims.exp <= self.clock.now_unix_seconds() {
            debug!("Rejected expired session token");
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }
}
