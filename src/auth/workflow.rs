//! Registration and authentication flows.
//!
//! Each call runs the steps in order and stops at the first classified
//! failure. Nothing is retried here; callers own retry and timeout policy.

use super::{
    valid_email, valid_password, valid_username, AuthError, Candidate, CredentialHasher,
    NewUser, Role, SessionClaims, TokenIssuer, UserDirectory,
};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr, sync::Arc};
use tokio::{sync::OnceCell, task};
use tracing::{debug, error, info, instrument};

// Hashed once per workflow and verified against on unknown identifiers.
const PLACEHOLDER_PASSWORD: &str = "placeholder-password";

/// Decides the `is_active` flag of newly registered records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationPolicy {
    /// Accounts can log in right after registration.
    #[default]
    Immediate,
    /// Accounts stay inactive until something outside this service confirms
    /// them (for example an email confirmation flow).
    RequireConfirmation,
}

impl ActivationPolicy {
    #[must_use]
    pub const fn initial_active(self) -> bool {
        matches!(self, Self::Immediate)
    }
}

impl FromStr for ActivationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "confirm" | "require-confirmation" => Ok(Self::RequireConfirmation),
            other => Err(format!("unknown activation policy: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct AuthWorkflow {
    directory: Arc<dyn UserDirectory>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    activation: ActivationPolicy,
    placeholder_digest: Arc<OnceCell<String>>,
}

impl fmt::Debug for AuthWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthWorkflow")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

impl AuthWorkflow {
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            directory,
            hasher,
            tokens,
            activation: ActivationPolicy::default(),
            placeholder_digest: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn with_activation_policy(mut self, activation: ActivationPolicy) -> Self {
        self.activation = activation;
        self
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - [`AuthError::InvalidInput`] for empty fields, a username outside
    ///   3..=20 characters or containing `@`, or a malformed email,
    /// - [`AuthError::WeakPassword`] if the password policy rejects the password,
    /// - [`AuthError::DuplicateIdentity`] if the email or username is taken,
    ///   including when a concurrent registration wins the insert,
    /// - [`AuthError::DependencyUnavailable`] on directory or hashing failure.
    #[instrument(skip_all)]
    pub async fn register(&self, candidate: Candidate) -> Result<(), AuthError> {
        let Candidate {
            email,
            username,
            password,
        } = candidate;

        if email.is_empty() || username.is_empty() || password.expose_secret().is_empty() {
            debug!("Registration rejected: empty field");
            return Err(AuthError::InvalidInput);
        }

        if !valid_username(&username) || !valid_email(&email) {
            debug!("Registration rejected: malformed email or username");
            return Err(AuthError::InvalidInput);
        }

        if !valid_password(password.expose_secret()) {
            debug!(username = %username, "Registration rejected: weak password");
            return Err(AuthError::WeakPassword);
        }

        let existing = self
            .directory
            .count_by_email_or_username(&email, &username)
            .await?;
        if existing > 0 {
            debug!(username = %username, "Registration rejected: email or username exists");
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = self.hash(password).await?;

        let user = NewUser {
            email,
            username,
            password_hash,
            is_active: self.activation.initial_active(),
            role: Role::User,
        };
        let username = user.username.clone();

        // The directory enforces uniqueness again on write; a concurrent
        // registration that passed the same pre-check ends up here.
        let id = self.directory.insert(user).await?;

        info!(user_id = %id, username = %username, "User registered");
        Ok(())
    }

    /// Authenticate by email or username and return a signed session token.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`] if no user matches or the password
    ///   is wrong (the two cases are indistinguishable to the caller),
    /// - [`AuthError::AccountInactive`] if the account is not active,
    /// - [`AuthError::DependencyUnavailable`] on directory, hashing or signing
    ///   failure.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: SecretString,
    ) -> Result<String, AuthError> {
        if identifier.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.directory.find_by_identifier(identifier).await? else {
            // Same bcrypt work as a wrong password, so timing does not reveal
            // whether the account exists.
            let digest = self.placeholder_digest().await?;
            self.verify(password, digest).await?;
            debug!(identifier = %identifier, "Login rejected: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            debug!(user_id = %user.id, "Login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        if !self.verify(password, user.password_hash.clone()).await? {
            debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id.to_string(), user.role)?;

        info!(user_id = %user.id, "Login successful");
        Ok(token)
    }

    /// Validate a session token issued by this service.
    ///
    /// # Errors
    /// Returns [`AuthError::TokenInvalid`] for bad signatures, malformed or
    /// expired tokens.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.tokens.verify(token)
    }

    // bcrypt is CPU-bound; keep it off the async workers.
    async fn hash(&self, password: SecretString) -> Result<String, AuthError> {
        let hasher = self.hasher;
        task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|err| {
                error!("Password hashing task failed: {}", err);
                AuthError::DependencyUnavailable
            })?
    }

    async fn placeholder_digest(&self) -> Result<String, AuthError> {
        self.placeholder_digest
            .get_or_try_init(|| self.hash(SecretString::from(PLACEHOLDER_PASSWORD.to_string())))
            .await
            .cloned()
    }

    async fn verify(&self, password: SecretString, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        task::spawn_blocking(move || hasher.verify(password.expose_secret(), &digest))
            .await
            .map_err(|err| {
                error!("Password verification task failed: {}", err);
                AuthError::DependencyUnavailable
            })
    }
}
