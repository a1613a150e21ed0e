use thiserror::Error;

/// Classified failure returned by every auth operation.
///
/// Messages are safe to return to callers: they never include digests,
/// passwords, or which identifier field failed to match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid input")]
    InvalidInput,
    #[error("password does not meet the password policy")]
    WeakPassword,
    #[error("email or username already exists")]
    DuplicateIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is not active")]
    AccountInactive,
    #[error("dependency unavailable")]
    DependencyUnavailable,
    #[error("request timed out")]
    Timeout,
    #[error("invalid token")]
    TokenInvalid,
}

impl AuthError {
    /// Operational incidents, as opposed to expected user-input outcomes.
    #[must_use]
    pub const fn is_incident(&self) -> bool {
        matches!(self, Self::DependencyUnavailable)
    }
}

/// Storage-layer failure reported by a [`super::UserDirectory`].
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("email or username already exists")]
    Duplicate,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Duplicate => Self::DuplicateIdentity,
            DirectoryError::Unavailable(_) => Self::DependencyUnavailable,
        }
    }
}
