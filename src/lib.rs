//! # Raiko (credential issuance)
//!
//! `raiko` registers users, authenticates them and issues signed session
//! tokens.
//!
//! ## Registration
//!
//! A candidate needs a non-empty email, a username of 3 to 20 characters
//! without `@` and a password that passes the password policy (8 to 20 characters with at least
//! one uppercase letter, one lowercase letter, one digit and one of
//! `!@#$%^&*()`). Passwords are stored as bcrypt digests only.
//!
//! Email and username are unique across all records. The pre-insert check is
//! backed by unique constraints in the directory, so two concurrent signups
//! for the same identifier result in exactly one stored user.
//!
//! ## Authentication
//!
//! Login accepts either the email or the username. Unknown identifiers and
//! wrong passwords return the same `invalid credentials` error, and both run
//! one bcrypt verification, to prevent account enumeration.
//!
//! ## Session tokens
//!
//! Tokens are HS256 JWTs carrying the user id (`sub`), the role and an
//! expiration 24 hours after issuance by default. Rotating the signing key
//! invalidates every previously issued token.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
