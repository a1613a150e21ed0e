//! Authentication core: password policy, hashing, session tokens, the user
//! directory contract and the workflow that ties them together.
//!
//! The core knows nothing about HTTP. Transports construct an
//! [`AuthWorkflow`] once at startup and call [`AuthWorkflow::register`] and
//! [`AuthWorkflow::authenticate`] per request.

mod clock;
mod directory;
mod error;
mod hasher;
mod models;
mod password;
pub mod postgres;
mod token;
mod workflow;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{InMemoryDirectory, UserDirectory};
pub use error::{AuthError, DirectoryError};
pub use hasher::CredentialHasher;
pub use models::{Candidate, NewUser, Role, SessionClaims, UserRecord};
pub use password::{valid_email, valid_password, valid_username, SPECIAL_CHARACTERS};
pub use postgres::PgDirectory;
pub use token::{TokenIssuer, DEFAULT_TOKEN_TTL};
pub use workflow::{ActivationPolicy, AuthWorkflow};
