//! Password policy and identity field checks.

use regex::Regex;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 20;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Symbols accepted by the special-character requirement.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()";

/// Return `true` when the password is 8 to 20 characters long and contains at
/// least one uppercase ASCII letter, one lowercase ASCII letter, one ASCII
/// digit and one symbol from [`SPECIAL_CHARACTERS`].
#[must_use]
pub fn valid_password(password: &str) -> bool {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password.len()) {
        return false;
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    has_upper && has_lower && has_digit && has_special
}

/// Usernames are 3 to 20 characters and never contain `@`, so a username
/// can not collide with another account's email at login.
#[must_use]
pub fn valid_username(username: &str) -> bool {
    (MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username.chars().count())
        && !username.contains('@')
}

/// Lightweight email sanity check used before touching the directory.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
