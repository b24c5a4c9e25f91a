//! Field-level input validation.

use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum bcrypt input length in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MIN_PASSWORD_BYTES: usize = 8;
pub const MAX_USERNAME_CHARS: usize = 500;

/// Accumulates one message per offending field (first message wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record `message` for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn validate_email(errors: &mut FieldErrors, email: &str) {
    errors.check(!email.is_empty(), "email", "must be provided");
    errors.check(is_plausible_email(email), "email", "must be a valid email address");
}

pub fn validate_password(errors: &mut FieldErrors, password: &str) {
    errors.check(!password.is_empty(), "password", "must be provided");
    errors.check(
        password.len() >= MIN_PASSWORD_BYTES,
        "password",
        "must be at least 8 bytes long",
    );
    errors.check(
        password.len() <= MAX_PASSWORD_BYTES,
        "password",
        "must not be more than 72 bytes long",
    );
}

pub fn validate_username(errors: &mut FieldErrors, username: &str) {
    errors.check(!username.trim().is_empty(), "username", "must be provided");
    errors.check(
        username.chars().count() <= MAX_USERNAME_CHARS,
        "username",
        "must not be more than 500 characters long",
    );
}
