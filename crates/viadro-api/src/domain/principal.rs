//! Request identity and the authentication gates built on it.

use crate::domain::types::{User, UserId};

/// Resolved identity of a request.
///
/// Anonymous is a variant, not a user id, so it can never be mistaken for an
/// owner.
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    Authenticated(User),
}

/// Why a principal failed a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Authenticated(u) if u.is_admin)
    }

    pub fn is_activated(&self) -> bool {
        matches!(self, Principal::Authenticated(u) if u.activated)
    }

    /// True only for the authenticated user with this id.
    pub fn owns(&self, owner: UserId) -> bool {
        matches!(self, Principal::Authenticated(u) if u.id == owner)
    }

    /// Reject anonymous principals.
    pub fn require_authenticated(&self) -> Result<&User, AccessError> {
        self.user().ok_or(AccessError::AuthenticationRequired)
    }

    /// Authenticated and activated.
    pub fn require_activated(&self) -> Result<&User, AccessError> {
        let user = self.require_authenticated()?;
        if !user.activated {
            return Err(AccessError::InactiveAccount);
        }
        Ok(user)
    }

    /// Activated administrator.
    pub fn require_admin(&self) -> Result<&User, AccessError> {
        let user = self.require_activated()?;
        if !user.is_admin {
            return Err(AccessError::NotPermitted);
        }
        Ok(user)
    }
}
