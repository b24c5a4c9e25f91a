//! Document access policy.
//!
//! Pure functions of `(Principal, Document)`. Admin is an unconditional
//! override; anonymous principals never own anything, so hidden documents are
//! always denied to them.

use crate::domain::principal::{AccessError, Principal};
use crate::domain::types::{Document, UserId, Visibility};

/// May `principal` see `document`?
pub fn can_read(principal: &Principal, document: &Document) -> bool {
    document.is_public() || principal.owns(document.owner_id) || principal.is_admin()
}

/// May `principal` delete `document` or toggle its visibility?
pub fn can_mutate(principal: &Principal, document: &Document) -> bool {
    principal.owns(document.owner_id) || principal.is_admin()
}

/// Which listing the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// Every public document.
    Public,
    /// Every document owned by the caller, hidden ones included.
    Mine,
    /// Public documents not owned by the caller.
    Others,
    /// Everything, for administrators.
    Admin,
}

/// Owner constraint of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    Any,
    Only(UserId),
    Except(UserId),
}

/// Effective row filter of a listing. Together with the viewer it is the read
/// scope the response cache keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub visibility: Option<Visibility>,
    pub owner: OwnerFilter,
}

impl ListFilter {
    pub fn matches(&self, document: &Document) -> bool {
        let visibility_ok = self
            .visibility
            .map_or(true, |v| document.visibility == v);
        let owner_ok = match self.owner {
            OwnerFilter::Any => true,
            OwnerFilter::Only(id) => document.owner_id == id,
            OwnerFilter::Except(id) => document.owner_id != id,
        };
        visibility_ok && owner_ok
    }
}

/// Resolve the row filter for a listing, enforcing the gate each scope needs.
pub fn list_filter(principal: &Principal, scope: ListingScope) -> Result<ListFilter, AccessError> {
    match scope {
        ListingScope::Public => Ok(ListFilter {
            visibility: Some(Visibility::Public),
            owner: OwnerFilter::Any,
        }),
        ListingScope::Mine => {
            let user = principal.require_activated()?;
            Ok(ListFilter {
                visibility: None,
                owner: OwnerFilter::Only(user.id),
            })
        }
        ListingScope::Others => {
            let user = principal.require_activated()?;
            Ok(ListFilter {
                visibility: Some(Visibility::Public),
                owner: OwnerFilter::Except(user.id),
            })
        }
        ListingScope::Admin => {
            principal.require_admin()?;
            Ok(ListFilter {
                visibility: None,
                owner: OwnerFilter::Any,
            })
        }
    }
}
