use axum::{async_trait, extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::token::parse_authorization;
use crate::db::{orders::OrderScope, users};
use crate::{AppState, ShopError};

/// Staff roles granted through group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Group { Manager, DeliveryCrew }

impl Group {
    pub fn db_name(&self) -> &'static str {
        match self { Self::Manager => "manager", Self::DeliveryCrew => "delivery_crew" }
    }

    pub fn from_db(name: &str) -> Option<Self> {
        match name { "manager" => Some(Self::Manager), "delivery_crew" => Some(Self::DeliveryCrew), _ => None }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: Vec<Group>,
    pub token_id: Uuid,
    pub token_expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn in_group(&self, group: Group) -> bool { self.groups.contains(&group) }

    pub fn is_admin(&self) -> bool { self.is_staff || self.is_superuser }

    pub fn is_manager(&self) -> bool { self.is_superuser || self.in_group(Group::Manager) }

    pub fn is_delivery_crew(&self) -> bool { self.in_group(Group::DeliveryCrew) }

    /// Admins may act on anyone's resources.
    pub fn can_access(&self, owner_id: i64) -> bool { self.user_id == owner_id || self.is_admin() }

    pub fn require_admin(&self) -> Result<(), ShopError> {
        if self.is_admin() { Ok(()) } else { Err(forbidden()) }
    }

    pub fn order_scope(&self) -> OrderScope {
        if self.is_admin() || self.is_manager() {
            OrderScope::All
        } else if self.is_delivery_crew() {
            OrderScope::DeliveryCrew(self.user_id)
        } else {
            OrderScope::Customer(self.user_id)
        }
    }
}

pub fn forbidden() -> ShopError {
    ShopError::Forbidden("You do not have permission to perform this action.".into())
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
            .ok_or_else(|| ShopError::Unauthorized("Authentication credentials were not provided.".into()))?;
        let token = parse_authorization(header)
            .ok_or_else(|| ShopError::Unauthorized("Authorization header must contain two space-delimited values".into()))?;
        let claims = state.tokens.verify(token)?;
        let user_id = claims.user_id()
            .ok_or_else(|| ShopError::Unauthorized("Token contained no recognizable user identification".into()))?;

        if users::is_revoked(&state.db, claims.jti).await? {
            return Err(ShopError::Unauthorized("Token is blacklisted".into()));
        }
        let user = users::find(&state.db, user_id).await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ShopError::Unauthorized("User not found".into()))?;
        let groups = users::groups_of(&state.db, user.id).await?;

        Ok(Principal {
            user_id: user.id,
            email: user.email,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            groups,
            token_id: claims.jti,
            token_expires_at: claims.expires_at(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn principal(user_id: i64, staff: bool, groups: Vec<Group>) -> Principal {
        Principal {
            user_id, email: format!("user{user_id}@example.com"), is_staff: staff, is_superuser: false, groups,
            token_id: Uuid::new_v4(), token_expires_at: Utc::now(),
        }
    }

    #[test]
    fn order_scope_by_role() {
        assert_eq!(principal(1, false, vec![]).order_scope(), OrderScope::Customer(1));
        assert_eq!(principal(2, false, vec![Group::DeliveryCrew]).order_scope(), OrderScope::DeliveryCrew(2));
        assert_eq!(principal(3, false, vec![Group::Manager]).order_scope(), OrderScope::All);
        assert_eq!(principal(4, true, vec![]).order_scope(), OrderScope::All);
    }

    #[test]
    fn ownership_and_admin_override() {
        let customer = principal(5, false, vec![]);
        assert!(customer.can_access(5));
        assert!(!customer.can_access(6));
        assert!(principal(7, true, vec![]).can_access(6));
        assert!(customer.require_admin().is_err());
    }

    #[test]
    fn superuser_counts_as_manager() {
        let mut p = principal(8, false, vec![]);
        assert!(!p.is_manager());
        p.is_superuser = true;
        assert!(p.is_manager());
        assert!(p.is_admin());
    }

    #[test]
    fn group_names() {
        assert_eq!(Group::from_db("delivery_crew"), Some(Group::DeliveryCrew));
        assert_eq!(Group::from_db(Group::Manager.db_name()), Some(Group::Manager));
        assert_eq!(Group::from_db("admins"), None);
    }
}
