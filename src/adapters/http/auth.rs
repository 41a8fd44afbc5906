//! Caller identity extracted from request headers.
//!
//! Identity issuance lives in front of this service. The gateway forwards
//! the authenticated user as `X-User-Id` (a UUID) and `X-User-Role`
//! (`admin`, `mentor` or `mentee`).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{MentorId, UserId};

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Mentor,
    Mentee,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "mentor" => Some(Role::Mentor),
            "mentee" => Some(Role::Mentee),
            _ => None,
        }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.id)
    }

    /// Mentors are users; their ledger id is their user id.
    pub fn mentor_id(&self) -> MentorId {
        MentorId::from_uuid(self.id)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("{:?} role required", role)))
        }
    }

    /// Admins, or the mentor the resource belongs to.
    pub fn require_admin_or_mentor(&self, mentor_id: MentorId) -> Result<(), ApiError> {
        if self.is_admin() || (self.role == Role::Mentor && self.id == *mentor_id.as_uuid()) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to access this mentor's ledger"))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let id = header(USER_ID_HEADER)
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication is required"))?;
        let role = header(USER_ROLE_HEADER)
            .and_then(|s| Role::parse(&s))
            .ok_or_else(|| ApiError::unauthorized("A valid user role is required"))?;

        Ok(AuthenticatedUser { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<AuthenticatedUser, ApiError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthenticatedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_user_and_role() {
        let id = Uuid::new_v4();
        let user = extract(&[(USER_ID_HEADER, &id.to_string()), (USER_ROLE_HEADER, "Mentor")])
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Mentor);
        assert_eq!(*user.mentor_id().as_uuid(), id);
    }

    #[tokio::test]
    async fn missing_or_bad_headers_are_unauthorized() {
        let err = extract(&[]).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        let err = extract(&[(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "admin")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        let id = Uuid::new_v4().to_string();
        let err = extract(&[(USER_ID_HEADER, &id), (USER_ROLE_HEADER, "root")])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn mentors_only_reach_their_own_ledger() {
        let mentor = AuthenticatedUser {
            id: Uuid::new_v4(),
            role: Role::Mentor,
        };
        assert!(mentor.require_admin_or_mentor(mentor.mentor_id()).is_ok());
        assert!(mentor.require_admin_or_mentor(MentorId::new()).is_err());
        assert!(mentor.require_admin().is_err());
    }
}
