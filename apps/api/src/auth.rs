//! Caller identity, asserted by the upstream auth gateway.
//!
//! The gateway authenticates the session and forwards `X-User-Id` and
//! `X-User-Role`. Requests without both headers are rejected with 401.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRole;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_recruiter(&self) -> bool {
        self.role == UserRole::Recruiter
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Unauthorized)?;
        let role = header_value(parts, USER_ROLE_HEADER)
            .and_then(|v| v.parse::<UserRole>().ok())
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<CurrentUser, AppError> {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_headers() {
        let id = Uuid::new_v4();
        let user = extract(&[
            (USER_ID_HEADER, id.to_string().as_str()),
            (USER_ROLE_HEADER, "Recruiter"),
        ])
        .await
        .unwrap();
        assert_eq!(user.id, id);
        assert!(user.is_recruiter());
    }

    #[tokio::test]
    async fn test_missing_or_bad_headers_are_unauthorized() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(extract(&[]).await, Err(AppError::Unauthorized)));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, id.as_str())]).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "admin")]).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, id.as_str()), (USER_ROLE_HEADER, "superuser")]).await,
            Err(AppError::Unauthorized)
        ));
    }
}
