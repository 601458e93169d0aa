use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo_types::{Role, UserStatus}};
use crate::{error::AppError, state::AppState};

/// Caller identity taken from a validated bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = JwtKeys::new(&state.config.jwt).verify(token)?;

        if state.config.jwt.check_account_status {
            match state.users.find_by_id(claims.sub).await? {
                Some(u) if u.status == UserStatus::Active => {}
                _ => {
                    warn!(user_id = %claims.sub, "token for missing or inactive account");
                    return Err(AppError::Unauthorized);
                }
            }
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// An [`AuthUser`] whose token carries the `Admin` role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            warn!(user_id = %user.id, "admin route denied");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{NewUser, User};
    use axum::http::Request;

    async fn seed(st: &AppState, role: Role) -> User {
        st.users
            .create(NewUser {
                email: format!("{}@x.com", Uuid::new_v4()),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                role,
            })
            .await
            .unwrap()
    }

    fn parts(token: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/");
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_or_bad_header_is_unauthorized() {
        let (st, _) = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts(None), &st).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        let err = AuthUser::from_request_parts(&mut parts(Some("garbage")), &st)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn admin_extractor_checks_role_claim() {
        let (st, _) = AppState::fake();
        let keys = JwtKeys::new(&st.config.jwt);
        let user = seed(&st, Role::User).await;
        let admin = seed(&st, Role::Admin).await;

        let token = keys.sign(&user).unwrap();
        let err = AdminUser::from_request_parts(&mut parts(Some(&token)), &st)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let token = keys.sign(&admin).unwrap();
        let AdminUser(caller) = AdminUser::from_request_parts(&mut parts(Some(&token)), &st)
            .await
            .unwrap();
        assert_eq!(caller.id, admin.id);
    }

    #[tokio::test]
    async fn banned_user_token_stays_valid_unless_status_check_enabled() {
        let (st, _) = AppState::fake();
        let user = seed(&st, Role::User).await;
        let token = JwtKeys::new(&st.config.jwt).sign(&user).unwrap();
        st.users.update_status(user.id, UserStatus::Banned).await.unwrap();

        let caller = AuthUser::from_request_parts(&mut parts(Some(&token)), &st)
            .await
            .unwrap();
        assert_eq!(caller.id, user.id);

        let strict = st.with_config(|c| c.jwt.check_account_status = true);
        let err = AuthUser::from_request_parts(&mut parts(Some(&token)), &strict)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
