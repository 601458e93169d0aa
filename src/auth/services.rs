use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        repo_types::{DuplicateEmail, NewUser, Role, User, UserStatus},
    },
    config::AdminSeed,
    error::{AppError, AppResult, ValidationReason},
    state::AppState,
};

const MAX_NAME_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    // Verified against when there is no usable account, so every login pays for one Argon2 run.
    static ref DUMMY_HASH: String = hash_password("imagevault-dummy-password").unwrap_or_default();
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn auth_response(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let token = keys.sign(&user)?;
    Ok(AuthResponse {
        token,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
    })
}

#[instrument(skip(st, req), fields(email = %req.email))]
pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!("invalid email");
        return Err(ValidationReason::InvalidEmail.into());
    }
    if req.password.is_empty() {
        return Err(ValidationReason::EmptyPassword.into());
    }
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    if first_name.chars().count() > MAX_NAME_LEN || last_name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationReason::NameTooLong.into());
    }

    if st.users.email_exists(&email).await? {
        warn!("email already registered");
        return Err(AppError::Conflict);
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let user = st
        .users
        .create(NewUser {
            email,
            password_hash,
            first_name,
            last_name,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            if e.is::<DuplicateEmail>() {
                AppError::Conflict
            } else {
                AppError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, "user registered");
    auth_response(&JwtKeys::new(&st.config.jwt), user)
}

/// Unknown email, inactive account and wrong password all yield the same `Unauthorized`.
#[instrument(skip(st, req), fields(email = %req.email))]
pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let email = normalize_email(&req.email);

    let Some(user) = st.users.find_by_email(&email).await? else {
        let _ = verify_password_blocking(req.password, DUMMY_HASH.clone()).await;
        warn!("login unknown email");
        return Err(AppError::Unauthorized);
    };
    let password_ok = verify_password_blocking(req.password, user.password_hash.clone()).await?;
    if user.status != UserStatus::Active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(AppError::Unauthorized);
    }
    if !password_ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    info!(user_id = %user.id, "user logged in");
    auth_response(&JwtKeys::new(&st.config.jwt), user)
}

/// Creates the configured admin account unless an admin already exists.
pub async fn seed_admin(st: &AppState, seed: &AdminSeed) -> anyhow::Result<()> {
    if st.users.any_admin().await? {
        return Ok(());
    }
    let email = normalize_email(&seed.email);
    if st.users.email_exists(&email).await? {
        warn!(%email, "admin seed email belongs to a regular user; skipping");
        return Ok(());
    }
    let password_hash = hash_password_blocking(seed.password.clone()).await?;
    let admin = st
        .users
        .create(NewUser {
            email,
            password_hash,
            first_name: "Admin".into(),
            last_name: "User".into(),
            role: Role::Admin,
        })
        .await?;
    info!(user_id = %admin.id, email = %admin.email, "admin user seeded");
    Ok(())
}
