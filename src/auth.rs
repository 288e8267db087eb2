use std::ops::Deref;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use rand_core::OsRng;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Profile, Role},
    state::AppState,
};

const USER_KEY: &str = "user_id";
const MIN_PASSWORD_LEN: usize = 8;

/// The authenticated caller, resolved from the session cookie.
///
/// A request with no session, an unparseable one, or one whose profile
/// no longer resolves is treated as signed out rather than failed.
pub struct AuthUser(pub Profile);

impl Deref for AuthUser {
    type Target = Profile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id = session
            .get::<Uuid>(USER_KEY)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized.into_response())?;

        let profile = Profile::by_id(&state.db_pool, user_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized.into_response())?;

        Ok(Self(profile))
    }
}

/// An [`AuthUser`] that additionally holds the teacher role.
pub struct TeacherUser(pub Profile);

impl Deref for TeacherUser {
    type Target = Profile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for TeacherUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(profile) = AuthUser::from_request_parts(parts, state).await?;

        if profile.role != Role::Teacher {
            return Err(AppError::Forbidden.into_response());
        }

        Ok(Self(profile))
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(sqlx::FromRow)]
struct Identity {
    id: Uuid,
    password_hash: String,
}

#[derive(Deserialize)]
struct RegisterForm {
    name: String,
    email: String,
    password: String,
    role: Role,
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    // all local validation happens before any database round trip
    if form.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    if !form.email.contains('@') {
        return Err(AppError::validation("email address is not valid"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&form.password)?;
    let user_id = Uuid::new_v4();
    let now = Utc::now().naive_utc();

    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(&form.email)
        .bind(&password_hash)
        .bind(now)
        .execute(&state.db_pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists => AppError::DuplicateEmail,
            other => other,
        })?;

    let profile = Profile {
        id: user_id,
        name: form.name,
        email: form.email,
        role: form.role,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };

    // The identity row exists at this point. A profile failure is
    // reported as such, not papered over and not compensated.
    if let Err(e) = profile.insert(&state.db_pool).await {
        tracing::error!(user_id = %user_id, error = %e, "profile insert failed after identity create");
        return Err(AppError::ProfileIncomplete);
    }

    session.insert(USER_KEY, user_id).await?;
    tracing::info!(user_id = %user_id, role = ?profile.role, "registered");

    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<Profile>, AppError> {
    let identity: Option<Identity> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(&form.email)
            .fetch_optional(&state.db_pool)
            .await?;

    // Any failure from here on returns before the session is touched,
    // so a previously established login survives a bad attempt.
    let Some(identity) = identity else {
        return Err(AppError::Credentials);
    };
    if !verify_password(&form.password, &identity.password_hash) {
        return Err(AppError::Credentials);
    }

    let profile = Profile::by_id(&state.db_pool, identity.id)
        .await?
        .ok_or(AppError::ProfileIncomplete)?;

    session.insert(USER_KEY, profile.id).await?;
    tracing::info!(user_id = %profile.id, "logged in");

    Ok(Json(profile))
}

async fn logout(session: Session) -> StatusCode {
    session.clear().await;
    // local state is gone either way; a store failure only means the
    // dead record lingers until expiry
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "session store flush failed during logout");
    }

    StatusCode::NO_CONTENT
}

/// The restoration check a client runs on startup: resolves the cookie
/// to the current user, or 401 for "no session".
async fn current_session(auth: AuthUser) -> Json<Profile> {
    Json(auth.0)
}

#[derive(Deserialize)]
struct UpdateProfileForm {
    name: Option<String>,
    avatar_url: Option<String>,
}

async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(form): Json<UpdateProfileForm>,
) -> Result<Json<Profile>, AppError> {
    if form.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::validation("name must not be empty"));
    }

    let now = Utc::now().naive_utc();
    Profile::update(
        &state.db_pool,
        auth.id,
        form.name.as_deref(),
        form.avatar_url.as_deref(),
        now,
    )
    .await?;

    let profile = Profile::by_id(&state.db_pool, auth.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(profile))
}

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(current_session))
        .route("/auth/profile", patch(update_profile))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
