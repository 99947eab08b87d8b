//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user (and optionally a
//! back-office role) in route handlers. The session only names the account;
//! its role is read from the database on every request. Rejections are JSON,
//! matching the rest of the API.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use pasteleria_core::Role;

use crate::db::UserRepository;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hola, {}!", user.nombre)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an `admin` or `vendedor` account.
pub struct RequireStaff(pub CurrentUser);

/// Extractor that requires an `admin` account.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when a request lacks the required identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No user in the session.
    Unauthorized,
    /// Logged in, but the role is not allowed.
    Forbidden,
    /// The account could not be loaded.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "debes iniciar sesión" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "no tienes permisos para esta acción" })),
            )
                .into_response(),
            Self::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

/// Read the current user from the session, then re-read the account.
///
/// Role and profile changes made by an admin apply on the next request. A
/// session whose account no longer exists is flushed and treated as logged
/// out.
async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(stored) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let account = UserRepository::new(state.pool())
        .get_by_id(stored.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, usuario_id = %stored.id, "Failed to load session account");
            AuthRejection::Unavailable
        })?;

    let Some(account) = account else {
        tracing::info!(usuario_id = %stored.id, "Session account no longer exists");
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to flush stale session");
        }
        return Ok(None);
    };

    let current = CurrentUser::from(&account);
    if current != stored
        && let Err(e) = session.insert(session_keys::CURRENT_USER, &current).await
    {
        tracing::warn!(error = %e, usuario_id = %current.id, "Failed to refresh session user");
    }
    Ok(Some(current))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts, &AppState::from_ref(state))
            .await?
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, &AppState::from_ref(state))
            .await?
            .ok_or(AuthRejection::Unauthorized)?;
        if !user.role.is_staff() {
            tracing::debug!(usuario_id = %user.id, role = %user.role, "Staff route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, &AppState::from_ref(state))
            .await?
            .ok_or(AuthRejection::Unauthorized)?;
        if user.role != Role::Admin {
            tracing::debug!(usuario_id = %user.id, role = %user.role, "Admin route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts, &AppState::from_ref(state)).await?))
    }
}

/// Helper to set the current user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the session on logout.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
