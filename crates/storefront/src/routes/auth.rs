//! Authentication route handlers.
//!
//! Password registration and login. A successful login (or registration)
//! stores the user in the session and folds the guest cart into the user's
//! cart.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use pasteleria_core::Role;

use crate::db::{CartRepository, UserRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Usuario, session_keys};
use crate::services::{AuthService, Registro};
use crate::state::AppState;

/// `POST /api/auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub correo: String,
    pub password: String,
}

/// `POST /api/auth/register`
///
/// Creates a customer account and logs it in.
#[instrument(skip(state, session, registro), fields(correo = %registro.correo))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(registro): Json<Registro>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register(&registro, Role::User)
        .await?;
    start_session(&state, &session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/login`
#[instrument(skip(state, session, body), fields(correo = %body.correo))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginBody>,
) -> Result<Json<Usuario>> {
    let user = match AuthService::new(state.pool())
        .login(&body.correo, &body.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    start_session(&state, &session, &user).await?;
    Ok(Json(user))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "sesión cerrada" })))
}

/// `GET /api/auth/me`
///
/// Re-reads the account so profile and role changes show up immediately.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Usuario>> {
    if let Some(user) = UserRepository::new(state.pool()).get_by_id(current.id).await? {
        return Ok(Json(user));
    }

    // Account deleted while logged in.
    clear_current_user(&session).await?;
    Err(AppError::Unauthorized("debes iniciar sesión".to_string()))
}

/// Log `user` in on this session and merge any guest cart into theirs.
async fn start_session(state: &AppState, session: &Session, user: &Usuario) -> Result<()> {
    if let Some(guest_cart) = session.remove::<String>(session_keys::CART_ID).await? {
        let user_cart = CartRepository::new(state.pool())
            .ensure_for_user(user.id)
            .await?;
        state
            .cart_service()
            .merge_guest(&guest_cart, &user_cart)
            .await?;
    }

    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.correo.as_str()));
    tracing::info!(usuario_id = %user.id, role = %user.role, "User logged in");
    Ok(())
}
