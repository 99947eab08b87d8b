//! Cart route handlers.
//!
//! A logged-in user's cart is keyed by their account; a guest's cart id lives
//! in the session and is only created by the first mutation (or an SSE
//! subscription). Every mutation answers with the full cart view and the
//! `X-Cart-Updated: 1` header, and notifies `/api/cart/events` subscribers.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use pasteleria_core::PastelId;

use crate::db::CartRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::events::{CART_UPDATED, CartUpdated};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::CartView;
use crate::state::AppState;

/// Header set on every cart mutation response.
pub const CART_UPDATED_HEADER: HeaderName = HeaderName::from_static("x-cart-updated");

// =============================================================================
// Request Types
// =============================================================================

/// `POST /api/cart/items` body.
#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub pastel_id: PastelId,
    #[serde(default = "default_cantidad")]
    pub cantidad: i64,
}

const fn default_cantidad() -> i64 {
    1
}

/// `PUT /api/cart/items/{pastel_id}` body.
#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub cantidad: i64,
}

fn quantity(cantidad: i64) -> Result<u32> {
    u32::try_from(cantidad)
        .map_err(|_| AppError::BadRequest("la cantidad no puede ser negativa".to_string()))
}

// =============================================================================
// Cart Identity
// =============================================================================

/// The cart this request refers to, if one exists already.
pub(crate) async fn existing_cart_id(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Option<String>> {
    match user {
        Some(user) => Ok(CartRepository::new(state.pool())
            .find_for_user(user.id)
            .await?),
        None => Ok(session.get::<String>(session_keys::CART_ID).await?),
    }
}

/// The cart this request refers to, created when missing.
pub(crate) async fn ensure_cart_id(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<String> {
    let carts = CartRepository::new(state.pool());
    if let Some(user) = user {
        return Ok(carts.ensure_for_user(user.id).await?);
    }

    if let Some(cart_id) = session.get::<String>(session_keys::CART_ID).await? {
        carts.ensure_guest(&cart_id).await?;
        return Ok(cart_id);
    }

    let cart_id = Uuid::new_v4().to_string();
    carts.ensure_guest(&cart_id).await?;
    session.insert(session_keys::CART_ID, &cart_id).await?;
    tracing::debug!(cart_id = %cart_id, "Guest cart created");
    Ok(cart_id)
}

fn updated(view: CartView) -> Response {
    (
        [(CART_UPDATED_HEADER, HeaderValue::from_static("1"))],
        Json(view),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart`
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let view = match existing_cart_id(&state, &session, user.as_ref()).await? {
        Some(cart_id) => state.cart_service().view(&cart_id).await?,
        None => CartView::empty(),
    };
    Ok(Json(view))
}

/// `GET /api/cart/count`
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<serde_json::Value>> {
    let count = match existing_cart_id(&state, &session, user.as_ref()).await? {
        Some(cart_id) => state.cart_service().count(&cart_id).await?,
        None => 0,
    };
    Ok(Json(json!({ "count": count })))
}

/// `POST /api/cart/items`
#[instrument(skip(state, user, session))]
pub async fn add_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<AddItem>,
) -> Result<Response> {
    let cantidad = quantity(body.cantidad)?;
    let cart_id = ensure_cart_id(&state, &session, user.as_ref()).await?;
    let view = state
        .cart_service()
        .add(&cart_id, body.pastel_id, cantidad)
        .await?;

    let pastel_id = body.pastel_id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("pastel_id", pastel_id.as_str())]));
    Ok(updated(view))
}

/// `PUT /api/cart/items/{pastel_id}`
#[instrument(skip(state, user, session))]
pub async fn set_quantity(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(pastel_id): Path<PastelId>,
    Json(body): Json<SetQuantity>,
) -> Result<Response> {
    let cantidad = quantity(body.cantidad)?;
    let cart_id = ensure_cart_id(&state, &session, user.as_ref()).await?;
    let view = state
        .cart_service()
        .set_quantity(&cart_id, pastel_id, cantidad)
        .await?;
    Ok(updated(view))
}

/// `DELETE /api/cart/items/{pastel_id}`
#[instrument(skip(state, user, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(pastel_id): Path<PastelId>,
) -> Result<Response> {
    let cart_id = ensure_cart_id(&state, &session, user.as_ref()).await?;
    let view = state.cart_service().remove(&cart_id, pastel_id).await?;
    Ok(updated(view))
}

/// `DELETE /api/cart`
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Response> {
    let cart_id = ensure_cart_id(&state, &session, user.as_ref()).await?;
    let view = state.cart_service().clear(&cart_id).await?;
    Ok(updated(view))
}

/// `GET /api/cart/events`
///
/// Opens with the current count, then emits `cartUpdated` whenever the same
/// cart changes from any request.
pub async fn events(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let cart_id = ensure_cart_id(&state, &session, user.as_ref()).await?;
    // Subscribe before reading so no change slips between the two
    let changes = state.cart_events().subscribe(cart_id.clone());
    let current = state.cart_service().count(&cart_id).await?;
    tracing::debug!(cart_id = %cart_id, "Cart event stream opened");

    let initial = CartUpdated {
        cart_id: cart_id.as_str().into(),
        item_count: current,
    };
    let updates = stream::once(async move { initial })
        .chain(changes)
        .map(|update| Ok::<_, Infallible>(cart_event(&update)));

    Ok(Sse::new(updates).keep_alive(KeepAlive::default()))
}

fn cart_event(update: &CartUpdated) -> Event {
    Event::default()
        .event(CART_UPDATED)
        .data(json!({ "item_count": update.item_count }).to_string())
}
