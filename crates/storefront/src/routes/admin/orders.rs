//! Back-office order handling (staff).

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use pasteleria_core::{OrderStatus, PedidoId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{Pedido, PedidoConItems};
use crate::state::AppState;

/// `GET /api/admin/orders` query.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

/// `PUT /api/admin/orders/{id}/status` body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `GET /api/admin/orders?status=`
pub async fn list(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Pedido>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list(query.status)
            .await?,
    ))
}

/// `GET /api/admin/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    Path(id): Path<PedidoId>,
) -> Result<Json<PedidoConItems>> {
    OrderRepository::new(state.pool())
        .get_with_items(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("pedido no encontrado".to_string()))
}

/// `PUT /api/admin/orders/{id}/status`
///
/// Invalid transitions answer 409. Cancelling returns stock to the catalog.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<PedidoId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Pedido>> {
    let pedido = OrderRepository::new(state.pool())
        .transition(id, body.status)
        .await?;

    if pedido.status == OrderStatus::Cancelado {
        state.catalog().invalidate_all().await;
    }
    Ok(Json(pedido))
}
