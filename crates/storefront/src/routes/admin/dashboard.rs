//! Back-office dashboard and contact inbox (staff).

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::Serialize;

use pasteleria_core::{Price, Role};

use crate::db::{ContactRepository, OrderRepository, ProductRepository, UserRepository};
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::ReporteContacto;
use crate::state::AppState;

/// `GET /api/admin/summary` response.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub products: i64,
    pub critical_products: i64,
    pub users: i64,
    pub customers: i64,
    pub orders: i64,
    pub orders_by_status: BTreeMap<&'static str, i64>,
    pub paid_revenue: i64,
    pub paid_revenue_display: String,
    pub contact_reports: usize,
}

/// `GET /api/admin/summary`
pub async fn summary(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<Summary>> {
    let pool = state.pool();
    let (products, critical_products) = ProductRepository::new(pool).counts().await?;
    let users = UserRepository::new(pool);
    let orders = OrderRepository::new(pool);

    let by_status = orders.counts_by_status().await?;
    let paid_revenue = orders.paid_revenue().await?;

    Ok(Json(Summary {
        products,
        critical_products,
        users: users.count(None).await?,
        customers: users.count(Some(Role::User)).await?,
        orders: by_status.iter().map(|(_, n)| n).sum(),
        orders_by_status: by_status
            .into_iter()
            .map(|(status, n)| (status.as_str(), n))
            .collect(),
        paid_revenue,
        paid_revenue_display: Price::clp(paid_revenue).display(),
        contact_reports: ContactRepository::new(pool).list().await?.len(),
    }))
}

/// `GET /api/admin/contact`
pub async fn contact_reports(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<Vec<ReporteContacto>>> {
    Ok(Json(ContactRepository::new(state.pool()).list().await?))
}
