//! Contact form reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pasteleria_core::{Email, ReporteId};

/// A stored contact form submission.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReporteContacto {
    pub id: ReporteId,
    pub nombre: String,
    pub correo: Email,
    pub mensaje: String,
    pub created_at: DateTime<Utc>,
}

/// Validated contact form submission.
#[derive(Debug, Clone)]
pub struct NuevoReporte {
    pub nombre: String,
    pub correo: Email,
    pub mensaje: String,
}
