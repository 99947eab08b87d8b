//! Contact form route handlers.
//!
//! Submissions are stored as `reportes_contacto` and read from the
//! back-office.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use pasteleria_core::Email;

use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::models::NuevoReporte;
use crate::state::AppState;

/// Longest accepted message, in characters.
const MAX_MENSAJE: usize = 2000;

/// Longest accepted name, in characters.
const MAX_NOMBRE: usize = 100;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub nombre: String,
    pub correo: String,
    pub mensaje: String,
}

impl ContactForm {
    fn validate(self) -> Result<NuevoReporte> {
        let nombre = self.nombre.trim();
        if nombre.is_empty() || nombre.chars().count() > MAX_NOMBRE {
            return Err(AppError::BadRequest(format!(
                "el nombre es obligatorio (máximo {MAX_NOMBRE} caracteres)"
            )));
        }

        let correo = Email::parse(&self.correo)
            .map_err(|_| AppError::BadRequest("correo inválido".to_string()))?;

        let mensaje = self.mensaje.trim();
        if mensaje.is_empty() || mensaje.chars().count() > MAX_MENSAJE {
            return Err(AppError::BadRequest(format!(
                "el mensaje es obligatorio (máximo {MAX_MENSAJE} caracteres)"
            )));
        }

        Ok(NuevoReporte {
            nombre: nombre.to_string(),
            correo,
            mensaje: mensaje.to_string(),
        })
    }
}

/// `POST /api/contact`
#[instrument(skip(state, form), fields(correo = %form.correo))]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<impl IntoResponse> {
    let reporte = ContactRepository::new(state.pool())
        .create(&form.validate()?)
        .await?;
    tracing::info!(reporte_id = %reporte.id, "Contact report received");
    Ok((StatusCode::CREATED, Json(reporte)))
}
