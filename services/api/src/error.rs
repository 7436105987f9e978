use actix_web::{HttpResponse, ResponseError};
use common::{AppError, Errores};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpApiError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("db error: {0}")]
    Db(#[from] db::DbError),
}

impl HttpApiError {
    /// Triage for a failed write: 409 when the driver reports a unique
    /// constraint we declared, otherwise 500 with the endpoint's message.
    pub fn persistencia(err: db::DbError, conflicto: &str, interno: &str) -> Self {
        if let Some((campo, detalle)) = db::unique_conflict(&err) {
            let mut errores = Errores::new();
            errores.insert(campo.to_string(), detalle.to_string());
            return HttpApiError::App(AppError::Conflict {
                mensaje: conflicto.to_string(),
                errores,
            });
        }
        tracing::error!(error = %err, "fallo de persistencia");
        HttpApiError::App(AppError::Internal(interno.to_string()))
    }
}

pub fn datos_invalidos(errores: Errores) -> HttpApiError {
    HttpApiError::App(AppError::Validation {
        mensaje: "Datos inválidos.".to_string(),
        errores,
    })
}

fn envelope(mensaje: &str, errores: Option<&Errores>) -> serde_json::Value {
    match errores {
        Some(errores) => json!({"estado": false, "mensaje": mensaje, "errores": errores}),
        None => json!({"estado": false, "mensaje": mensaje}),
    }
}

impl ResponseError for HttpApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::App(AppError::Validation { mensaje, errores }) => {
                HttpResponse::BadRequest().json(envelope(mensaje, Some(errores)))
            }
            Self::App(AppError::BadRequest(mensaje)) => {
                HttpResponse::BadRequest().json(envelope(mensaje, None))
            }
            Self::App(AppError::Unauthorized(mensaje)) => {
                HttpResponse::Unauthorized().json(envelope(mensaje, None))
            }
            Self::App(AppError::NotFound(mensaje)) => {
                HttpResponse::NotFound().json(envelope(mensaje, None))
            }
            Self::App(AppError::Conflict { mensaje, errores }) => {
                HttpResponse::Conflict().json(envelope(mensaje, Some(errores)))
            }
            Self::App(AppError::Internal(mensaje)) => {
                HttpResponse::InternalServerError().json(envelope(mensaje, None))
            }
            Self::Db(err) => {
                tracing::error!(error = %err, "fallo de base de datos");
                HttpResponse::InternalServerError().json(envelope("Error interno.", None))
            }
        }
    }
}
