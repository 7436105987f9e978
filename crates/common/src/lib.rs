use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field name -> human readable message, as it appears under `errores`
/// in the response envelope.
pub type Errores = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medico {
    pub id: i64,
    pub primer_nombre: String,
    pub segundo_nombre: Option<String>,
    pub apellido_paterno: String,
    pub apellido_materno: Option<String>,
    pub cedula: String,
    pub telefono: Option<String>,
    pub especialidad: String,
    pub email: Option<String>,
    pub activo: bool,
    pub fecha_creacion: DateTime<Utc>,
}

/// Account record. The stored password hash never leaves the storage layer,
/// so there is no field to hide here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub correo: String,
    pub nombre_completo: Option<String>,
    pub id_medico: Option<i64>,
    pub activo: bool,
    pub fecha_creacion: DateTime<Utc>,
}

/// Medico summary embedded in a consultation listing. Narrower than
/// [`Medico`]: no cedula, no creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultaMedico {
    pub id: i64,
    pub primer_nombre: String,
    pub segundo_nombre: Option<String>,
    pub apellido_paterno: String,
    pub apellido_materno: Option<String>,
    pub telefono: Option<String>,
    pub especialidad: String,
    pub email: Option<String>,
    pub activo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultaPaciente {
    pub id: i64,
    pub primer_nombre: String,
    pub segundo_nombre: Option<String>,
    pub apellido_paterno: String,
    pub apellido_materno: Option<String>,
    pub telefono: Option<String>,
    pub activo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consulta {
    pub id: i64,
    pub id_medico: i64,
    pub id_paciente: i64,
    pub sintomas: String,
    pub recomendaciones: Option<String>,
    pub diagnostico: Option<String>,
    pub medico: ConsultaMedico,
    pub paciente: ConsultaPaciente,
    /// Only present when the consulta table carries the column; older
    /// deployments omit the key entirely rather than sending null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{mensaje}")]
    Validation { mensaje: String, errores: Errores },
    #[error("{0}")]
    NotFound(String),
    #[error("{mensaje}")]
    Conflict { mensaje: String, errores: Errores },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
