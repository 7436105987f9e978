use std::collections::HashMap;

use actix_web::{get, post, web, HttpResponse};
use common::{AppError, Consulta};
use db::ConsultaInsert;
use serde_json::{json, Value};

use crate::error::{datos_invalidos, HttpApiError};
use crate::state::AppState;
use crate::validate;

#[post("/crear-consulta")]
pub async fn crear(
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let campos = validate::consulta(&payload).map_err(datos_invalidos)?;

    let resultado = db::insert_consulta(&data.db, campos).await.map_err(|e| {
        tracing::error!(error = %e, "no fue posible registrar la consulta");
        HttpApiError::from(AppError::Internal(
            "No fue posible registrar la consulta.".to_string(),
        ))
    })?;

    match resultado {
        ConsultaInsert::Creada(id) => {
            tracing::info!(id, "consulta registrada");
            Ok(HttpResponse::Created().json(json!({
                "estado": true,
                "mensaje": "Consulta registrada correctamente.",
                "idConsulta": id,
            })))
        }
        ConsultaInsert::MedicoInexistente => {
            Err(AppError::NotFound("El médico seleccionado no existe.".to_string()).into())
        }
        ConsultaInsert::PacienteInexistente => {
            Err(AppError::NotFound("El paciente seleccionado no existe.".to_string()).into())
        }
    }
}

#[get("/historial-consultas")]
pub async fn historial(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, HttpApiError> {
    let filtro = validate::historial(&query).map_err(|errores| {
        HttpApiError::from(AppError::Validation {
            mensaje: "Parámetros inválidos.".to_string(),
            errores,
        })
    })?;

    let con_fecha = data.schema.consulta_fecha_creacion;
    if (filtro.fecha_inicio.is_some() || filtro.fecha_fin.is_some()) && !con_fecha {
        return Err(AppError::BadRequest(
            "El filtrado por fechas no está disponible en la tabla consulta.".to_string(),
        )
        .into());
    }

    let consultas: Vec<Consulta> = db::list_historial(&data.db, filtro, con_fecha)
        .await?
        .into_iter()
        .map(Consulta::from)
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Historial de consultas obtenido correctamente.",
        "consultas": consultas,
    })))
}
