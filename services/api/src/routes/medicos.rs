use std::collections::HashMap;

use actix_web::{get, patch, post, put, web, HttpResponse};
use common::{AppError, Medico};
use serde_json::{json, Value};

use crate::error::{datos_invalidos, HttpApiError};
use crate::state::AppState;
use crate::validate;
use crate::fields;

const MSG_ID_INVALIDO: &str = "Identificador inválido.";
const MSG_INEXISTENTE: &str = "El médico indicado no existe.";

#[get("/medicos")]
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, HttpApiError> {
    // An unrecognizable ?activo= is no filter at all, not an error.
    let activo = query.get("activo").and_then(|v| fields::normalize_bool_str(v));
    let medicos: Vec<Medico> = db::list_medicos(&data.db, activo)
        .await?
        .into_iter()
        .map(Medico::from)
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Listado de médicos obtenido correctamente.",
        "medicos": medicos,
    })))
}

#[post("/medicos")]
pub async fn create(
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let campos = validate::medico(&payload, None).map_err(datos_invalidos)?;
    let medico = db::insert_medico(&data.db, campos).await.map_err(|e| {
        HttpApiError::persistencia(
            e,
            "No fue posible crear el médico.",
            "Error interno al crear el médico.",
        )
    })?;
    tracing::info!(id = medico.id, "médico creado");
    Ok(HttpResponse::Created().json(json!({
        "estado": true,
        "mensaje": "Médico creado correctamente.",
        "medico": Medico::from(medico),
    })))
}

#[put("/medicos/{id}")]
pub async fn update(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    if id <= 0 {
        return Err(AppError::BadRequest(MSG_ID_INVALIDO.to_string()).into());
    }

    let actual = db::find_medico(&data.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    let campos = validate::medico(&payload, Some(&actual)).map_err(datos_invalidos)?;
    let medico = db::update_medico(&data.db, id, campos)
        .await
        .map_err(|e| {
            HttpApiError::persistencia(
                e,
                "No fue posible actualizar el médico.",
                "Error interno al actualizar el médico.",
            )
        })?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Médico actualizado correctamente.",
        "medico": Medico::from(medico),
    })))
}

#[patch("/medicos/{id}/estado")]
pub async fn estado(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    if id <= 0 {
        return Err(AppError::BadRequest(MSG_ID_INVALIDO.to_string()).into());
    }

    let activo = match validate::estado(&payload) {
        Ok(activo) => activo,
        Err(validate::EstadoError::Falta) => {
            return Err(AppError::BadRequest("Debe indicar el estado activo.".to_string()).into());
        }
        Err(validate::EstadoError::Invalido) => {
            return Err(AppError::BadRequest("El estado activo es inválido.".to_string()).into());
        }
    };

    let medico = db::update_medico_estado(&data.db, id, activo)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    let mensaje = if activo {
        "Médico activado correctamente."
    } else {
        "Médico desactivado correctamente."
    };
    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": mensaje,
        "medico": Medico::from(medico),
    })))
}
