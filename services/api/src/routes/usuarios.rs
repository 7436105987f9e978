use std::collections::HashMap;

use actix_web::{get, patch, post, put, web, HttpResponse};
use common::{AppError, Usuario};
use serde_json::{json, Value};

use crate::error::{datos_invalidos, HttpApiError};
use crate::fields;
use crate::state::AppState;
use crate::validate;

const MSG_ID_INVALIDO: &str = "Identificador inválido.";
const MSG_INEXISTENTE: &str = "El usuario indicado no existe.";
const MSG_CORREO_REGISTRADO: &str = "El correo electrónico ya está registrado.";

#[get("/usuarios")]
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, HttpApiError> {
    let activo = query.get("activo").and_then(|v| fields::normalize_bool_str(v));
    let id_medico = fields::param_positive_id(&query, fields::MEDICO_ID_ALIASES);
    let usuarios: Vec<Usuario> =
        db::list_usuarios(&data.db, activo, (id_medico > 0).then_some(id_medico))
            .await?
            .into_iter()
            .map(Usuario::from)
            .collect();
    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Listado de usuarios obtenido correctamente.",
        "usuarios": usuarios,
    })))
}

#[post("/usuarios")]
pub async fn create(
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let id_medico = fields::coalesce_medico_ref(&payload, None);
    let medico_existe = match id_medico {
        Some(id) => db::find_medico(&data.db, id).await?.is_some(),
        None => true,
    };

    let (campos, password) =
        validate::usuario_create(&payload, id_medico, medico_existe).map_err(datos_invalidos)?;

    let hash = auth::hash_password(&password)
        .map_err(|_| AppError::Internal("Error interno al crear el usuario.".to_string()))?;

    let usuario = db::insert_usuario(&data.db, campos, hash).await.map_err(|e| {
        HttpApiError::persistencia(e, MSG_CORREO_REGISTRADO, "Error interno al crear el usuario.")
    })?;
    tracing::info!(id = usuario.id, "usuario creado");
    Ok(HttpResponse::Created().json(json!({
        "estado": true,
        "mensaje": "Usuario creado correctamente.",
        "usuario": Usuario::from(usuario),
    })))
}

#[put("/usuarios/{id}")]
pub async fn update(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let id = path.into_inner();
    if id <= 0 {
        return Err(AppError::BadRequest(MSG_ID_INVALIDO.to_string()).into());
    }

    let actual = db::find_usuario(&data.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    let id_medico = fields::coalesce_medico_ref(&payload, actual.id_medico);
    let medico_existe = match id_medico {
        Some(id) => db::find_medico(&data.db, id).await?.is_some(),
        None => true,
    };

    let (campos, password) =
        validate::usuario_update(&payload, &actual, id_medico, medico_existe)
            .map_err(datos_invalidos)?;

    let hash = match password {
        Some(password) => Some(auth::hash_password(&password).map_err(|_| {
            AppError::Internal("Error interno al actualizar el usuario.".to_string())
        })?),
        None => None,
    };

    let usuario = db::update_usuario(&data.db, id, campos, hash)
        .await
        .map_err(|e| {
            HttpApiError::persistencia(
                e,
                MSG_CORREO_REGISTRADO,
                "Error interno al actualizar el usuario.",
            )
        })?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Usuario actualizado correctamente.",
        "usuario": Usuario::from(usuario),
    })))
}

#[patch("/usuarios/{id}/estado")]
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

    let usuario = db::update_usuario_estado(&data.db, id, activo)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_INEXISTENTE.to_string()))?;

    let mensaje = if activo {
        "Usuario activado correctamente."
    } else {
        "Usuario desactivado correctamente."
    };
    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": mensaje,
        "usuario": Usuario::from(usuario),
    })))
}
