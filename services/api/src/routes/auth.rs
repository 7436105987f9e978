use actix_web::{post, web, HttpResponse};
use common::AppError;
use serde_json::{json, Value};

use crate::error::HttpApiError;
use crate::state::AppState;
use crate::validate;

#[post("/iniciar-sesion")]
pub async fn iniciar_sesion(
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, HttpApiError> {
    let credenciales = validate::login(&payload)
        .map_err(|mensaje| HttpApiError::from(AppError::BadRequest(mensaje)))?;

    let guardado = db::find_password_by_correo(&data.db, &credenciales.correo).await?;
    let autenticado = guardado
        .map(|hash| auth::verify_password(&credenciales.password, &hash))
        .unwrap_or(false);

    if !autenticado {
        // Same message whether the account is unknown or the password is
        // wrong; nothing leaks which one it was.
        tracing::info!(correo = %credenciales.correo, "inicio de sesión rechazado");
        return Err(AppError::Unauthorized("Usuario y/o Contraseña incorrecta".to_string()).into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "estado": true,
        "mensaje": "Operacion exitosa",
    })))
}
