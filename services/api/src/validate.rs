//! Per-endpoint rule sets. Every applicable check runs and every failure
//! lands in the field->message map; a non-empty map means the handler
//! answers 400 and nothing is written.

use std::collections::HashMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use common::Errores;
use db::{ConsultaCampos, HistorialFiltro, MedicoCampos, MedicoRow, UsuarioCampos, UsuarioRow};

use crate::fields;

/// Canonical bound for the free-text consulta fields, in characters.
const MAX_TEXTO: usize = 1000;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$")
        .expect("email regex")
});
static FECHA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("fecha regex"));
static HORA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("hora regex"));

fn is_valid_email(correo: &str) -> bool {
    EMAIL_RE.is_match(correo)
}

// The raw credential is kept verbatim (no trimming): whatever was typed is
// what gets hashed and verified.
fn raw_password(data: &Value) -> Option<String> {
    match data.get("password") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

// ==== Login ====

pub struct LoginCampos {
    pub correo: String,
    pub password: String,
}

/// Login is the one endpoint with a combined message instead of a
/// per-field map.
pub fn login(data: &Value) -> Result<LoginCampos, String> {
    let correo = data.get("correo").and_then(fields::normalize_str);
    let password = raw_password(data).filter(|p| !p.is_empty());
    match (correo, password) {
        (Some(correo), Some(password)) => Ok(LoginCampos { correo, password }),
        _ => Err("Correo y contraseña son obligatorios".to_string()),
    }
}

// ==== Medicos ====

/// Shared by create and update. `actual` carries the stored row on update:
/// an absent field keeps its stored value, a present-but-blank one clears
/// it and then fails the mandatory checks.
pub fn medico(data: &Value, actual: Option<&MedicoRow>) -> Result<MedicoCampos, Errores> {
    let campo = |nombre: &str, guardado: Option<String>| match data.get(nombre) {
        Some(v) => fields::normalize_str(v),
        None => guardado,
    };

    let primer_nombre = campo("primer_nombre", actual.map(|m| m.primer_nombre.clone()));
    let segundo_nombre = campo("segundo_nombre", actual.and_then(|m| m.segundo_nombre.clone()));
    let apellido_paterno = campo("apellido_paterno", actual.map(|m| m.apellido_paterno.clone()));
    let apellido_materno = campo("apellido_materno", actual.and_then(|m| m.apellido_materno.clone()));
    let cedula = campo("cedula", actual.map(|m| m.cedula.clone()));
    let telefono = campo("telefono", actual.and_then(|m| m.telefono.clone()));
    let especialidad = campo("especialidad", actual.map(|m| m.especialidad.clone()));
    let email = campo("email", actual.and_then(|m| m.email.clone()));

    let activo = match data.get("activo") {
        Some(v) => fields::normalize_bool(v),
        None => Some(actual.map(|m| m.activo).unwrap_or(true)),
    };

    let mut errores = Errores::new();
    if primer_nombre.is_none() {
        errores.insert("primer_nombre".into(), "El primer nombre es obligatorio.".into());
    }
    if apellido_paterno.is_none() {
        errores.insert("apellido_paterno".into(), "El apellido paterno es obligatorio.".into());
    }
    if cedula.is_none() {
        errores.insert("cedula".into(), "La cédula es obligatoria.".into());
    }
    if especialidad.is_none() {
        errores.insert("especialidad".into(), "La especialidad es obligatoria.".into());
    }
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            errores.insert("email".into(), "El correo electrónico no es válido.".into());
        }
    }
    if activo.is_none() {
        errores.insert("activo".into(), "El estado activo es inválido.".into());
    }

    match (primer_nombre, apellido_paterno, cedula, especialidad, activo) {
        (Some(primer_nombre), Some(apellido_paterno), Some(cedula), Some(especialidad), Some(activo))
            if errores.is_empty() =>
        {
            Ok(MedicoCampos {
                primer_nombre,
                segundo_nombre,
                apellido_paterno,
                apellido_materno,
                cedula,
                telefono,
                especialidad,
                email,
                activo,
            })
        }
        _ => Err(errores),
    }
}

// ==== Usuarios ====

/// `id_medico` arrives pre-resolved (alias coalescing plus the stored
/// fallback on update) and `medico_existe` carries the storage lookup, so
/// the dangling-reference error joins the same map as everything else.
fn usuario(
    data: &Value,
    actual: Option<&UsuarioRow>,
    id_medico: Option<i64>,
    medico_existe: bool,
) -> Result<(UsuarioCampos, Option<String>), Errores> {
    let correo = match data.get("correo") {
        Some(v) => fields::normalize_str(v),
        None => actual.map(|u| u.correo.clone()),
    };
    let nombre_completo = match data.get("nombre_completo") {
        Some(v) => fields::normalize_str(v),
        None => actual.and_then(|u| u.nombre_completo.clone()),
    };
    let activo = match data.get("activo") {
        Some(v) => fields::normalize_bool(v),
        None => Some(actual.map(|u| u.activo).unwrap_or(true)),
    };
    let password = raw_password(data).filter(|p| !p.trim().is_empty());

    let mut errores = Errores::new();
    match correo.as_deref() {
        Some(correo) if is_valid_email(correo) => {}
        _ => {
            errores.insert(
                "correo".into(),
                "El correo electrónico es obligatorio y debe ser válido.".into(),
            );
        }
    }
    if actual.is_none() && password.is_none() {
        errores.insert("password".into(), "La contraseña es obligatoria.".into());
    }
    if activo.is_none() {
        errores.insert("activo".into(), "El estado activo es inválido.".into());
    }
    if id_medico.is_some() && !medico_existe {
        errores.insert("id_medico".into(), "El médico asociado no existe.".into());
    }

    match (correo, activo) {
        (Some(correo), Some(activo)) if errores.is_empty() => Ok((
            UsuarioCampos {
                correo,
                nombre_completo,
                id_medico,
                activo,
            },
            password,
        )),
        _ => Err(errores),
    }
}

pub fn usuario_create(
    data: &Value,
    id_medico: Option<i64>,
    medico_existe: bool,
) -> Result<(UsuarioCampos, String), Errores> {
    let (campos, password) = usuario(data, None, id_medico, medico_existe)?;
    match password {
        Some(password) => Ok((campos, password)),
        // Unreachable: a missing password fails validation on create.
        None => {
            let mut errores = Errores::new();
            errores.insert("password".into(), "La contraseña es obligatoria.".into());
            Err(errores)
        }
    }
}

pub fn usuario_update(
    data: &Value,
    actual: &UsuarioRow,
    id_medico: Option<i64>,
    medico_existe: bool,
) -> Result<(UsuarioCampos, Option<String>), Errores> {
    usuario(data, Some(actual), id_medico, medico_existe)
}

// ==== Consultas ====

pub fn consulta(data: &Value) -> Result<ConsultaCampos, Errores> {
    let id_medico = fields::coalesce_positive_id(data, fields::MEDICO_ID_ALIASES);
    let id_paciente = fields::coalesce_positive_id(data, fields::PACIENTE_ID_ALIASES);
    let sintomas = fields::coalesce_text(data, fields::SINTOMAS_ALIASES);
    let recomendaciones = fields::coalesce_text(data, fields::RECOMENDACIONES_ALIASES);
    let diagnostico = data.get("diagnostico").and_then(fields::normalize_str);
    let fecha = data.get("fecha").and_then(fields::normalize_str);
    let hora = data.get("hora").and_then(fields::normalize_str);

    let mut errores = Errores::new();
    if id_medico <= 0 {
        errores.insert("id_medico".into(), "El médico es obligatorio.".into());
    }
    if id_paciente <= 0 {
        errores.insert("id_paciente".into(), "El paciente es obligatorio.".into());
    }
    match sintomas.as_deref() {
        None => {
            errores.insert("sintomas".into(), "Los síntomas son obligatorios.".into());
        }
        Some(s) if s.chars().count() > MAX_TEXTO => {
            errores.insert(
                "sintomas".into(),
                "Los síntomas no deben exceder 1000 caracteres.".into(),
            );
        }
        _ => {}
    }
    if let Some(r) = recomendaciones.as_deref() {
        if r.chars().count() > MAX_TEXTO {
            errores.insert(
                "recomendaciones".into(),
                "Las recomendaciones no deben exceder 1000 caracteres.".into(),
            );
        }
    }
    if let Some(d) = diagnostico.as_deref() {
        if d.chars().count() > MAX_TEXTO {
            errores.insert(
                "diagnostico".into(),
                "El diagnóstico no debe exceder 1000 caracteres.".into(),
            );
        }
    }

    let fecha = match fecha.as_deref() {
        None => None,
        Some(valor) if !FECHA_RE.is_match(valor) => {
            errores.insert("fecha".into(), "El formato de fecha debe ser YYYY-MM-DD.".into());
            None
        }
        Some(valor) => match NaiveDate::parse_from_str(valor, "%Y-%m-%d") {
            Ok(_) => Some(valor.to_string()),
            Err(_) => {
                errores.insert("fecha".into(), "La fecha indicada no es válida.".into());
                None
            }
        },
    };

    let hora = match hora.as_deref() {
        None => None,
        Some(valor) if !HORA_RE.is_match(valor) => {
            errores.insert("hora".into(), "El formato de hora debe ser HH:MM.".into());
            None
        }
        Some(valor) => {
            let horas: u32 = valor[..2].parse().unwrap_or(99);
            let minutos: u32 = valor[3..].parse().unwrap_or(99);
            if horas > 23 || minutos > 59 {
                errores.insert("hora".into(), "La hora indicada no es válida.".into());
                None
            } else {
                Some(valor.to_string())
            }
        }
    };

    // A supplied diagnosis is stored verbatim; otherwise the validated
    // fecha/hora fragments become the diagnosis.
    let diagnostico = diagnostico.or_else(|| {
        let mut fragmentos = Vec::new();
        if let Some(f) = &fecha {
            fragmentos.push(format!("Fecha: {f}"));
        }
        if let Some(h) = &hora {
            fragmentos.push(format!("Hora: {h}"));
        }
        if fragmentos.is_empty() {
            None
        } else {
            Some(fragmentos.join(" | "))
        }
    });

    match sintomas {
        Some(sintomas) if errores.is_empty() => Ok(ConsultaCampos {
            id_medico,
            id_paciente,
            sintomas,
            recomendaciones,
            diagnostico,
        }),
        _ => Err(errores),
    }
}

// ==== Historial ====

fn filtro_fecha(
    params: &HashMap<String, String>,
    aliases: &[&str],
    nombre: &str,
    errores: &mut Errores,
) -> Option<NaiveDate> {
    let valor = fields::param_normalized(params, aliases)?;
    if !FECHA_RE.is_match(&valor) {
        errores.insert(nombre.into(), "El formato de fecha debe ser YYYY-MM-DD.".into());
        return None;
    }
    match NaiveDate::parse_from_str(&valor, "%Y-%m-%d") {
        Ok(fecha) => Some(fecha),
        Err(_) => {
            errores.insert(nombre.into(), "El formato de fecha debe ser YYYY-MM-DD.".into());
            None
        }
    }
}

pub fn historial(params: &HashMap<String, String>) -> Result<HistorialFiltro, Errores> {
    let mut errores = Errores::new();
    let id_medico = fields::param_positive_id(params, fields::MEDICO_ID_PARAMS);
    let id_paciente = fields::param_positive_id(params, fields::PACIENTE_ID_PARAMS);
    let fecha_inicio = filtro_fecha(params, fields::FECHA_INICIO_ALIASES, "fechaInicio", &mut errores);
    let fecha_fin = filtro_fecha(params, fields::FECHA_FIN_ALIASES, "fechaFin", &mut errores);

    if errores.is_empty() {
        Ok(HistorialFiltro {
            id_medico: (id_medico > 0).then_some(id_medico),
            id_paciente: (id_paciente > 0).then_some(id_paciente),
            fecha_inicio,
            fecha_fin,
        })
    } else {
        Err(errores)
    }
}

// ==== Estado (PATCH) ====

pub enum EstadoError {
    Falta,
    Invalido,
}

pub fn estado(data: &Value) -> Result<bool, EstadoError> {
    match data.get("activo") {
        None => Err(EstadoError::Falta),
        Some(v) => fields::normalize_bool(v).ok_or(EstadoError::Invalido),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn medico_create_all_blank_reports_exactly_the_mandatory_fields() {
        let errores = medico(&json!({}), None).unwrap_err();
        let claves: Vec<&str> = errores.keys().map(String::as_str).collect();
        assert_eq!(
            claves,
            vec!["apellido_paterno", "cedula", "especialidad", "primer_nombre"]
        );
    }

    #[test]
    fn medico_create_defaults_activo_to_true() {
        let campos = medico(
            &json!({
                "primer_nombre": "Ana",
                "apellido_paterno": "Luna",
                "cedula": "CED-1",
                "especialidad": "Pediatría"
            }),
            None,
        )
        .unwrap();
        assert!(campos.activo);
        assert_eq!(campos.email, None);
    }

    #[test]
    fn medico_rejects_bad_email_and_bad_activo() {
        let errores = medico(
            &json!({
                "primer_nombre": "Ana",
                "apellido_paterno": "Luna",
                "cedula": "CED-1",
                "especialidad": "Pediatría",
                "email": "no-es-correo",
                "activo": "tal vez"
            }),
            None,
        )
        .unwrap_err();
        assert!(errores.contains_key("email"));
        assert!(errores.contains_key("activo"));
        assert_eq!(errores.len(), 2);
    }

    fn medico_guardado() -> MedicoRow {
        MedicoRow {
            id: 1,
            primer_nombre: "Ana".into(),
            segundo_nombre: None,
            apellido_paterno: "Luna".into(),
            apellido_materno: None,
            cedula: "CED-1".into(),
            telefono: Some("5551234".into()),
            especialidad: "Pediatría".into(),
            email: Some("ana@clinica.mx".into()),
            activo: true,
            fecha_creacion: chrono::Utc::now(),
        }
    }

    #[test]
    fn medico_update_keeps_absent_fields() {
        let campos = medico(&json!({"telefono": "5559999"}), Some(&medico_guardado())).unwrap();
        assert_eq!(campos.telefono, Some("5559999".into()));
        assert_eq!(campos.cedula, "CED-1");
        assert_eq!(campos.email, Some("ana@clinica.mx".into()));
        assert!(campos.activo);
    }

    #[test]
    fn medico_update_blank_mandatory_field_fails() {
        let errores = medico(&json!({"cedula": "  "}), Some(&medico_guardado())).unwrap_err();
        assert_eq!(errores.keys().collect::<Vec<_>>(), vec!["cedula"]);
    }

    #[test]
    fn usuario_create_requires_password_and_valid_correo() {
        let errores = usuario_create(&json!({"correo": "malo"}), None, true).unwrap_err();
        assert!(errores.contains_key("correo"));
        assert!(errores.contains_key("password"));
    }

    #[test]
    fn usuario_create_reports_dangling_medico() {
        let errores = usuario_create(
            &json!({"correo": "a@b.mx", "password": "clave", "id_medico": 99}),
            Some(99),
            false,
        )
        .unwrap_err();
        assert_eq!(
            errores.get("id_medico").map(String::as_str),
            Some("El médico asociado no existe.")
        );
    }

    #[test]
    fn usuario_update_blank_password_keeps_current() {
        let actual = UsuarioRow {
            id: 1,
            correo: "a@b.mx".into(),
            nombre_completo: Some("Ana Luna".into()),
            id_medico: None,
            activo: true,
            fecha_creacion: chrono::Utc::now(),
        };
        let (campos, password) =
            usuario_update(&json!({"password": "   "}), &actual, None, true).unwrap();
        assert_eq!(password, None);
        assert_eq!(campos.correo, "a@b.mx");
        assert_eq!(campos.nombre_completo, Some("Ana Luna".into()));
    }

    #[test]
    fn consulta_requires_references_and_sintomas() {
        let errores = consulta(&json!({})).unwrap_err();
        let claves: Vec<&str> = errores.keys().map(String::as_str).collect();
        assert_eq!(claves, vec!["id_medico", "id_paciente", "sintomas"]);
    }

    #[test]
    fn consulta_accepts_legacy_field_names() {
        let campos = consulta(&json!({
            "medicoId": 1,
            "pacienteId": "2",
            "motivo": " dolor abdominal ",
            "notas": "reposo"
        }))
        .unwrap();
        assert_eq!(campos.id_medico, 1);
        assert_eq!(campos.id_paciente, 2);
        assert_eq!(campos.sintomas, "dolor abdominal");
        assert_eq!(campos.recomendaciones, Some("reposo".into()));
        assert_eq!(campos.diagnostico, None);
    }

    #[test]
    fn consulta_enforces_the_text_bound_at_1000() {
        let justo: String = "á".repeat(1000);
        let campos = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": justo.clone()
        }))
        .unwrap();
        assert_eq!(campos.sintomas.chars().count(), 1000);

        let excedido: String = "á".repeat(1001);
        let errores = consulta(&json!({
            "id_medico": 1, "id_paciente": 2,
            "sintomas": excedido.clone(),
            "recomendaciones": excedido.clone(),
            "diagnostico": excedido
        }))
        .unwrap_err();
        assert!(errores.contains_key("sintomas"));
        assert!(errores.contains_key("recomendaciones"));
        assert!(errores.contains_key("diagnostico"));
    }

    #[test]
    fn consulta_folds_fecha_and_hora_into_missing_diagnostico() {
        let campos = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": "tos",
            "fecha": "2024-03-01", "hora": "08:30"
        }))
        .unwrap();
        assert_eq!(
            campos.diagnostico,
            Some("Fecha: 2024-03-01 | Hora: 08:30".into())
        );

        let solo_hora = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": "tos", "hora": "23:59"
        }))
        .unwrap();
        assert_eq!(solo_hora.diagnostico, Some("Hora: 23:59".into()));
    }

    #[test]
    fn consulta_keeps_supplied_diagnostico_verbatim() {
        let campos = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": "tos",
            "diagnostico": "faringitis", "fecha": "2024-03-01"
        }))
        .unwrap();
        assert_eq!(campos.diagnostico, Some("faringitis".into()));
    }

    #[test]
    fn consulta_rejects_malformed_or_impossible_fecha_hora() {
        let errores = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": "tos",
            "fecha": "2024/03/01", "hora": "8:30"
        }))
        .unwrap_err();
        assert_eq!(
            errores.get("fecha").map(String::as_str),
            Some("El formato de fecha debe ser YYYY-MM-DD.")
        );
        assert_eq!(
            errores.get("hora").map(String::as_str),
            Some("El formato de hora debe ser HH:MM.")
        );

        let errores = consulta(&json!({
            "id_medico": 1, "id_paciente": 2, "sintomas": "tos",
            "fecha": "2024-02-30", "hora": "24:00"
        }))
        .unwrap_err();
        assert_eq!(
            errores.get("fecha").map(String::as_str),
            Some("La fecha indicada no es válida.")
        );
        assert_eq!(
            errores.get("hora").map(String::as_str),
            Some("La hora indicada no es válida.")
        );
    }

    #[test]
    fn historial_rejects_dates_outside_the_shape() {
        let mut params = HashMap::new();
        params.insert("fechaInicio".to_string(), "2024/01/01".to_string());
        let errores = historial(&params).unwrap_err();
        assert_eq!(
            errores.get("fechaInicio").map(String::as_str),
            Some("El formato de fecha debe ser YYYY-MM-DD.")
        );
    }

    #[test]
    fn historial_resolves_param_aliases() {
        let mut params = HashMap::new();
        params.insert("medicoId".to_string(), "3".to_string());
        params.insert("fecha_desde".to_string(), "2024-01-01".to_string());
        params.insert("fechaFin".to_string(), "2024-02-01".to_string());
        let filtro = historial(&params).unwrap();
        assert_eq!(filtro.id_medico, Some(3));
        assert_eq!(filtro.id_paciente, None);
        assert_eq!(
            filtro.fecha_inicio,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(filtro.fecha_fin, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(login(&json!({"correo": "a@b.mx", "password": "x"})).is_ok());
        assert!(login(&json!({"correo": "  ", "password": "x"})).is_err());
        assert!(login(&json!({"correo": "a@b.mx"})).is_err());
        assert!(login(&json!({})).is_err());
    }

    #[test]
    fn estado_distinguishes_missing_from_invalid() {
        assert!(matches!(estado(&json!({})), Err(EstadoError::Falta)));
        assert!(matches!(estado(&json!({"activo": "quizá"})), Err(EstadoError::Invalido)));
        assert!(matches!(estado(&json!({"activo": "si"})), Ok(true)));
        assert!(matches!(estado(&json!({"activo": 0})), Ok(false)));
    }
}
