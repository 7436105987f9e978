//! Input normalization: canonical forms for raw JSON values and query
//! params, plus the accepted-alias tables for fields that arrive under
//! more than one name.

use std::collections::HashMap;

use serde_json::Value;

// Ordered alias lists, first-present-wins. Body fields lead with the
// canonical snake_case name; the history query params historically led
// with the camelCase one.
pub const MEDICO_ID_ALIASES: &[&str] = &["id_medico", "medicoId"];
pub const PACIENTE_ID_ALIASES: &[&str] = &["id_paciente", "pacienteId"];
pub const SINTOMAS_ALIASES: &[&str] = &["sintomas", "motivo"];
pub const RECOMENDACIONES_ALIASES: &[&str] = &["recomendaciones", "notas"];
pub const MEDICO_ID_PARAMS: &[&str] = &["medicoId", "id_medico"];
pub const PACIENTE_ID_PARAMS: &[&str] = &["pacienteId", "id_paciente"];
pub const FECHA_INICIO_ALIASES: &[&str] = &["fechaInicio", "fecha_desde"];
pub const FECHA_FIN_ALIASES: &[&str] = &["fechaFin", "fecha_hasta"];

/// Trims the value; null, non-text and blank-after-trim all collapse to
/// `None`. Numbers are stringified first, matching how form input arrives.
pub fn normalize_str(v: &Value) -> Option<String> {
    let texto = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let texto = texto.trim();
    if texto.is_empty() {
        None
    } else {
        Some(texto.to_string())
    }
}

/// Resolves a value to a boolean, or `None` when it is unrecognizable.
/// The `None` is deliberate: callers distinguish "absent/invalid" from a
/// real boolean and report a field error instead of defaulting.
pub fn normalize_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i == 1)
            } else {
                n.as_f64().map(|f| f as i64 == 1)
            }
        }
        Value::String(s) => normalize_bool_str(s),
        _ => None,
    }
}

pub fn normalize_bool_str(valor: &str) -> Option<bool> {
    match valor.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "si" | "sí" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn as_integer(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// First alias yielding a positive integer wins; anything unparseable
/// counts as zero.
pub fn coalesce_positive_id(data: &Value, aliases: &[&str]) -> i64 {
    let mut id = 0;
    for key in aliases {
        if id <= 0 {
            if let Some(v) = data.get(*key) {
                id = as_integer(v);
            }
        }
    }
    id
}

/// First alias yielding a non-blank string wins.
pub fn coalesce_text(data: &Value, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        if let Some(texto) = data.get(*key).and_then(normalize_str) {
            return Some(texto);
        }
    }
    None
}

/// Resolves a usuario's doctor reference. The first *present* alias wins
/// even when its value is null or empty (an explicit clear); a
/// non-positive value is treated as absent. With no alias present the
/// stored reference carries over.
pub fn coalesce_medico_ref(data: &Value, actual: Option<i64>) -> Option<i64> {
    for key in MEDICO_ID_ALIASES {
        if let Some(v) = data.get(*key) {
            let id = match v {
                Value::Null => return None,
                Value::String(s) if s.is_empty() => return None,
                otro => as_integer(otro),
            };
            return if id > 0 { Some(id) } else { None };
        }
    }
    actual
}

/// Query-param analog of [`coalesce_positive_id`].
pub fn param_positive_id(params: &HashMap<String, String>, aliases: &[&str]) -> i64 {
    let mut id = 0;
    for key in aliases {
        if id <= 0 {
            if let Some(valor) = params.get(*key) {
                id = valor.trim().parse::<i64>().unwrap_or(0);
            }
        }
    }
    id
}

/// First *present* query param wins, then gets normalized; a present but
/// blank value is absent, it does not fall through to the next alias.
pub fn param_normalized(params: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        if let Some(valor) = params.get(*key) {
            let texto = valor.trim();
            return if texto.is_empty() {
                None
            } else {
                Some(texto.to_string())
            };
        }
    }
    None
}
