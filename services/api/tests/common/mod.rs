#![allow(dead_code)]

use std::env;

use api::state::{AppState, SchemaInfo};
use uuid::Uuid;

/// Connects to the test database, or returns `None` so the caller can skip
/// when no database is configured.
pub async fn test_state() -> Option<AppState> {
    dotenvy::dotenv().ok();
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()?;
    let db = db::connect(&db_url, 5).await.expect("conexión a la base de pruebas");
    db::migrate(&db).await.expect("migraciones");
    let consulta_fecha_creacion = db::consulta_has_fecha_creacion(&db)
        .await
        .expect("sondeo de esquema");
    Some(AppState {
        db,
        schema: SchemaInfo {
            consulta_fecha_creacion,
        },
    })
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

pub fn unique_email() -> String {
    format!("test-{}@clinica.mx", Uuid::new_v4())
}

/// Support fixture for tests that only need an existing medico.
pub async fn insert_medico(db: &db::Db, especialidad: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO medicos (primer_nombre, apellido_paterno, cedula, especialidad, email) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind("Ana")
    .bind("Luna")
    .bind(unique("CED"))
    .bind(especialidad)
    .bind(unique_email())
    .fetch_one(&db.0)
    .await
    .expect("alta de médico");
    id
}

/// There is no paciente endpoint; tests seed rows directly.
pub async fn insert_paciente(db: &db::Db, primer_nombre: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO paciente (primer_nombre, apellido_paterno, telefono) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(primer_nombre)
    .bind("Prueba")
    .bind("5550000")
    .fetch_one(&db.0)
    .await
    .expect("alta de paciente");
    id
}
