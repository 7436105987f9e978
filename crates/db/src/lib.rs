use chrono::{DateTime, NaiveDate, Utc};
use common::{Consulta, ConsultaMedico, ConsultaPaciente, Medico, Usuario};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

#[derive(Debug, Clone)]
pub struct Db(pub PgPool);

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub async fn connect(database_url: &str, max: u32) -> Result<Db, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max)
        .connect(database_url)
        .await?;
    Ok(Db(pool))
}

pub async fn migrate(db: &Db) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(&db.0).await?;
    Ok(())
}

// ==== Schema feature detection ====

/// Whether the consulta table carries its creation timestamp. Deployed
/// stores may lag the migration that adds it; resolved once at startup and
/// kept in the app state instead of probing per request.
pub async fn consulta_has_fecha_creacion(db: &Db) -> Result<bool, DbError> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM information_schema.columns \
         WHERE table_schema = current_schema() \
           AND table_name = 'consulta' AND column_name = 'fecha_creacion' \
         LIMIT 1",
    )
    .fetch_optional(&db.0)
    .await?;
    Ok(row.is_some())
}

// ==== Unique constraint attribution ====

// Constraint name as declared in the migrations -> (field, message).
const UNIQUE_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("medicos_cedula_key", "cedula", "La cédula ya está registrada."),
    (
        "medicos_email_key",
        "email",
        "El correo electrónico ya está registrado.",
    ),
    (
        "usuario_correo_key",
        "correo",
        "El correo electrónico ya está registrado.",
    ),
];

pub fn constraint_field(constraint: &str) -> Option<(&'static str, &'static str)> {
    UNIQUE_CONSTRAINTS
        .iter()
        .find(|(name, _, _)| *name == constraint)
        .map(|(_, campo, mensaje)| (*campo, *mensaje))
}

/// Attributes a failed statement to the violated unique field, when the
/// driver reports a constraint we declared. Anything else is not a conflict.
pub fn unique_conflict(err: &DbError) -> Option<(&'static str, &'static str)> {
    let DbError::Sqlx(sqlx::Error::Database(db_err)) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    db_err.constraint().and_then(constraint_field)
}

// ==== Rows ====

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct MedicoRow {
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

impl From<MedicoRow> for Medico {
    fn from(r: MedicoRow) -> Self {
        Medico {
            id: r.id,
            primer_nombre: r.primer_nombre,
            segundo_nombre: r.segundo_nombre,
            apellido_paterno: r.apellido_paterno,
            apellido_materno: r.apellido_materno,
            cedula: r.cedula,
            telefono: r.telefono,
            especialidad: r.especialidad,
            email: r.email,
            activo: r.activo,
            fecha_creacion: r.fecha_creacion,
        }
    }
}

// The password column is only ever read by the login lookup below.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UsuarioRow {
    pub id: i64,
    pub correo: String,
    pub nombre_completo: Option<String>,
    pub id_medico: Option<i64>,
    pub activo: bool,
    pub fecha_creacion: DateTime<Utc>,
}

impl From<UsuarioRow> for Usuario {
    fn from(r: UsuarioRow) -> Self {
        Usuario {
            id: r.id,
            correo: r.correo,
            nombre_completo: r.nombre_completo,
            id_medico: r.id_medico,
            activo: r.activo,
            fecha_creacion: r.fecha_creacion,
        }
    }
}

/// One history row: the consulta plus its joined medico and paciente,
/// aliased per joined table. `fecha_creacion` is only selected when the
/// column exists, hence the default.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ConsultaRow {
    pub id: i64,
    pub id_medico: i64,
    pub id_paciente: i64,
    pub sintomas: String,
    pub recomendaciones: Option<String>,
    pub diagnostico: Option<String>,
    pub medico_primer_nombre: String,
    pub medico_segundo_nombre: Option<String>,
    pub medico_apellido_paterno: String,
    pub medico_apellido_materno: Option<String>,
    pub medico_telefono: Option<String>,
    pub medico_especialidad: String,
    pub medico_email: Option<String>,
    pub medico_activo: bool,
    pub paciente_primer_nombre: String,
    pub paciente_segundo_nombre: Option<String>,
    pub paciente_apellido_paterno: String,
    pub paciente_apellido_materno: Option<String>,
    pub paciente_telefono: Option<String>,
    pub paciente_activo: bool,
    #[sqlx(default)]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

impl From<ConsultaRow> for Consulta {
    fn from(r: ConsultaRow) -> Self {
        Consulta {
            id: r.id,
            id_medico: r.id_medico,
            id_paciente: r.id_paciente,
            sintomas: r.sintomas,
            recomendaciones: r.recomendaciones,
            diagnostico: r.diagnostico,
            medico: ConsultaMedico {
                id: r.id_medico,
                primer_nombre: r.medico_primer_nombre,
                segundo_nombre: r.medico_segundo_nombre,
                apellido_paterno: r.medico_apellido_paterno,
                apellido_materno: r.medico_apellido_materno,
                telefono: r.medico_telefono,
                especialidad: r.medico_especialidad,
                email: r.medico_email,
                activo: r.medico_activo,
            },
            paciente: ConsultaPaciente {
                id: r.id_paciente,
                primer_nombre: r.paciente_primer_nombre,
                segundo_nombre: r.paciente_segundo_nombre,
                apellido_paterno: r.paciente_apellido_paterno,
                apellido_materno: r.paciente_apellido_materno,
                telefono: r.paciente_telefono,
                activo: r.paciente_activo,
            },
            fecha_creacion: r.fecha_creacion,
        }
    }
}

// ==== Medicos ====

#[derive(Debug, Clone)]
pub struct MedicoCampos {
    pub primer_nombre: String,
    pub segundo_nombre: Option<String>,
    pub apellido_paterno: String,
    pub apellido_materno: Option<String>,
    pub cedula: String,
    pub telefono: Option<String>,
    pub especialidad: String,
    pub email: Option<String>,
    pub activo: bool,
}

pub async fn find_medico(db: &Db, id: i64) -> Result<Option<MedicoRow>, DbError> {
    let row = sqlx::query_as::<_, MedicoRow>("SELECT * FROM medicos WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn list_medicos(db: &Db, activo: Option<bool>) -> Result<Vec<MedicoRow>, DbError> {
    if let Some(activo) = activo {
        let rows = sqlx::query_as::<_, MedicoRow>(
            "SELECT * FROM medicos WHERE activo = $1 ORDER BY id DESC",
        )
        .bind(activo)
        .fetch_all(&db.0)
        .await?;
        Ok(rows)
    } else {
        let rows = sqlx::query_as::<_, MedicoRow>("SELECT * FROM medicos ORDER BY id DESC")
            .fetch_all(&db.0)
            .await?;
        Ok(rows)
    }
}

pub async fn insert_medico(db: &Db, campos: MedicoCampos) -> Result<MedicoRow, DbError> {
    let row = sqlx::query_as::<_, MedicoRow>(
        r#"INSERT INTO medicos
               (primer_nombre, segundo_nombre, apellido_paterno, apellido_materno,
                cedula, telefono, especialidad, email, activo)
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
           RETURNING *"#,
    )
    .bind(campos.primer_nombre)
    .bind(campos.segundo_nombre)
    .bind(campos.apellido_paterno)
    .bind(campos.apellido_materno)
    .bind(campos.cedula)
    .bind(campos.telefono)
    .bind(campos.especialidad)
    .bind(campos.email)
    .bind(campos.activo)
    .fetch_one(&db.0)
    .await?;
    Ok(row)
}

pub async fn update_medico(
    db: &Db,
    id: i64,
    campos: MedicoCampos,
) -> Result<Option<MedicoRow>, DbError> {
    let row = sqlx::query_as::<_, MedicoRow>(
        r#"UPDATE medicos
           SET primer_nombre=$2, segundo_nombre=$3, apellido_paterno=$4,
               apellido_materno=$5, cedula=$6, telefono=$7, especialidad=$8,
               email=$9, activo=$10
           WHERE id=$1
           RETURNING *"#,
    )
    .bind(id)
    .bind(campos.primer_nombre)
    .bind(campos.segundo_nombre)
    .bind(campos.apellido_paterno)
    .bind(campos.apellido_materno)
    .bind(campos.cedula)
    .bind(campos.telefono)
    .bind(campos.especialidad)
    .bind(campos.email)
    .bind(campos.activo)
    .fetch_optional(&db.0)
    .await?;
    Ok(row)
}

pub async fn update_medico_estado(
    db: &Db,
    id: i64,
    activo: bool,
) -> Result<Option<MedicoRow>, DbError> {
    let row =
        sqlx::query_as::<_, MedicoRow>("UPDATE medicos SET activo = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(activo)
            .fetch_optional(&db.0)
            .await?;
    Ok(row)
}

// ==== Usuarios ====

const USUARIO_COLUMNS: &str = "id, correo, nombre_completo, id_medico, activo, fecha_creacion";

#[derive(Debug, Clone)]
pub struct UsuarioCampos {
    pub correo: String,
    pub nombre_completo: Option<String>,
    pub id_medico: Option<i64>,
    pub activo: bool,
}

pub async fn find_usuario(db: &Db, id: i64) -> Result<Option<UsuarioRow>, DbError> {
    let sql = format!("SELECT {USUARIO_COLUMNS} FROM usuario WHERE id = $1 LIMIT 1");
    let row = sqlx::query_as::<_, UsuarioRow>(&sql)
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn find_password_by_correo(db: &Db, correo: &str) -> Result<Option<String>, DbError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT password FROM usuario WHERE correo = $1 LIMIT 1")
            .bind(correo)
            .fetch_optional(&db.0)
            .await?;
    Ok(row.map(|(password,)| password))
}

pub async fn list_usuarios(
    db: &Db,
    activo: Option<bool>,
    id_medico: Option<i64>,
) -> Result<Vec<UsuarioRow>, DbError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USUARIO_COLUMNS} FROM usuario"));
    let mut sep = " WHERE ";
    if let Some(activo) = activo {
        qb.push(sep).push("activo = ").push_bind(activo);
        sep = " AND ";
    }
    if let Some(id_medico) = id_medico {
        qb.push(sep).push("id_medico = ").push_bind(id_medico);
    }
    qb.push(" ORDER BY id DESC");
    let rows = qb.build_query_as::<UsuarioRow>().fetch_all(&db.0).await?;
    Ok(rows)
}

pub async fn insert_usuario(
    db: &Db,
    campos: UsuarioCampos,
    password_hash: String,
) -> Result<UsuarioRow, DbError> {
    let sql = format!(
        "INSERT INTO usuario (correo, password, nombre_completo, id_medico, activo) \
         VALUES ($1,$2,$3,$4,$5) \
         RETURNING {USUARIO_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UsuarioRow>(&sql)
        .bind(campos.correo)
        .bind(password_hash)
        .bind(campos.nombre_completo)
        .bind(campos.id_medico)
        .bind(campos.activo)
        .fetch_one(&db.0)
        .await?;
    Ok(row)
}

/// Absent `password_hash` leaves the stored credential untouched.
pub async fn update_usuario(
    db: &Db,
    id: i64,
    campos: UsuarioCampos,
    password_hash: Option<String>,
) -> Result<Option<UsuarioRow>, DbError> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE usuario SET correo = ");
    qb.push_bind(campos.correo);
    qb.push(", nombre_completo = ").push_bind(campos.nombre_completo);
    qb.push(", id_medico = ").push_bind(campos.id_medico);
    qb.push(", activo = ").push_bind(campos.activo);
    if let Some(hash) = password_hash {
        qb.push(", password = ").push_bind(hash);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(USUARIO_COLUMNS);
    let row = qb
        .build_query_as::<UsuarioRow>()
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

pub async fn update_usuario_estado(
    db: &Db,
    id: i64,
    activo: bool,
) -> Result<Option<UsuarioRow>, DbError> {
    let sql = format!("UPDATE usuario SET activo = $2 WHERE id = $1 RETURNING {USUARIO_COLUMNS}");
    let row = sqlx::query_as::<_, UsuarioRow>(&sql)
        .bind(id)
        .bind(activo)
        .fetch_optional(&db.0)
        .await?;
    Ok(row)
}

// ==== Consultas ====

#[derive(Debug, Clone)]
pub struct ConsultaCampos {
    pub id_medico: i64,
    pub id_paciente: i64,
    pub sintomas: String,
    pub recomendaciones: Option<String>,
    pub diagnostico: Option<String>,
}

#[derive(Debug)]
pub enum ConsultaInsert {
    Creada(i64),
    MedicoInexistente,
    PacienteInexistente,
}

/// Reference checks and the insert run in one transaction: a missing
/// reference rolls back before any write, and any failure mid-sequence
/// rolls back before surfacing.
pub async fn insert_consulta(db: &Db, campos: ConsultaCampos) -> Result<ConsultaInsert, DbError> {
    let mut tx = db.0.begin().await?;

    let medico: Option<(i64,)> = sqlx::query_as("SELECT id FROM medicos WHERE id = $1 LIMIT 1")
        .bind(campos.id_medico)
        .fetch_optional(&mut *tx)
        .await?;
    if medico.is_none() {
        tx.rollback().await?;
        return Ok(ConsultaInsert::MedicoInexistente);
    }

    let paciente: Option<(i64,)> = sqlx::query_as("SELECT id FROM paciente WHERE id = $1 LIMIT 1")
        .bind(campos.id_paciente)
        .fetch_optional(&mut *tx)
        .await?;
    if paciente.is_none() {
        tx.rollback().await?;
        return Ok(ConsultaInsert::PacienteInexistente);
    }

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO consulta (id_medico, id_paciente, sintomas, recomendaciones, diagnostico) \
         VALUES ($1,$2,$3,$4,$5) RETURNING id",
    )
    .bind(campos.id_medico)
    .bind(campos.id_paciente)
    .bind(campos.sintomas)
    .bind(campos.recomendaciones)
    .bind(campos.diagnostico)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(ConsultaInsert::Creada(id))
}

#[derive(Debug, Clone, Default)]
pub struct HistorialFiltro {
    pub id_medico: Option<i64>,
    pub id_paciente: Option<i64>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
}

const HISTORIAL_COLUMNS: &str =
    "c.id, c.id_medico, c.id_paciente, c.sintomas, c.recomendaciones, c.diagnostico, \
     m.primer_nombre AS medico_primer_nombre, m.segundo_nombre AS medico_segundo_nombre, \
     m.apellido_paterno AS medico_apellido_paterno, m.apellido_materno AS medico_apellido_materno, \
     m.telefono AS medico_telefono, m.especialidad AS medico_especialidad, \
     m.email AS medico_email, m.activo AS medico_activo, \
     p.primer_nombre AS paciente_primer_nombre, p.segundo_nombre AS paciente_segundo_nombre, \
     p.apellido_paterno AS paciente_apellido_paterno, p.apellido_materno AS paciente_apellido_materno, \
     p.telefono AS paciente_telefono, p.activo AS paciente_activo";

/// `con_fecha` reflects the startup schema probe; the date filters are only
/// ever passed when it is true.
pub async fn list_historial(
    db: &Db,
    filtro: HistorialFiltro,
    con_fecha: bool,
) -> Result<Vec<ConsultaRow>, DbError> {
    let mut select = format!("SELECT {HISTORIAL_COLUMNS}");
    if con_fecha {
        select.push_str(", c.fecha_creacion");
    }
    select.push_str(
        " FROM consulta c \
         INNER JOIN medicos m ON m.id = c.id_medico \
         INNER JOIN paciente p ON p.id = c.id_paciente",
    );

    let mut qb = QueryBuilder::<Postgres>::new(select);
    let mut sep = " WHERE ";
    if let Some(id_medico) = filtro.id_medico {
        qb.push(sep).push("c.id_medico = ").push_bind(id_medico);
        sep = " AND ";
    }
    if let Some(id_paciente) = filtro.id_paciente {
        qb.push(sep).push("c.id_paciente = ").push_bind(id_paciente);
        sep = " AND ";
    }
    if let Some(fecha_inicio) = filtro.fecha_inicio {
        qb.push(sep)
            .push("c.fecha_creacion::date >= ")
            .push_bind(fecha_inicio);
        sep = " AND ";
    }
    if let Some(fecha_fin) = filtro.fecha_fin {
        qb.push(sep)
            .push("c.fecha_creacion::date <= ")
            .push_bind(fecha_fin);
    }
    qb.push(" ORDER BY c.id DESC");

    let rows = qb.build_query_as::<ConsultaRow>().fetch_all(&db.0).await?;
    Ok(rows)
}
