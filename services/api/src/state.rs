use db::Db;
use serde::Deserialize;

/// What the startup probe learned about the store. Kept here so no request
/// path issues metadata queries.
#[derive(Debug, Clone, Copy)]
pub struct SchemaInfo {
    pub consulta_fecha_creacion: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub schema: SchemaInfo,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: Option<u32>,
    pub bind_addr: Option<String>,
    /// Disable when the schema is managed outside the service.
    pub run_migrations: Option<bool>,
}

impl Settings {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .expect("config");

        cfg.try_deserialize::<Settings>()
            .expect("deserialize settings")
    }
}
