use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use tracing_subscriber::EnvFilter;

use api::routes;
use api::state::{AppState, SchemaInfo, Settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let s = Settings::from_env();
    let db = db::connect(&s.database_url, s.db_max_connections.unwrap_or(10))
        .await
        .expect("db");
    if s.run_migrations.unwrap_or(true) {
        db::migrate(&db).await.expect("migrations");
    }

    // One metadata query per process; stores managed outside the service
    // may lag the migration that adds the consulta timestamp.
    let consulta_fecha_creacion = db::consulta_has_fecha_creacion(&db)
        .await
        .expect("schema probe");
    tracing::info!(consulta_fecha_creacion, "esquema de consulta detectado");

    let state = AppState {
        db,
        schema: SchemaInfo {
            consulta_fecha_creacion,
        },
    };

    let governor_conf = GovernorConfigBuilder::default()
        .burst_size(10)
        .finish()
        .unwrap();

    let bind_addr = s.bind_addr.unwrap_or_else(|| "0.0.0.0:8080".to_string());
    tracing::info!(%bind_addr, "iniciando servidor");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_header()
            .allow_any_method();
        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .app_data(web::Data::new(state.clone()))
            .service(routes::auth::iniciar_sesion)
            .service(routes::consultas::crear)
            .service(routes::consultas::historial)
            .service(routes::medicos::list)
            .service(routes::medicos::create)
            .service(routes::medicos::update)
            .service(routes::medicos::estado)
            .service(routes::usuarios::list)
            .service(routes::usuarios::create)
            .service(routes::usuarios::update)
            .service(routes::usuarios::estado)
            .default_service(web::to(|| async {
                HttpResponse::NotFound()
                    .json(serde_json::json!({"estado": false, "mensaje": "Recurso no encontrado."}))
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
