pub mod error;
pub mod fields;
pub mod routes;
pub mod state;
pub mod validate;

use actix_web::{web, App, HttpResponse};

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .json(serde_json::json!({"estado": false, "mensaje": "Recurso no encontrado."}))
}

pub fn create_app(
    state: state::AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
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
        .default_service(web::to(not_found))
}
