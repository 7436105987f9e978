mod common;

use actix_web::test;
use api::create_app;
use serde_json::json;

#[actix_web::test]
async fn usuario_create_update_and_estado_flow() {
    let Some(state) = common::test_state().await else {
        eprintln!("DATABASE_URL no configurada; prueba omitida");
        return;
    };
    let app = test::init_service(create_app(state.clone())).await;

    let id_medico = common::insert_medico(&state.db, "Pediatría").await;
    let correo = common::unique_email();

    // The legacy alias medicoId resolves to the same reference.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/usuarios")
            .set_json(json!({
                "correo": correo,
                "password": "clave123",
                "nombre_completo": "Ana Luna",
                "medicoId": id_medico
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["usuario"]["id_medico"], json!(id_medico));
    assert!(body["usuario"].get("password").is_none(), "la contraseña nunca sale");
    let id = body["usuario"]["id"].as_i64().expect("id del usuario");

    // Same correo again: attributed to the correo field with a 409.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/usuarios")
            .set_json(json!({"correo": correo, "password": "otra"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errores"]["correo"], "El correo electrónico ya está registrado.");

    // Partial update: the correo and the reference stay put.
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/usuarios/{id}"))
            .set_json(json!({"nombre_completo": "Ana L. Luna"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["usuario"]["nombre_completo"], "Ana L. Luna");
    assert_eq!(body["usuario"]["correo"], json!(correo));
    assert_eq!(body["usuario"]["id_medico"], json!(id_medico));

    // An explicit null clears the reference.
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/usuarios/{id}"))
            .set_json(json!({"id_medico": null}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["usuario"]["id_medico"].is_null());

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/usuarios/{id}/estado"))
            .set_json(json!({"activo": 0}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["mensaje"], "Usuario desactivado correctamente.");
    assert_eq!(body["usuario"]["activo"], json!(false));
}

#[actix_web::test]
async fn usuario_list_filters_by_medico() {
    let Some(state) = common::test_state().await else {
        eprintln!("DATABASE_URL no configurada; prueba omitida");
        return;
    };
    let app = test::init_service(create_app(state.clone())).await;

    let id_medico = common::insert_medico(&state.db, "Pediatría").await;
    let correo = common::unique_email();
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/usuarios")
            .set_json(json!({"correo": correo, "password": "clave123", "id_medico": id_medico}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/usuarios?id_medico={id_medico}"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let usuarios = body["usuarios"].as_array().expect("listado de usuarios");
    assert_eq!(usuarios.len(), 1);
    assert_eq!(usuarios[0]["correo"], json!(correo));
}

#[actix_web::test]
async fn usuario_with_dangling_medico_reference_is_rejected() {
    let Some(state) = common::test_state().await else {
        eprintln!("DATABASE_URL no configurada; prueba omitida");
        return;
    };
    let app = test::init_service(create_app(state)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/usuarios")
            .set_json(json!({
                "correo": common::unique_email(),
                "password": "clave123",
                "id_medico": 999999999
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["errores"]["id_medico"], "El médico asociado no existe.");
}
