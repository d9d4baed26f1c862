mod common;

use actix_web::{middleware::from_fn, test, web, App};
use serde_json::{json, Value};
use user_service::{configure_routes, rate_limit};

use common::test_state;

#[actix_web::test]
async fn test_register_login_and_me() {
    let (state, _users) = test_state(1000);
    let tokens = state.tokens.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(from_fn(rate_limit::rate_limit))
            .configure(configure_routes)
    ).await;

    let register_response = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123",
            "username": "test_user"
        }))
        .send_request(&app)
        .await;

    assert_eq!(register_response.status(), 201);
    let register_body: Value = test::read_body_json(register_response).await;
    assert_eq!(register_body["user"]["email"], "test@example.com");
    assert_eq!(register_body["user"]["role"], "user");
    assert!(register_body["user"].get("password_hash").is_none());
    let token = register_body["token"].as_str().unwrap().to_string();
    assert_eq!(tokens.parse(&token).unwrap().user_id, register_body["user"]["id"].as_i64().unwrap());

    let login_response = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123"
        }))
        .send_request(&app)
        .await;

    assert_eq!(login_response.status(), 200);
    let login_body: Value = test::read_body_json(login_response).await;
    let login_token = login_body["token"].as_str().unwrap();

    let me_response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {}", login_token)))
        .send_request(&app)
        .await;

    assert_eq!(me_response.status(), 200);
    let me_body: Value = test::read_body_json(me_response).await;
    assert_eq!(me_body["email"], "test@example.com");
    assert_eq!(me_body["username"], "test_user");
    assert_eq!(me_body["is_active"], true);
}

#[actix_web::test]
async fn test_invalid_login() {
    let (state, users) = test_state(1000);
    users.insert("known@example.com", "password123", true).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes)
    ).await;

    let unknown = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({
            "email": "nonexistent@example.com",
            "password": "wrongpassword"
        }))
        .send_request(&app)
        .await;
    assert_eq!(unknown.status(), 401);
    let unknown_body = test::read_body(unknown).await;

    let wrong_password = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({
            "email": "known@example.com",
            "password": "wrongpassword"
        }))
        .send_request(&app)
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_body = test::read_body(wrong_password).await;

    // An attacker cannot tell which accounts exist.
    assert_eq!(unknown_body, wrong_body);
}

#[actix_web::test]
async fn test_invalid_registration() {
    let (state, _users) = test_state(1000);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes)
    ).await;

    let response = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": "test@example.com",
            "password": "short",
            "username": "test_user"
        }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "password must be at least 8 characters");
}

#[actix_web::test]
async fn test_overlong_password_rejected() {
    let (state, users) = test_state(1000);
    let prefix = "a".repeat(72);
    users.insert("first@example.com", &prefix, true).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes)
    ).await;

    let register = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": "second@example.com",
            "password": format!("{}X", prefix),
            "username": "second"
        }))
        .send_request(&app)
        .await;
    assert_eq!(register.status(), 400);
    let body: Value = test::read_body_json(register).await;
    assert_eq!(body["error"]["message"], "password must be at most 72 bytes");

    // A longer password sharing the stored 72-byte prefix must not log in.
    let login = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({
            "email": "first@example.com",
            "password": format!("{}Y", prefix)
        }))
        .send_request(&app)
        .await;
    assert_ne!(login.status(), 200);
}

#[actix_web::test]
async fn test_duplicate_registration() {
    let (state, users) = test_state(1000);
    users.insert("taken@example.com", "password123", true).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes)
    ).await;

    let response = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": "taken@example.com",
            "password": "password123",
            "username": "someone"
        }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 409);
}
