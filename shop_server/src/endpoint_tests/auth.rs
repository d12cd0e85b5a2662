use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    test::TestRequest,
};
use serde_json::json;
use shop_engine::db_types::Role;

use super::helpers::{get, post, TestServer};

#[actix_web::test]
async fn register_login_and_logout() {
    let server = TestServer::new().await;
    let creds = json!({"email": " Alice@Example.com ", "password": "hunter2"});
    let (status, body) = server.call_json(post("/register", "").set_json(&creds)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "Customer");
    let user_id = body["user_id"].as_i64().unwrap();

    let wrong = json!({"email": "alice@example.com", "password": "hunter3"});
    let (status, body) = server.call_json(post("/auth", "").set_json(&wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Неверный email или пароль");

    let (status, body) = server.call_json(post("/auth", "").set_json(&creds)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, profile) = server.call_json(get("/api/profile", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["user_id"].as_i64(), Some(user_id));

    let (status, session) = server.call_json(get("/api/session", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user_id"].as_i64(), Some(user_id));

    let (status, _) = server.call(post("/api/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.call(get("/api/profile", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_registration_is_a_conflict() {
    let server = TestServer::new().await;
    let creds = json!({"email": "bob@example.com", "password": "pw"});
    let (status, _) = server.call(post("/register", "").set_json(&creds)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = server.call_json(post("/register", "").set_json(&creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Пользователь с таким email уже зарегистрирован");
}

#[actix_web::test]
async fn bad_registrations_are_rejected() {
    let server = TestServer::new().await;
    let (status, _) = server.call(post("/register", "").set_json(json!({"email": "nobody", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = server.call(post("/register", "").set_json(json!({"email": "a@b.c"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn api_requires_a_session() {
    let server = TestServer::new().await;
    let (status, body) = server.call_json(get("/api/cart", "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("No access token"));

    let (status, _) = server.call(get("/api/cart", "not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/cart").insert_header((AUTHORIZATION, "Basic abc"));
    let (status, _) = server.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_cannot_use_admin_routes() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "0", Role::Customer).await;
    let token = server.login(alice, Role::Customer).await;
    for path in ["/api/admin/orders", "/api/admin/inventory", "/api/admin/users"] {
        let (status, _) = server.call(get(path, &token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
    }
}
