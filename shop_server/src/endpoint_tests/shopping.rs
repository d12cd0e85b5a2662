use actix_web::http::StatusCode;
use serde_json::json;
use shop_engine::{db_types::Role, AccountManagement, CatalogManagement};

use super::helpers::{delete, get, patch, post, TestServer};

#[actix_web::test]
async fn browse_the_catalog() {
    let server = TestServer::new().await;
    let kettle = server.product("Электрический чайник", "30.00", 10).await;
    server.product("Кофемолка", "45.50", 3).await;

    let (status, products) = server.call_json(get("/products", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().unwrap().len(), 2);

    let (status, details) = server.call_json(get(&format!("/products/{kettle}"), "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["price"], 3000);

    let (status, hits) = server.call_json(get("/products/search?q=%D1%87%D0%B0%D0%B9%D0%BD%D0%B8%D0%BA", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["product_id"].as_i64(), Some(kettle));

    let (status, _) = server.call(get("/products/9999", "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.call(get("/products/kettle", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cart_and_checkout() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let token = server.login(alice, Role::Customer).await;

    let (status, cart) =
        server.call_json(post("/api/cart", &token).set_json(json!({"product_id": kettle, "quantity": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total"]["total_price"], 6000);
    assert_eq!(cart["total"]["total_quantity"], 2);

    let (status, receipt) = server.call_json(post("/api/checkout", &token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["total"], 6000);
    assert_eq!(receipt["new_balance"], 4000);
    assert_eq!(receipt["order"]["status"], "Pending");
    let order_id = receipt["order"]["order_id"].as_i64().unwrap();

    let (_, balance) = server.call_json(get("/api/balance", &token)).await;
    assert_eq!(balance["balance"], 4000);
    assert_eq!(server.db.peek_stock(kettle).await.unwrap(), 8);

    let (status, cart) = server.call_json(get("/api/cart", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (status, body) = server.call_json(post("/api/checkout", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Ваша корзина пуста.");

    let (status, orders) = server.call_json(get("/api/orders", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    let (status, order) = server.call_json(get(&format!("/api/orders/{order_id}"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn checkout_with_quantity_overrides() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let token = server.login(alice, Role::Customer).await;
    server.call(post("/api/cart", &token).set_json(json!({"product_id": kettle, "quantity": 2}))).await;

    let overrides = json!({"overrides": [{"product_id": kettle, "quantity": 3}]});
    let (status, receipt) = server.call_json(post("/api/checkout", &token).set_json(overrides)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["total"], 9000);
    assert_eq!(server.db.peek_stock(kettle).await.unwrap(), 7);
}

#[actix_web::test]
async fn checkout_failures_map_to_status_codes() {
    let server = TestServer::new().await;
    let bob = server.user("bob@example.com", "50.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 2).await;
    let token = server.login(bob, Role::Customer).await;

    let (status, body) =
        server.call_json(post("/api/cart", &token).set_json(json!({"product_id": kettle, "quantity": 3}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Указанное количество товаров (3) превышает доступное на складе (2 шт.)");

    server.call(post("/api/cart", &token).set_json(json!({"product_id": kettle, "quantity": 2}))).await;
    let (status, body) = server.call_json(post("/api/checkout", &token)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Недостаточно средств на балансе.");
    assert_eq!(server.db.balance(bob).await.unwrap().cents(), 5000);
    assert_eq!(server.db.peek_stock(kettle).await.unwrap(), 2);
}

#[actix_web::test]
async fn edit_the_cart() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "0", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let mug = server.product("Кружка", "5.00", 10).await;
    let token = server.login(alice, Role::Customer).await;
    server.call(post("/api/cart", &token).set_json(json!({"product_id": kettle}))).await;
    server.call(post("/api/cart", &token).set_json(json!({"product_id": mug, "quantity": 4}))).await;

    let (status, cart) =
        server.call_json(patch(&format!("/api/cart/{mug}"), &token).set_json(json!({"quantity": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["total"]["total_price"], 3000);
    let (status, _) =
        server.call(patch(&format!("/api/cart/{kettle}"), &token).set_json(json!({"quantity": i64::MAX / 2}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server.call(delete("/api/cart", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, cart) = server.call_json(get("/api/cart", &token)).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (status, _) = server.call(post("/api/cart", &token).set_json(json!({"product_id": kettle, "quantity": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn top_up_the_balance() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "0", Role::Customer).await;
    let token = server.login(alice, Role::Customer).await;
    let (status, body) = server.call_json(post("/api/balance/top_up", &token).set_json(json!({"amount": 2500}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 2500);
    let (status, _) = server.call(post("/api/balance/top_up", &token).set_json(json!({"amount": -100}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn orders_of_other_users_are_hidden() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let eve = server.user("eve@example.com", "0", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let alice_token = server.login(alice, Role::Customer).await;
    server.call(post("/api/cart", &alice_token).set_json(json!({"product_id": kettle}))).await;
    let (_, receipt) = server.call_json(post("/api/checkout", &alice_token)).await;
    let order_id = receipt["order"]["order_id"].as_i64().unwrap();

    let eve_token = server.login(eve, Role::Customer).await;
    let (status, _) = server.call(get(&format!("/api/orders/{order_id}"), &eve_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn inbox_and_live_feed() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let token = server.login(alice, Role::Customer).await;

    let (status, body) = server.call_json(get("/api/notifications", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread"], 0);
    assert!(body["live"].as_array().unwrap().is_empty());
    assert_eq!(server.feeds.active(), 1);

    server.call(post("/api/cart", &token).set_json(json!({"product_id": kettle}))).await;
    let (_, receipt) = server.call_json(post("/api/checkout", &token)).await;
    let order_id = receipt["order"]["order_id"].as_i64().unwrap();

    let (_, body) = server.call_json(get("/api/notifications", &token)).await;
    assert_eq!(body["unread"], 1);
    assert_eq!(body["inbox"][0]["message"], format!("Создан новый заказ #{order_id}"));
    let id = body["inbox"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = server.call(post(&format!("/api/notifications/{id}/read"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = server.call_json(get("/api/notifications", &token)).await;
    assert_eq!(body["unread"], 0);
    let (status, _) = server.call(post("/api/notifications/notif_0_00000000/read", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.call(post("/api/logout", &token)).await;
    assert_eq!(server.feeds.active(), 0);
}

#[actix_web::test]
async fn stock_is_shared_between_shoppers() {
    let server = TestServer::new().await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let bob = server.user("bob@example.com", "100.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 2).await;
    let alice_token = server.login(alice, Role::Customer).await;
    let bob_token = server.login(bob, Role::Customer).await;
    server.call(post("/api/cart", &alice_token).set_json(json!({"product_id": kettle, "quantity": 2}))).await;
    server.call(post("/api/cart", &bob_token).set_json(json!({"product_id": kettle, "quantity": 2}))).await;

    let (status, _) = server.call(post("/api/checkout", &alice_token)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server.call(post("/api/checkout", &bob_token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(server.db.balance(bob).await.unwrap().cents(), 10000);
    assert_eq!(server.db.peek_stock(kettle).await.unwrap(), 0);
}
