use actix_web::http::StatusCode;
use serde_json::json;
use shop_engine::{db_types::Role, CatalogManagement};

use super::helpers::{get, patch, post, put, TestServer};

async fn admin_and_order(server: &TestServer) -> (String, String, i64) {
    let admin = server.user("admin@example.com", "0", Role::Admin).await;
    let alice = server.user("alice@example.com", "100.00", Role::Customer).await;
    let kettle = server.product("Чайник", "30.00", 10).await;
    let alice_token = server.login(alice, Role::Customer).await;
    server.call(post("/api/cart", &alice_token).set_json(json!({"product_id": kettle}))).await;
    let (_, receipt) = server.call_json(post("/api/checkout", &alice_token)).await;
    let order_id = receipt["order"]["order_id"].as_i64().unwrap();
    (server.login(admin, Role::Admin).await, alice_token, order_id)
}

#[actix_web::test]
async fn update_order_status() {
    let server = TestServer::new().await;
    let (admin, alice, order_id) = admin_and_order(&server).await;

    let path = format!("/api/admin/orders/{order_id}/status");
    let (status, order) = server.call_json(patch(&path, &admin).set_json(json!({"status": "Shipped"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "Shipped");

    let (status, body) = server.call_json(patch(&path, &admin).set_json(json!({"status": "Lost"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Недопустимый статус заказа: Lost");

    let (status, _) =
        server.call(patch("/api/admin/orders/9999/status", &admin).set_json(json!({"status": "Shipped"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, orders) = server.call_json(get("/api/admin/orders", &admin)).await;
    assert_eq!(orders[0]["email"], "alice@example.com");
    assert_eq!(orders[0]["status"], "Shipped");

    let (_, body) = server.call_json(get("/api/notifications", &alice)).await;
    assert_eq!(body["unread"], 2);
}

#[actix_web::test]
async fn manage_the_catalog() {
    let server = TestServer::new().await;
    let (admin, _, _) = admin_and_order(&server).await;

    let (status, created) = server
        .call_json(post("/api/admin/manufacturers", &admin).set_json(json!({"name": "Bork", "country": "Россия"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let manufacturer_id = created["id"].as_i64().unwrap();

    let product = json!({"name": "Тостер", "price": 2599, "stock_quantity": 4, "manufacturer_id": manufacturer_id});
    let (status, created) = server.call_json(post("/api/admin/products", &admin).set_json(product)).await;
    assert_eq!(status, StatusCode::CREATED);
    let toaster = created["id"].as_i64().unwrap();

    let (_, details) = server.call_json(get(&format!("/products/{toaster}"), "")).await;
    assert_eq!(details["manufacturer"]["name"], "Bork");

    let (status, _) =
        server.call(put(&format!("/api/admin/products/{toaster}/stock"), &admin).set_json(json!({"quantity": 12}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.db.peek_stock(toaster).await.unwrap(), 12);

    let (status, _) =
        server.call(put(&format!("/api/admin/products/{toaster}/stock"), &admin).set_json(json!({"quantity": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        server.call(put("/api/admin/products/9999/stock", &admin).set_json(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, inventory) = server.call_json(get("/api/admin/inventory", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    let toaster_row = inventory.as_array().unwrap().iter().find(|p| p["product_id"] == toaster).unwrap();
    assert_eq!(toaster_row["stock_quantity"], 12);
}

#[actix_web::test]
async fn list_users() {
    let server = TestServer::new().await;
    let (admin, _, _) = admin_and_order(&server).await;
    let (status, users) = server.call_json(get("/api/admin/users", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    let alice = users.iter().find(|u| u["email"] == "alice@example.com").unwrap();
    assert_eq!(alice["balance"], 7000);
    assert_eq!(alice["role"], "Customer");
}
