mod support;

use shop_engine::{
    cache::keys,
    db_types::Role,
    notifications::{NotificationInbox, Severity},
    AccountApi,
    AdminApi,
    AuthApi,
    CacheBackend,
    CartApi,
    CartManagement,
    CatalogApi,
    CatalogManagement,
    ShopError,
    StoreError,
};
use support::{money, PlainHasher, TestShop};

#[tokio::test]
async fn register_login_logout() {
    let shop = TestShop::new().await;
    let auth = AuthApi::new(shop.db.clone(), shop.cache.clone()).with_hasher(PlainHasher);

    let token = auth.register(" Alice@Example.com ", "secret").await.unwrap();
    assert_eq!(token.role, Role::Customer);
    assert_eq!(token.access_token.len(), 48);
    let session = auth.get_session(&token.access_token).await.unwrap();
    assert_eq!(session.email, "alice@example.com");
    assert_eq!(session.user_id, token.user_id);
    let stored = shop.cache.get(&keys::token(token.user_id)).await.unwrap();
    assert_eq!(stored.as_deref(), Some(token.access_token.as_str()));

    let err = auth.register("alice@example.com", "other").await.unwrap_err();
    assert_eq!(err, ShopError::DuplicateEmail("alice@example.com".to_string()));
    assert!(auth.register("not-an-email", "secret").await.unwrap_err().is_invalid_input());
    assert!(auth.register("bob@example.com", "").await.unwrap_err().is_invalid_input());

    assert_eq!(auth.authenticate("alice@example.com", "wrong").await.unwrap_err(), ShopError::AuthFailure);
    assert_eq!(auth.authenticate("nobody@example.com", "secret").await.unwrap_err(), ShopError::AuthFailure);
    let second = auth.authenticate("ALICE@example.com", "secret").await.unwrap();
    assert_ne!(second.access_token, token.access_token);

    let profile = auth.get_profile(&second.access_token).await.unwrap();
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(profile.balance, money("0"));

    auth.logout(&second.access_token).await.unwrap();
    assert_eq!(auth.get_session(&second.access_token).await.unwrap_err(), ShopError::AuthFailure);
    assert!(shop.cache.get(&keys::token(token.user_id)).await.unwrap().is_none());
    // The older session is still live, and logging out twice is fine
    assert!(auth.get_session(&token.access_token).await.is_ok());
    auth.logout(&second.access_token).await.unwrap();
}

#[tokio::test]
async fn balances_and_admins() {
    let shop = TestShop::new().await;
    let alice = shop.customer("alice@example.com", "0").await;
    let accounts = AccountApi::new(shop.db.clone()).with_hasher(PlainHasher);
    assert_eq!(accounts.top_up(alice, money("25.50")).await.unwrap(), money("25.50"));
    assert_eq!(accounts.top_up(alice, money("0.50")).await.unwrap(), money("26.00"));
    assert!(accounts.top_up(alice, money("0")).await.unwrap_err().is_invalid_input());
    assert!(accounts.top_up(alice, money("-5")).await.unwrap_err().is_invalid_input());
    assert!(matches!(accounts.top_up(alice + 100, money("5")).await, Err(ShopError::NotFound(_))));
    assert_eq!(accounts.balance(alice).await.unwrap(), money("26.00"));

    let admin = accounts.create_admin("root@example.com", "hunter2").await.unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.balance, money("0"));
    assert!(matches!(accounts.create_admin("root@example.com", "x").await, Err(ShopError::DuplicateEmail(_))));

    let auth = AuthApi::new(shop.db.clone(), shop.cache.clone()).with_hasher(PlainHasher);
    let token = auth.authenticate("root@example.com", "hunter2").await.unwrap();
    assert_eq!(token.role, Role::Admin);
    assert!(auth.get_session(&token.access_token).await.unwrap().is_admin());

    accounts.set_role(alice, Role::Admin).await.unwrap();
    assert_eq!(accounts.user(alice).await.unwrap().role, Role::Admin);
    assert!(accounts.orders(alice).await.unwrap().is_empty());
    assert!(matches!(accounts.order(alice, 1).await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn cart_edits_respect_stock() {
    let shop = TestShop::new().await;
    let alice = shop.customer("alice@example.com", "0").await;
    let kettle = shop.product("Чайник", "30.00", 3).await;
    let mug = shop.product("Кружка", "5.00", 10).await;
    let carts = CartApi::new(shop.db.clone(), shop.cache.clone());

    let err = carts.add_to_cart(alice, kettle, 4).await.unwrap_err();
    assert_eq!(err, ShopError::InsufficientStock { product_id: kettle, requested: 4, available: 3 });
    assert!(carts.add_to_cart(alice, kettle, 0).await.unwrap_err().is_invalid_input());
    assert!(matches!(carts.add_to_cart(alice, 999, 1).await, Err(ShopError::NotFound(_))));

    carts.add_to_cart(alice, kettle, 1).await.unwrap();
    carts.add_to_cart(alice, kettle, 2).await.unwrap();
    carts.add_to_cart(alice, mug, 2).await.unwrap();
    let view = carts.cart_view(alice).await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.total.total_quantity, 5);
    assert_eq!(view.total.total_price, money("100.00"));

    // Served from the cache until the next write
    assert!(!shop.cache.hget_all(&keys::cart(alice)).await.unwrap().is_empty());
    carts.set_quantity(alice, kettle, 0).await.unwrap();
    assert!(shop.cache.hget_all(&keys::cart(alice)).await.unwrap().is_empty());
    let view = carts.cart_view(alice).await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].product_id, mug);
    assert!(carts.set_quantity(alice, mug, -1).await.unwrap_err().is_invalid_input());
    let err = carts.set_quantity(alice, mug, i64::MAX / 2).await.unwrap_err();
    assert_eq!(err, ShopError::InsufficientStock { product_id: mug, requested: i64::MAX / 2, available: 10 });
    assert_eq!(carts.cart_view(alice).await.unwrap().total.total_quantity, 2);

    carts.clear(alice).await.unwrap();
    assert!(carts.cart(alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_reads_and_search() {
    let shop = TestShop::new().await;
    let alice = shop.customer("alice@example.com", "0").await;
    let bosch = shop.db.create_manufacturer("Bosch", "Германия").await.unwrap();
    let kettle = shop
        .db
        .create_product(
            shop_engine::db_types::NewProduct::new("Электрический чайник", money("30.00"), 3)
                .with_manufacturer(bosch)
                .with_warranty(24),
        )
        .await
        .unwrap();
    shop.product("Ноутбук Lenovo", "500.00", 2).await;
    shop.product("Чайник заварочный", "12.00", 8).await;
    shop.db.add_review(kettle, alice, 5, "Отлично").await.unwrap();
    shop.db.add_review(kettle, alice, 4, "Хорошо").await.unwrap();
    assert!(shop.db.add_review(kettle, alice, 6, "Слишком хорошо").await.is_err());

    let catalog = CatalogApi::new(shop.db.clone(), shop.cache.clone());
    assert_eq!(catalog.list_products().await.unwrap().len(), 3);
    let details = catalog.product_details(kettle).await.unwrap();
    assert_eq!(details.manufacturer.as_ref().map(|m| m.name.as_str()), Some("Bosch"));
    assert_eq!(details.reviews.len(), 2);
    assert_eq!(details.average_rating(), Some(4.5));
    let snapshot = shop.cache.hget_all(&keys::product(kettle)).await.unwrap();
    assert!(snapshot["reviews"].contains("Отлично"));
    assert_eq!(catalog.product_details(kettle).await.unwrap(), details);
    assert!(matches!(catalog.product_details(999).await, Err(ShopError::NotFound(_))));
    assert!(matches!(catalog.product(999).await, Err(ShopError::NotFound(_))));

    // A corrupt cache entry is discarded and refilled from the store
    shop.cache.hset_all(&keys::product(kettle), &[("name".into(), "junk".into())], None).await.unwrap();
    assert_eq!(catalog.product(kettle).await.unwrap().name, "Электрический чайник");
    assert_eq!(catalog.stock(kettle).await.unwrap(), 3);

    let hits = catalog.search_products("чайник").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.name.to_lowercase().contains("чайник")));
    assert!(catalog.search_products("   ").await.unwrap().is_empty());
    assert!(catalog.search_products("холодильник").await.unwrap().is_empty());
}

#[tokio::test]
async fn inbox_read_state() {
    let shop = TestShop::new().await;
    let inbox = NotificationInbox::new(shop.cache.clone());
    let first = inbox.notify(7, "Привет", Severity::Info).await.unwrap();
    inbox.notify(7, "Ещё раз", Severity::Error).await.unwrap();
    assert_eq!(inbox.unread_count(7).await.unwrap(), 2);
    assert!(inbox.mark_read(7, &first.id).await.unwrap());
    assert_eq!(inbox.unread_count(7).await.unwrap(), 1);
    assert_eq!(inbox.list(7, 1).await.unwrap()[0].message, "Ещё раз");
}

#[tokio::test]
async fn writes_are_visible_to_the_whole_pool() {
    let shop = TestShop::new().await;
    let auth = AuthApi::new(shop.db.clone(), shop.cache.clone()).with_hasher(PlainHasher);
    let accounts = AccountApi::new(shop.db.clone()).with_hasher(PlainHasher);
    let admin = AdminApi::new(shop.db.clone(), shop.cache.clone());
    let catalog = CatalogApi::new(shop.db.clone(), shop.cache.clone());
    // Hold one connection so that reads and writes are spread over the others
    let _held = shop.db.pool().acquire().await.unwrap();

    for i in 0..5 {
        let token = auth.register(&format!("user{i}@example.com"), "secret").await.unwrap();
        let profile = auth.get_profile(&token.access_token).await.unwrap();
        assert_eq!(profile.user_id, token.user_id);

        let balance = accounts.top_up(token.user_id, money("1.00")).await.unwrap();
        assert_eq!(balance, money("1.00"));
        assert_eq!(accounts.balance(token.user_id).await.unwrap(), money("1.00"));

        let product_id = admin
            .create_product(shop_engine::db_types::NewProduct::new(format!("Товар {i}"), money("2.00"), 4))
            .await
            .unwrap();
        assert_eq!(catalog.product(product_id).await.unwrap().name, format!("Товар {i}"));
        admin.adjust_stock(product_id, 9).await.unwrap();
        assert_eq!(catalog.stock(product_id).await.unwrap(), 9);
    }
}

#[tokio::test]
async fn oversized_cart_lines_are_rejected_without_panicking() {
    let shop = TestShop::new().await;
    let bob = shop.customer("bob@example.com", "0").await;
    let kettle = shop.product("Чайник", "30.00", 3).await;
    // Written straight to the store, past the stock check
    shop.db.set_line_quantity(bob, kettle, i64::MAX / 2).await.unwrap();

    let carts = CartApi::new(shop.db.clone(), shop.cache.clone());
    assert!(carts.cart_view(bob).await.unwrap_err().is_invalid_input());
    assert!(matches!(shop.db.cart_total(bob).await, Err(StoreError::InvalidInput(_))));
    carts.set_quantity(bob, kettle, 1).await.unwrap();
    assert_eq!(carts.cart_view(bob).await.unwrap().total.total_price, money("30.00"));
}
