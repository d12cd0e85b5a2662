#![allow(dead_code)]
use shop_common::Money;
use shop_engine::{
    db_types::{NewProduct, NewUser, Role},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountManagement,
    CatalogManagement,
    MemoryCache,
    PasswordHasher,
    ShopError,
    SqliteDatabase,
};

/// Stores passwords as-is, so that tests do not pay for Argon2.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, ShopError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain:") == Some(password)
    }
}

pub struct TestShop {
    pub url: String,
    pub db: SqliteDatabase,
    pub cache: MemoryCache,
}

impl TestShop {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        Self { url, db, cache: MemoryCache::new() }
    }

    pub async fn customer(&self, email: &str, balance: &str) -> i64 {
        self.user(email, balance, Role::Customer).await
    }

    pub async fn user(&self, email: &str, balance: &str, role: Role) -> i64 {
        let user = self
            .db
            .create_user(NewUser { email: email.to_string(), password_hash: "plain:secret".to_string(), role })
            .await
            .expect("Error creating user");
        let balance: Money = balance.parse().expect("Not a valid amount");
        if balance.is_positive() {
            self.db.top_up(user.user_id, balance).await.expect("Error topping up");
        }
        user.user_id
    }

    pub async fn product(&self, name: &str, price: &str, stock: i64) -> i64 {
        let price: Money = price.parse().expect("Not a valid price");
        self.db.create_product(NewProduct::new(name, price, stock)).await.expect("Error creating product")
    }

    pub async fn balance(&self, user_id: i64) -> Money {
        self.db.balance(user_id).await.expect("Error fetching balance")
    }

    pub async fn stock(&self, product_id: i64) -> i64 {
        self.db.peek_stock(product_id).await.expect("Error fetching stock")
    }
}

pub fn money(s: &str) -> Money {
    s.parse().expect("Not a valid amount")
}
