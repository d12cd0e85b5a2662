use std::collections::HashMap;

use cucumber::World;
use log::*;
use shop_engine::{
    notifications::NotificationReconciler,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    CheckoutReceipt,
    MemoryCache,
    ShopError,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub system: Option<ShopSystem>,
}

pub struct ShopSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub cache: MemoryCache,
    pub users: HashMap<String, i64>,
    pub products: HashMap<String, i64>,
    pub last_checkout: Option<Result<CheckoutReceipt, ShopError>>,
    pub last_order: Option<i64>,
    pub sessions: HashMap<String, NotificationReconciler<MemoryCache>>,
}

impl std::fmt::Debug for ShopSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShopSystem ({})", self.db_path)
    }
}

impl ShopWorld {
    pub fn system(&mut self) -> &mut ShopSystem {
        self.system.as_mut().expect("Shop not initialised")
    }
}

impl ShopSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        create_database(&db_path).await;
        let db = run_migrations(&db_path).await;
        debug!("🚀️ Created database: {db_path}");
        Self {
            db_path,
            db,
            cache: MemoryCache::new(),
            users: HashMap::new(),
            products: HashMap::new(),
            last_checkout: None,
            last_order: None,
            sessions: HashMap::new(),
        }
    }

    pub fn user(&self, email: &str) -> i64 {
        *self.users.get(email).unwrap_or_else(|| panic!("Unknown user {email}"))
    }

    pub fn product(&self, name: &str) -> i64 {
        *self.products.get(name).unwrap_or_else(|| panic!("Unknown product {name}"))
    }
}
