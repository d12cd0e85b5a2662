use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use chrono::Utc;
use log::debug;
use serde_json::Value;
use shop_common::Money;
use shop_engine::{
    db_types::{NewProduct, NewUser, Role, SessionData},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountManagement,
    CatalogManagement,
    MemoryCache,
    ShopCache,
    SqliteDatabase,
};

use crate::{config::ServerOptions, server::configure_shop, session_feeds::SessionFeeds};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A fresh database and cache behind the full set of routes.
pub struct TestServer {
    pub db: SqliteDatabase,
    pub cache: MemoryCache,
    pub feeds: web::Data<SessionFeeds<MemoryCache>>,
}

impl TestServer {
    pub async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let cache = MemoryCache::new();
        let feeds = web::Data::new(SessionFeeds::new(cache.clone(), Duration::from_secs(2)));
        Self { db, cache, feeds }
    }

    /// Sends the request and returns the status and body. Errors raised by middleware are turned into responses,
    /// as the running server would.
    pub async fn call(&self, req: TestRequest) -> (StatusCode, String) {
        let (db, cache, feeds) = (self.db.clone(), self.cache.clone(), self.feeds.clone());
        let app = test::init_service(
            App::new().configure(move |cfg| configure_shop(cfg, db, cache, ServerOptions::default(), feeds)),
        )
        .await;
        match test::try_call_service(&app, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = test::read_body(res).await;
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = actix_web::body::to_bytes(res.into_body()).await.unwrap();
                debug!("Request was rejected with {status}");
                (status, String::from_utf8_lossy(&body).into_owned())
            },
        }
    }

    pub async fn call_json(&self, req: TestRequest) -> (StatusCode, Value) {
        let (status, body) = self.call(req).await;
        let value = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {body}"));
        (status, value)
    }

    pub async fn user(&self, email: &str, balance: &str, role: Role) -> i64 {
        let user = self
            .db
            .create_user(NewUser { email: email.to_string(), password_hash: "-".to_string(), role })
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

    /// Starts a session for the user without a password login, and returns its access token.
    pub async fn login(&self, user_id: i64, role: Role) -> String {
        let token = format!("test-token-{}", NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        let session = SessionData { user_id, email: format!("user{user_id}@example.com"), role, created_at: Utc::now() };
        ShopCache::new(self.cache.clone())
            .store_session(&token, &session, Duration::from_secs(3600))
            .await
            .expect("Error storing session");
        token
    }
}

pub fn get(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::get().uri(path), token)
}

pub fn post(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::post().uri(path), token)
}

pub fn patch(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::patch().uri(path), token)
}

pub fn put(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::put().uri(path), token)
}

pub fn delete(path: &str, token: &str) -> TestRequest {
    with_token(TestRequest::delete().uri(path), token)
}

fn with_token(req: TestRequest, token: &str) -> TestRequest {
    if token.is_empty() {
        req
    } else {
        req.insert_header((AUTHORIZATION, format!("Bearer {token}")))
    }
}
