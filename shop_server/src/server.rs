use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
#[cfg(feature = "redis")]
use shop_engine::cache::RedisCache;
use shop_engine::{
    notifications::NotificationInbox,
    AccountApi,
    AdminApi,
    AuthApi,
    CacheBackend,
    CartApi,
    CatalogApi,
    CheckoutApi,
    MemoryCache,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::SessionAuthFactory,
    routes::{
        health,
        mark_notification_read,
        my_session,
        notifications,
        AddToCartRoute,
        AllOrdersRoute,
        AuthRoute,
        CheckoutRoute,
        ClearCartRoute,
        InventoryRoute,
        LogoutRoute,
        MyBalanceRoute,
        MyCartRoute,
        MyOrderRoute,
        MyOrdersRoute,
        NewManufacturerRoute,
        NewProductRoute,
        OrderStatusRoute,
        ProductByIdRoute,
        ProductSearchRoute,
        ProductStockRoute,
        ProductsRoute,
        ProfileRoute,
        RegisterRoute,
        SetCartQuantityRoute,
        TopUpRoute,
        UsersRoute,
    },
    session_feeds::{start_feed_sweeper, SessionFeeds},
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25).await?;
    db.migrate().await?;
    serve_with_configured_cache(config, db).await
}

#[cfg(feature = "redis")]
async fn serve_with_configured_cache(config: ServerConfig, db: SqliteDatabase) -> Result<(), ServerError> {
    match config.redis_url.clone() {
        Some(url) => {
            let cache = RedisCache::connect(url.reveal())
                .await
                .map_err(|e| ServerError::InitializeError(format!("Could not connect to Redis. {e}")))?;
            info!("🚀️ Using Redis for the cache and event bus");
            serve(config, db, cache).await
        },
        None => {
            info!("🚀️ Using the in-memory cache and event bus");
            serve(config, db, MemoryCache::new()).await
        },
    }
}

#[cfg(not(feature = "redis"))]
async fn serve_with_configured_cache(config: ServerConfig, db: SqliteDatabase) -> Result<(), ServerError> {
    if config.redis_url.is_some() {
        warn!("🚀️ SHOP_REDIS_URL is set, but this build does not include Redis support. Using the in-memory cache.");
    }
    info!("🚀️ Using the in-memory cache and event bus");
    serve(config, db, MemoryCache::new()).await
}

async fn serve<C: CacheBackend>(config: ServerConfig, db: SqliteDatabase, cache: C) -> Result<(), ServerError> {
    let feeds = web::Data::new(SessionFeeds::new(cache.clone(), config.notification_poll));
    let _sweeper = start_feed_sweeper(feeds.clone(), SWEEP_INTERVAL);
    let srv = create_server_instance(config, db, cache, feeds)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<C: CacheBackend>(
    config: ServerConfig,
    db: SqliteDatabase,
    cache: C,
    feeds: web::Data<SessionFeeds<C>>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let (db, cache, feeds) = (db.clone(), cache.clone(), feeds.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .configure(|cfg| configure_shop(cfg, db, cache, options, feeds))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the APIs and every route. The server and the endpoint tests build their apps with this.
pub fn configure_shop<C: CacheBackend>(
    cfg: &mut web::ServiceConfig,
    db: SqliteDatabase,
    cache: C,
    options: ServerOptions,
    feeds: web::Data<SessionFeeds<C>>,
) {
    let auth_api = AuthApi::new(db.clone(), cache.clone()).with_session_ttl(options.session_ttl);
    let catalog_api = CatalogApi::new(db.clone(), cache.clone());
    let cart_api = CartApi::new(db.clone(), cache.clone());
    let checkout_api =
        CheckoutApi::new(db.clone(), cache.clone()).with_low_stock_threshold(options.low_stock_threshold);
    let accounts_api = AccountApi::new(db.clone());
    let admin_api = AdminApi::new(db, cache.clone()).with_low_stock_threshold(options.low_stock_threshold);
    let inbox = NotificationInbox::new(cache.clone());
    // Routes that require a session
    let api_scope = web::scope("/api")
        .wrap(SessionAuthFactory::new(cache))
        .service(ProfileRoute::<SqliteDatabase, C>::new())
        .service(my_session)
        .service(LogoutRoute::<SqliteDatabase, C>::new())
        .service(MyCartRoute::<SqliteDatabase, C>::new())
        .service(AddToCartRoute::<SqliteDatabase, C>::new())
        .service(SetCartQuantityRoute::<SqliteDatabase, C>::new())
        .service(ClearCartRoute::<SqliteDatabase, C>::new())
        .service(CheckoutRoute::<SqliteDatabase, C>::new())
        .service(MyBalanceRoute::<SqliteDatabase, C>::new())
        .service(TopUpRoute::<SqliteDatabase, C>::new())
        .service(MyOrdersRoute::<SqliteDatabase, C>::new())
        .service(MyOrderRoute::<SqliteDatabase, C>::new())
        .service(web::resource("/notifications").route(web::get().to(notifications::<C>)))
        .service(web::resource("/notifications/{id}/read").route(web::post().to(mark_notification_read::<C>)))
        .service(AllOrdersRoute::<SqliteDatabase, C>::new())
        .service(OrderStatusRoute::<SqliteDatabase, C>::new())
        .service(NewProductRoute::<SqliteDatabase, C>::new())
        .service(ProductStockRoute::<SqliteDatabase, C>::new())
        .service(NewManufacturerRoute::<SqliteDatabase, C>::new())
        .service(InventoryRoute::<SqliteDatabase, C>::new())
        .service(UsersRoute::<SqliteDatabase, C>::new());
    cfg.app_data(web::Data::new(auth_api))
        .app_data(web::Data::new(catalog_api))
        .app_data(web::Data::new(cart_api))
        .app_data(web::Data::new(checkout_api))
        .app_data(web::Data::new(accounts_api))
        .app_data(web::Data::new(admin_api))
        .app_data(web::Data::new(inbox))
        .app_data(feeds)
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
        )
        .service(health)
        .service(RegisterRoute::<SqliteDatabase, C>::new())
        .service(AuthRoute::<SqliteDatabase, C>::new())
        .service(ProductsRoute::<SqliteDatabase, C>::new())
        // Must come before the product id route
        .service(ProductSearchRoute::<SqliteDatabase, C>::new())
        .service(ProductByIdRoute::<SqliteDatabase, C>::new())
        .service(api_scope);
}
