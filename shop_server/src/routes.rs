//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Store and cache calls are all asynchronous, so handlers only ever
//! `.await` them and never block.
//!
//! Routes under `/api` are wrapped in [`SessionAuthFactory`](crate::middleware::SessionAuthFactory), so their handlers
//! can rely on a `SessionData` being present. Admin routes are additionally wrapped in the ACL middleware.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use shop_engine::{
    db_types::{NewProduct, Role, SessionData},
    notifications::NotificationInbox,
    AccountApi,
    AccountManagement,
    AdminApi,
    AuthApi,
    CacheBackend,
    CartApi,
    CartManagement,
    CatalogApi,
    CatalogManagement,
    CheckoutApi,
    CheckoutRequest,
    OrderManagement,
};

use crate::{
    data_objects::{
        AddToCartParams,
        BalanceResponse,
        CreatedResponse,
        Credentials,
        JsonResponse,
        ManufacturerParams,
        NotificationsResponse,
        QuantityParams,
        SearchParams,
        StatusUpdateParams,
        TopUpParams,
    },
    errors::ServerError,
    middleware::AccessToken,
    session_feeds::SessionFeeds,
};

/// How many inbox entries `/api/notifications` returns.
pub const INBOX_PAGE_SIZE: usize = 20;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Every generic handler takes the store backend `B` and the cache backend `C` as type parameters.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B, C>(core::marker::PhantomData<fn() -> (B, C)>); }
        paste::paste! { impl<B, C> [<$name:camel Route>]<B, C> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<B, C> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B, C>
        where
            B: $($bounds +)+ 'static,
            C: shop_engine::CacheBackend,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B, C>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<B, C>(core::marker::PhantomData<fn() -> (B, C)>); }
        paste::paste! { impl<B, C> [<$name:camel Route>]<B, C> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<B, C> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B, C>
        where
            B: $($bounds +)+ 'static,
            C: shop_engine::CacheBackend,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B, C>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/register" impl AccountManagement);
/// Creates a customer account and logs the new customer in. Responds with the access token.
pub async fn register<B: AccountManagement, C: CacheBackend>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let Credentials { email, password } = body.into_inner();
    debug!("💻️ POST register for {email}");
    let token = api.register(&email, &password).await?;
    Ok(HttpResponse::Created().json(token))
}

route!(auth => Post "/auth" impl AccountManagement);
/// Exchanges an email and password for an access token.
///
/// The token must be sent as `Authorization: Bearer <token>` on every `/api` request. It expires after the configured
/// session lifetime and does NOT refresh.
pub async fn auth<B: AccountManagement, C: CacheBackend>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let Credentials { email, password } = body.into_inner();
    trace!("💻️ Received auth request for {email}");
    let token = api.authenticate(&email, &password).await?;
    Ok(HttpResponse::Ok().json(token))
}

route!(profile => Get "/profile" impl AccountManagement);
pub async fn profile<B: AccountManagement, C: CacheBackend>(
    token: web::ReqData<AccessToken>,
    api: web::Data<AuthApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let user = api.get_profile(&token.0).await?;
    debug!("💻️ GET profile for user {}", user.user_id);
    Ok(HttpResponse::Ok().json(user))
}

/// The session behind the access token.
#[get("/session")]
pub async fn my_session(session: web::ReqData<SessionData>) -> impl Responder {
    HttpResponse::Ok().json(session.into_inner())
}

route!(logout => Post "/logout" impl AccountManagement);
/// Ends the session and stops its live notifications.
pub async fn logout<B: AccountManagement, C: CacheBackend>(
    token: web::ReqData<AccessToken>,
    session: web::ReqData<SessionData>,
    api: web::Data<AuthApi<B, C>>,
    feeds: web::Data<SessionFeeds<C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST logout for user {}", session.user_id);
    feeds.detach(&token.0).await;
    api.logout(&token.0).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Logged out")))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
pub async fn products<B: CatalogManagement, C: CacheBackend>(
    api: web::Data<CatalogApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.list_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_search => Get "/products/search" impl CatalogManagement);
/// Fuzzy search over product names: `/products/search?q=чайник`.
pub async fn product_search<B: CatalogManagement, C: CacheBackend>(
    query: web::Query<SearchParams>,
    api: web::Data<CatalogApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET product search for [{}]", query.q);
    let hits = api.search_products(&query.q).await?;
    Ok(HttpResponse::Ok().json(hits))
}

route!(product_by_id => Get "/products/{product_id}" impl CatalogManagement);
/// Product details, with the manufacturer and reviews.
pub async fn product_by_id<B: CatalogManagement, C: CacheBackend>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET product {product_id}");
    let details = api.product_details(product_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl CartManagement, CatalogManagement);
pub async fn my_cart<B: CartManagement + CatalogManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    api: web::Data<CartApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for user {}", session.user_id);
    let cart = api.cart_view(session.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart" impl CartManagement, CatalogManagement);
pub async fn add_to_cart<B: CartManagement + CatalogManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    body: web::Json<AddToCartParams>,
    api: web::Data<CartApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let AddToCartParams { product_id, quantity } = body.into_inner();
    debug!("💻️ POST cart: user {} adds {quantity} of product {product_id}", session.user_id);
    api.add_to_cart(session.user_id, product_id, quantity).await?;
    let cart = api.cart_view(session.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(set_cart_quantity => Patch "/cart/{product_id}" impl CartManagement, CatalogManagement);
/// Sets the quantity of one cart line. A quantity of zero removes the line.
pub async fn set_cart_quantity<B: CartManagement + CatalogManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    path: web::Path<i64>,
    body: web::Json<QuantityParams>,
    api: web::Data<CartApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let quantity = body.quantity;
    debug!("💻️ PATCH cart: user {} sets product {product_id} to {quantity}", session.user_id);
    api.set_quantity(session.user_id, product_id, quantity).await?;
    let cart = api.cart_view(session.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl CartManagement, CatalogManagement);
pub async fn clear_cart<B: CartManagement + CatalogManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    api: web::Data<CartApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for user {}", session.user_id);
    api.clear(session.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared")))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CartManagement, OrderManagement, AccountManagement);
/// Places an order for the caller's cart. The body is optional and may carry quantity overrides:
/// `{"overrides": [{"product_id": 1, "quantity": 2}]}`.
pub async fn checkout<B: CartManagement + OrderManagement + AccountManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    body: Option<web::Json<CheckoutRequest>>,
    api: web::Data<CheckoutApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    info!("💻️ POST checkout for user {}", session.user_id);
    let receipt = api.checkout(session.user_id, request).await?;
    Ok(HttpResponse::Created().json(receipt))
}

//----------------------------------------------   Balance & orders  ---------------------------------------------
route!(my_balance => Get "/balance" impl AccountManagement, OrderManagement);
pub async fn my_balance<B: AccountManagement + OrderManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET balance for user {}", session.user_id);
    let balance = api.balance(session.user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { balance }))
}

route!(top_up => Post "/balance/top_up" impl AccountManagement, OrderManagement);
pub async fn top_up<B: AccountManagement + OrderManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    body: web::Json<TopUpParams>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST top up of {} for user {}", body.amount, session.user_id);
    let balance = api.top_up(session.user_id, body.amount).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { balance }))
}

route!(my_orders => Get "/orders" impl AccountManagement, OrderManagement);
pub async fn my_orders<B: AccountManagement + OrderManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET orders for user {}", session.user_id);
    let orders = api.orders(session.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/orders/{order_id}" impl AccountManagement, OrderManagement);
/// One of the caller's orders. Other users' orders are reported as not found, whether they exist or not.
pub async fn my_order<B: AccountManagement + OrderManagement, C: CacheBackend>(
    session: web::ReqData<SessionData>,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ GET order {order_id} for user {}", session.user_id);
    let order = api.order(session.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Notifications  ----------------------------------------------
// The notification handlers only depend on the cache, so they are registered directly in `server.rs`.

/// The caller's inbox, plus the live feed for this session. The first call starts the session's live feed.
pub async fn notifications<C: CacheBackend>(
    session: web::ReqData<SessionData>,
    token: web::ReqData<AccessToken>,
    inbox: web::Data<NotificationInbox<C>>,
    feeds: web::Data<SessionFeeds<C>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET notifications for user {}", session.user_id);
    let feed = feeds.attach(&token.0, &session).await;
    let inbox_items = inbox.list(session.user_id, INBOX_PAGE_SIZE).await?;
    let unread = inbox_items.iter().filter(|n| !n.read).count();
    Ok(HttpResponse::Ok().json(NotificationsResponse { unread, inbox: inbox_items, live: feed.current() }))
}

pub async fn mark_notification_read<C: CacheBackend>(
    session: web::ReqData<SessionData>,
    path: web::Path<String>,
    inbox: web::Data<NotificationInbox<C>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST mark notification {id} read for user {}", session.user_id);
    if inbox.mark_read(session.user_id, &id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success("Marked as read")))
    } else {
        Err(ServerError::NoRecordFound(format!("Notification {id}")))
    }
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(all_orders => Get "/admin/orders" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
pub async fn all_orders<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.list_all_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_status => Patch "/admin/orders/{order_id}/status" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
/// Sets an order's status. The body is `{"status": "Shipped"}`, using the canonical status names.
pub async fn order_status<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    path: web::Path<i64>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ PATCH order {order_id} status to {}", body.status);
    let order = api.set_order_status(order_id, &body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(new_product => Post "/admin/products" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
pub async fn new_product<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    body: web::Json<NewProduct>,
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST new product {}", body.name);
    let id = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

route!(product_stock => Put "/admin/products/{product_id}/stock" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
/// Sets the stock level of a product: `{"quantity": 12}`.
pub async fn product_stock<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    path: web::Path<i64>,
    body: web::Json<QuantityParams>,
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    info!("💻️ PUT stock of product {product_id} to {}", body.quantity);
    api.adjust_stock(product_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Stock of product {product_id} updated"))))
}

route!(new_manufacturer => Post "/admin/manufacturers" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
pub async fn new_manufacturer<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    body: web::Json<ManufacturerParams>,
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST new manufacturer {}", body.name);
    let id = api.create_manufacturer(&body.name, &body.country).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

route!(inventory => Get "/admin/inventory" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
pub async fn inventory<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET inventory");
    let stock = api.inventory().await?;
    Ok(HttpResponse::Ok().json(stock))
}

route!(users => Get "/admin/users" impl OrderManagement, CatalogManagement, AccountManagement where requires [Role::Admin]);
pub async fn users<B: OrderManagement + CatalogManagement + AccountManagement, C: CacheBackend>(
    api: web::Data<AdminApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET users");
    let users = api.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}
