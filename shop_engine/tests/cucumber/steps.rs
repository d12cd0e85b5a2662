use cucumber::{then, when};
use shop_common::Money;
use shop_engine::{
    db_types::{OrderStatus, Role},
    notifications::{NotificationReconciler, Principal},
    AccountManagement,
    AdminApi,
    CartApi,
    CartManagement,
    CatalogManagement,
    CheckoutApi,
    CheckoutRequest,
    OrderManagement,
    ShopError,
};

use crate::cucumber::ShopWorld;

fn money(s: &str) -> Money {
    s.parse().expect("Not a valid amount")
}

#[when(expr = "{word} adds {int} of {string} to the cart")]
async fn add_to_cart(world: &mut ShopWorld, email: String, quantity: i64, name: String) {
    let sys = world.system();
    let (user_id, product_id) = (sys.user(&email), sys.product(&name));
    let api = CartApi::new(sys.db.clone(), sys.cache.clone());
    api.add_to_cart(user_id, product_id, quantity).await.expect("Error adding to cart");
}

#[when(expr = "the stock of {string} is set to {int}")]
async fn set_stock(world: &mut ShopWorld, name: String, quantity: i64) {
    let sys = world.system();
    sys.db.set_stock(sys.product(&name), quantity).await.expect("Error setting stock");
}

#[when(expr = "{word} checks out")]
async fn checkout(world: &mut ShopWorld, email: String) {
    let sys = world.system();
    let api = CheckoutApi::new(sys.db.clone(), sys.cache.clone());
    let result = api.checkout(sys.user(&email), CheckoutRequest::default()).await;
    if let Ok(receipt) = &result {
        sys.last_order = Some(receipt.order.order_id);
    }
    sys.last_checkout = Some(result);
}

#[when(expr = "{word} opens a session")]
async fn open_session(world: &mut ShopWorld, email: String) {
    let sys = world.system();
    let principal = Principal::new(sys.user(&email), Role::Customer);
    let reconciler = NotificationReconciler::new(sys.cache.clone(), principal).await;
    sys.sessions.insert(email, reconciler);
}

#[when(expr = "the admin marks the last order as {word}")]
async fn mark_last_order(world: &mut ShopWorld, status: String) {
    let sys = world.system();
    let order_id = sys.last_order.expect("No order has been placed");
    let api = AdminApi::new(sys.db.clone(), sys.cache.clone());
    api.set_order_status(order_id, &status).await.expect("Error updating order status");
}

fn last_checkout(world: &mut ShopWorld) -> &Result<shop_engine::CheckoutReceipt, ShopError> {
    world.system().last_checkout.as_ref().expect("Nobody checked out")
}

#[then(expr = "the checkout succeeds with a total of {word}")]
async fn checkout_succeeds(world: &mut ShopWorld, total: String) {
    let receipt = last_checkout(world).as_ref().expect("Checkout failed");
    assert_eq!(receipt.total, money(&total));
}

#[then("the checkout fails with insufficient funds")]
async fn fails_with_insufficient_funds(world: &mut ShopWorld) {
    let result = last_checkout(world);
    assert!(matches!(result, Err(ShopError::InsufficientFunds { .. })), "Got {result:?}");
}

#[then("the checkout fails with insufficient stock")]
async fn fails_with_insufficient_stock(world: &mut ShopWorld) {
    let result = last_checkout(world);
    assert!(matches!(result, Err(ShopError::InsufficientStock { .. })), "Got {result:?}");
}

#[then("the checkout fails because the cart is empty")]
async fn fails_with_empty_cart(world: &mut ShopWorld) {
    let result = last_checkout(world);
    assert!(matches!(result, Err(ShopError::EmptyCart)), "Got {result:?}");
}

#[then(expr = "{word} has a balance of {word}")]
async fn has_balance(world: &mut ShopWorld, email: String, balance: String) {
    let sys = world.system();
    let actual = sys.db.balance(sys.user(&email)).await.expect("Error fetching balance");
    assert_eq!(actual, money(&balance));
}

#[then(expr = "{string} has {int} in stock")]
async fn has_stock(world: &mut ShopWorld, name: String, stock: i64) {
    let sys = world.system();
    let actual = sys.db.peek_stock(sys.product(&name)).await.expect("Error fetching stock");
    assert_eq!(actual, stock);
}

#[then(expr = "the cart of {word} is empty")]
async fn cart_is_empty(world: &mut ShopWorld, email: String) {
    let sys = world.system();
    let cart = sys.db.cart_for_user(sys.user(&email)).await.expect("Error fetching cart");
    assert!(cart.is_empty());
}

#[then(expr = "the cart of {word} has {int} line(s)")]
async fn cart_has_lines(world: &mut ShopWorld, email: String, lines: usize) {
    let sys = world.system();
    let cart = sys.db.cart_for_user(sys.user(&email)).await.expect("Error fetching cart");
    assert_eq!(cart.len(), lines);
}

#[then(expr = "{word} has {int} order(s)")]
async fn has_orders(world: &mut ShopWorld, email: String, count: usize) {
    let sys = world.system();
    let orders = sys.db.orders_for_user(sys.user(&email)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "{word} has {int} order(s) with status {word}")]
async fn has_orders_with_status(world: &mut ShopWorld, email: String, count: usize, status: String) {
    let sys = world.system();
    let status = status.parse::<OrderStatus>().expect("Not a valid status");
    let orders = sys.db.orders_for_user(sys.user(&email)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
    assert!(orders.iter().all(|o| o.status == status));
}

#[then(expr = "{word} sees the notification {string}")]
async fn sees_notification(world: &mut ShopWorld, email: String, message: String) {
    let sys = world.system();
    let order_id = sys.last_order.expect("No order has been placed");
    let expected = message.replace("{order}", &order_id.to_string());
    let session = sys.sessions.get_mut(&email).expect("No session for this user");
    session.tick().await;
    let messages = session.feed().current().into_iter().map(|n| n.message).collect::<Vec<_>>();
    assert!(messages.contains(&expected), "Expected {expected} in {messages:?}");
}
