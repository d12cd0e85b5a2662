use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatus, OrderWithEmail, PlacedOrder},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Places an order in a single atomic transaction:
    /// * debits the order total from the user's balance, guarded so that the balance cannot go negative,
    /// * persists the quantities the shopper changed at confirmation time,
    /// * re-reads the cart and rejects the order with `CartChanged` if its total no longer matches,
    /// * decrements stock for every line, guarded so that stock cannot go negative,
    /// * inserts the order with `Pending` status along with its items,
    /// * clears the cart.
    ///
    /// Any failure rolls back every step.
    async fn place_order(&self, order: NewOrder) -> Result<PlacedOrder, StoreError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;

    /// The user's orders, newest first.
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError>;

    /// Every order along with the owner's email address, newest first.
    async fn list_all_orders(&self) -> Result<Vec<OrderWithEmail>, StoreError>;

    /// Unconditionally sets the order status and returns the updated order.
    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<Order, StoreError>;
}
