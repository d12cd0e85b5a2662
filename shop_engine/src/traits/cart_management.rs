use crate::{
    db_types::{CartItem, CartTotal},
    traits::StoreError,
};

/// Per-user cart lines. A line with a quantity of zero does not exist.
#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    /// The user's cart lines, joined with the current product data.
    async fn cart_for_user(&self, user_id: i64) -> Result<Vec<CartItem>, StoreError>;

    /// Adds `quantity` units to the cart, creating the line if necessary. The quantity must be positive.
    async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), StoreError>;

    /// Sets the quantity of a line. Zero removes the line; negative quantities are rejected.
    async fn set_line_quantity(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<(), StoreError>;

    async fn clear_cart(&self, user_id: i64) -> Result<(), StoreError>;

    /// The total price and number of units in the cart, at current prices.
    async fn cart_total(&self, user_id: i64) -> Result<CartTotal, StoreError>;
}
