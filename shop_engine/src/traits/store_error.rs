use shop_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not enough stock for product {product_id}. Requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Insufficient funds. Required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },
    #[error("The email address {0} is already registered")]
    DuplicateEmail(String),
    #[error("The cart changed during checkout. Expected a total of {expected}, found {actual}")]
    CartChanged { expected: Money, actual: Money },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
