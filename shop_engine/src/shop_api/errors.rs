use shop_common::Money;
use thiserror::Error;

use crate::{cache::CacheError, traits::StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} is not a valid order status")]
    InvalidStatus(String),
    #[error("Not enough stock for product {product_id}. Requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Insufficient funds. Required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },
    #[error("The cart is empty")]
    EmptyCart,
    #[error("The email address {0} is already registered")]
    DuplicateEmail(String),
    #[error("Authentication failed")]
    AuthFailure,
    #[error("The cache is unavailable: {0}")]
    TransportFailure(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl ShopError {
    /// `InvalidStatus` is a kind of invalid input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ShopError::InvalidInput(_) | ShopError::InvalidStatus(_))
    }

    /// The message shown to the shopper.
    pub fn user_message(&self) -> String {
        match self {
            ShopError::NotFound(_) => "Запрошенные данные не найдены".to_string(),
            ShopError::InvalidInput(reason) => format!("Некорректные данные: {reason}"),
            ShopError::InvalidStatus(status) => format!("Недопустимый статус заказа: {status}"),
            ShopError::InsufficientStock { requested, available, .. } => format!(
                "Указанное количество товаров ({requested}) превышает доступное на складе ({available} шт.)"
            ),
            ShopError::InsufficientFunds { .. } => "Недостаточно средств на балансе.".to_string(),
            ShopError::EmptyCart => "Ваша корзина пуста.".to_string(),
            ShopError::DuplicateEmail(_) => "Пользователь с таким email уже зарегистрирован".to_string(),
            ShopError::AuthFailure => "Неверный email или пароль".to_string(),
            ShopError::TransportFailure(_) => "Сервис временно недоступен. Попробуйте позже".to_string(),
            ShopError::Unexpected(_) => "Произошла непредвиденная ошибка".to_string(),
        }
    }
}

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DatabaseError(s) => ShopError::Unexpected(s),
            StoreError::ProductNotFound(id) => ShopError::NotFound(format!("Product {id}")),
            StoreError::UserNotFound(id) => ShopError::NotFound(format!("User {id}")),
            StoreError::OrderNotFound(id) => ShopError::NotFound(format!("Order {id}")),
            StoreError::InvalidInput(s) => ShopError::InvalidInput(s),
            StoreError::InsufficientStock { product_id, requested, available } => {
                ShopError::InsufficientStock { product_id, requested, available }
            },
            StoreError::InsufficientFunds { required, available } => {
                ShopError::InsufficientFunds { required, available }
            },
            StoreError::DuplicateEmail(email) => ShopError::DuplicateEmail(email),
            e @ StoreError::CartChanged { .. } => ShopError::InvalidInput(e.to_string()),
        }
    }
}

impl From<CacheError> for ShopError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::TransportFailure(s) => ShopError::TransportFailure(s),
            e => ShopError::Unexpected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn store_errors_map_to_kinds() {
        assert_eq!(ShopError::from(StoreError::ProductNotFound(3)), ShopError::NotFound("Product 3".into()));
        let e = ShopError::from(StoreError::CartChanged { expected: Money::from_units(1), actual: Money::from_units(2) });
        assert!(e.is_invalid_input());
        assert!(ShopError::InvalidStatus("Lost".into()).is_invalid_input());
        assert!(matches!(ShopError::from(StoreError::DatabaseError("boom".into())), ShopError::Unexpected(_)));
    }

    #[test]
    fn cache_errors_map_to_kinds() {
        let e = ShopError::from(CacheError::TransportFailure("down".into()));
        assert_eq!(e, ShopError::TransportFailure("down".into()));
        assert!(matches!(ShopError::from(CacheError::WrongType("k".into())), ShopError::Unexpected(_)));
    }

    #[test]
    fn shopper_messages() {
        assert_eq!(
            ShopError::InsufficientFunds { required: Money::from_units(10), available: Money::from_units(5) }
                .user_message(),
            "Недостаточно средств на балансе."
        );
        let msg = ShopError::InsufficientStock { product_id: 1, requested: 4, available: 3 }.user_message();
        assert!(msg.contains("(4)") && msg.contains("(3 шт.)"));
    }
}
