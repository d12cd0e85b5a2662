//! Cache key names. Every key lives under a logical prefix.

pub const PRODUCTS_ALL: &str = "products:all";

pub fn token(user_id: i64) -> String {
    format!("token:{user_id}")
}

pub fn session(token: &str) -> String {
    format!("session:{token}")
}

pub fn product(product_id: i64) -> String {
    format!("product:{product_id}")
}

pub fn cart(user_id: i64) -> String {
    format!("cart:{user_id}")
}

pub fn order_status(order_id: i64) -> String {
    format!("order:{order_id}:status")
}

pub fn user_orders(user_id: i64) -> String {
    format!("user:{user_id}:orders")
}

pub fn cached(key: &str) -> String {
    format!("cache:{key}")
}

pub fn temp(key: &str) -> String {
    format!("temp:{key}")
}

pub fn notifications(user_id: i64) -> String {
    format!("notifications:{user_id}")
}
