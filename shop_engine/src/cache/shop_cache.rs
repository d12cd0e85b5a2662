use std::{collections::HashMap, time::Duration};

use log::*;
use serde::{de::DeserializeOwned, Serialize};
use shop_common::Money;

use crate::{
    cache::{keys, ttl, CacheBackend, CacheError},
    db_types::{CartItem, OrderStatus, Product, ProductDetails, SessionData},
};

/// Typed access to the cache.
///
/// Product and cart snapshots are written on a read miss and deleted whenever the underlying data changes. They are
/// never updated in place. Entries that cannot be decoded are deleted and reported as a miss.
#[derive(Debug, Clone)]
pub struct ShopCache<C> {
    backend: C,
}

fn product_fields(product: &Product) -> Vec<(String, String)> {
    vec![
        ("product_id".into(), product.product_id.to_string()),
        ("name".into(), product.name.clone()),
        ("price".into(), product.price.cents().to_string()),
        ("description".into(), product.description.clone()),
        ("warranty_period".into(), product.warranty_period.to_string()),
        ("manufacturer_id".into(), product.manufacturer_id.map(|id| id.to_string()).unwrap_or_default()),
        ("stock_quantity".into(), product.stock_quantity.to_string()),
    ]
}

fn product_from_fields(fields: &HashMap<String, String>) -> Option<Product> {
    let int = |name: &str| fields.get(name).and_then(|v| v.parse::<i64>().ok());
    let manufacturer_id = match fields.get("manufacturer_id")?.as_str() {
        "" => None,
        id => Some(id.parse::<i64>().ok()?),
    };
    Some(Product {
        product_id: int("product_id")?,
        name: fields.get("name")?.clone(),
        price: Money::from_cents(int("price")?),
        description: fields.get("description")?.clone(),
        warranty_period: int("warranty_period")?,
        manufacturer_id,
        stock_quantity: int("stock_quantity")?,
    })
}

impl<C: CacheBackend> ShopCache<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    async fn discard(&self, key: &str) {
        warn!("💾️ Discarding undecodable cache entry {key}");
        if let Err(e) = self.backend.delete(key).await {
            warn!("💾️ Could not delete {key}: {e}");
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                self.discard(key).await;
                Ok(None)
            },
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw, ttl).await
    }

    //---------------------------------------------   Products   ----------------------------------------------------
    pub async fn cache_product(&self, product: &Product) -> Result<(), CacheError> {
        let key = keys::product(product.product_id);
        self.backend.hset_all(&key, &product_fields(product), Some(ttl::PRODUCT)).await?;
        self.backend.sadd(keys::PRODUCTS_ALL, &product.product_id.to_string()).await?;
        trace!("💾️ Cached product {}", product.product_id);
        Ok(())
    }

    pub async fn cached_product(&self, product_id: i64) -> Result<Option<Product>, CacheError> {
        let key = keys::product(product_id);
        let fields = self.backend.hget_all(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        match product_from_fields(&fields) {
            Some(p) if p.product_id == product_id => Ok(Some(p)),
            _ => {
                self.discard(&key).await;
                Ok(None)
            },
        }
    }

    /// Caches the product together with its manufacturer and reviews. The scalar fields are shared with
    /// [`Self::cache_product`]; the manufacturer and the reviews are stored as JSON fields.
    pub async fn cache_product_details(&self, details: &ProductDetails) -> Result<(), CacheError> {
        let product_id = details.product.product_id;
        let mut fields = product_fields(&details.product);
        fields.push(("manufacturer".into(), serde_json::to_string(&details.manufacturer)?));
        fields.push(("reviews".into(), serde_json::to_string(&details.reviews)?));
        self.backend.hset_all(&keys::product(product_id), &fields, Some(ttl::PRODUCT)).await?;
        self.backend.sadd(keys::PRODUCTS_ALL, &product_id.to_string()).await?;
        trace!("💾️ Cached product {product_id} with {} reviews", details.reviews.len());
        Ok(())
    }

    /// A snapshot written by [`Self::cache_product`] alone carries no reviews, and counts as a miss here.
    pub async fn cached_product_details(&self, product_id: i64) -> Result<Option<ProductDetails>, CacheError> {
        let key = keys::product(product_id);
        let fields = self.backend.hget_all(&key).await?;
        let (Some(manufacturer), Some(reviews)) = (fields.get("manufacturer"), fields.get("reviews")) else {
            return Ok(None);
        };
        let details = product_from_fields(&fields).filter(|p| p.product_id == product_id).and_then(|product| {
            Some(ProductDetails {
                product,
                manufacturer: serde_json::from_str(manufacturer).ok()?,
                reviews: serde_json::from_str(reviews).ok()?,
            })
        });
        if details.is_none() {
            self.discard(&key).await;
        }
        Ok(details)
    }

    pub async fn invalidate_product(&self, product_id: i64) -> Result<(), CacheError> {
        self.backend.delete(&keys::product(product_id)).await?;
        self.backend.srem(keys::PRODUCTS_ALL, &product_id.to_string()).await?;
        trace!("💾️ Invalidated product {product_id}");
        Ok(())
    }

    pub async fn index_product(&self, product_id: i64) -> Result<(), CacheError> {
        self.backend.sadd(keys::PRODUCTS_ALL, &product_id.to_string()).await
    }

    /// The ids in the product index. Malformed members are skipped.
    pub async fn indexed_products(&self) -> Result<Vec<i64>, CacheError> {
        let members = self.backend.smembers(keys::PRODUCTS_ALL).await?;
        let mut ids = members.iter().filter_map(|m| m.parse::<i64>().ok()).collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }

    //---------------------------------------------     Carts    ----------------------------------------------------
    pub async fn cache_cart(&self, user_id: i64, items: &[CartItem]) -> Result<(), CacheError> {
        let fields = items
            .iter()
            .map(|item| Ok((item.product_id.to_string(), serde_json::to_string(item)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;
        self.backend.hset_all(&keys::cart(user_id), &fields, Some(ttl::CART)).await
    }

    pub async fn cached_cart(&self, user_id: i64) -> Result<Option<Vec<CartItem>>, CacheError> {
        let key = keys::cart(user_id);
        let fields = self.backend.hget_all(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        let items = fields.values().map(|v| serde_json::from_str::<CartItem>(v)).collect::<Result<Vec<_>, _>>();
        match items {
            Ok(mut items) if items.iter().all(|i| i.user_id == user_id) => {
                items.sort_by_key(|i| (i.added_date, i.product_id));
                Ok(Some(items))
            },
            _ => {
                self.discard(&key).await;
                Ok(None)
            },
        }
    }

    pub async fn invalidate_cart(&self, user_id: i64) -> Result<(), CacheError> {
        self.backend.delete(&keys::cart(user_id)).await?;
        Ok(())
    }

    //---------------------------------------------    Orders    ----------------------------------------------------
    pub async fn record_order_status(&self, order_id: i64, status: OrderStatus) -> Result<(), CacheError> {
        self.backend.set(&keys::order_status(order_id), &status.to_string(), None).await
    }

    pub async fn cached_order_status(&self, order_id: i64) -> Result<Option<OrderStatus>, CacheError> {
        let key = keys::order_status(order_id);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(None);
        };
        match raw.parse::<OrderStatus>() {
            Ok(status) => Ok(Some(status)),
            Err(_) => {
                self.discard(&key).await;
                Ok(None)
            },
        }
    }

    pub async fn record_user_order(&self, user_id: i64, order_id: i64) -> Result<(), CacheError> {
        self.backend.sadd(&keys::user_orders(user_id), &order_id.to_string()).await
    }

    pub async fn cached_user_orders(&self, user_id: i64) -> Result<Vec<i64>, CacheError> {
        let members = self.backend.smembers(&keys::user_orders(user_id)).await?;
        let mut ids = members.iter().filter_map(|m| m.parse::<i64>().ok()).collect::<Vec<_>>();
        ids.sort_unstable();
        Ok(ids)
    }

    //---------------------------------------------   Sessions   ----------------------------------------------------
    /// Stores the session under `session:{token}` and records the token under `token:{user_id}`.
    pub async fn store_session(&self, token: &str, session: &SessionData, ttl: Duration) -> Result<(), CacheError> {
        self.set_json(&keys::session(token), session, Some(ttl)).await?;
        self.backend.set(&keys::token(session.user_id), token, Some(ttl::TOKEN)).await
    }

    pub async fn session(&self, token: &str) -> Result<Option<SessionData>, CacheError> {
        self.get_json(&keys::session(token)).await
    }

    pub async fn token_for_user(&self, user_id: i64) -> Result<Option<String>, CacheError> {
        self.backend.get(&keys::token(user_id)).await
    }

    /// Removes the session. The user's token record is removed too, unless it already points at a newer token.
    pub async fn remove_session(&self, token: &str, user_id: i64) -> Result<(), CacheError> {
        self.backend.delete(&keys::session(token)).await?;
        if self.token_for_user(user_id).await?.as_deref() == Some(token) {
            self.backend.delete(&keys::token(user_id)).await?;
        }
        Ok(())
    }

    //---------------------------------------------   General    ----------------------------------------------------
    /// Caches an arbitrary value under `cache:{key}` for five minutes.
    pub async fn cache_data<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_json(&keys::cached(key), value, Some(ttl::CACHE)).await
    }

    pub async fn cached_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_json(&keys::cached(key)).await
    }

    pub async fn invalidate_data(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(&keys::cached(key)).await?;
        Ok(())
    }

    /// Stores a short-lived value under `temp:{key}` for ten minutes.
    pub async fn store_temp<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_json(&keys::temp(key), value, Some(ttl::TEMP)).await
    }

    pub async fn temp<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_json(&keys::temp(key)).await
    }
}
