//! Product listings, details and search.

use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{CacheBackend, ShopCache},
    db_types::{Product, ProductBrief, ProductDetails},
    helpers::partial_ratio,
    shop_api::{best_effort, errors::ShopError},
    traits::CatalogManagement,
};

/// Search hits must score above this.
pub const SEARCH_MIN_SCORE: u8 = 50;
/// At most this many search hits are returned.
pub const SEARCH_MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub product_id: i64,
    pub name: String,
    pub score: u8,
}

pub struct CatalogApi<B, C> {
    db: B,
    cache: ShopCache<C>,
}

impl<B: Debug, C> Debug for CatalogApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B, C> CatalogApi<B, C>
where
    B: CatalogManagement,
    C: CacheBackend,
{
    pub fn new(db: B, cache: C) -> Self {
        Self { db, cache: ShopCache::new(cache) }
    }

    pub async fn list_products(&self) -> Result<Vec<ProductBrief>, ShopError> {
        Ok(self.db.list_products_brief().await?)
    }

    /// Fetches a product, preferring the cached snapshot. A miss is filled from the store.
    pub async fn product(&self, product_id: i64) -> Result<Product, ShopError> {
        if let Some(Some(product)) = best_effort("read the product cache", self.cache.cached_product(product_id)).await {
            trace!("💾️ Product {product_id} served from the cache");
            return Ok(product);
        }
        let product =
            self.db.fetch_product(product_id).await?.ok_or_else(|| ShopError::NotFound(format!("Product {product_id}")))?;
        best_effort("cache a product", self.cache.cache_product(&product)).await;
        Ok(product)
    }

    /// The product with its manufacturer and reviews, read through the `product:{id}` snapshot.
    pub async fn product_details(&self, product_id: i64) -> Result<ProductDetails, ShopError> {
        if let Some(Some(details)) =
            best_effort("read the product cache", self.cache.cached_product_details(product_id)).await
        {
            trace!("💾️ Details of product {product_id} served from the cache");
            return Ok(details);
        }
        let details = self
            .db
            .product_details(product_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Product {product_id}")))?;
        best_effort("cache product details", self.cache.cache_product_details(&details)).await;
        Ok(details)
    }

    pub async fn stock(&self, product_id: i64) -> Result<i64, ShopError> {
        Ok(self.db.peek_stock(product_id).await?)
    }

    /// Ranks product names against `query`, best match first. A blank query matches nothing.
    pub async fn search_products(&self, query: &str) -> Result<Vec<SearchHit>, ShopError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.db.list_products_brief().await?;
        let hits = rank(query, products);
        debug!("🔍️ Search for '{query}' returned {} hits", hits.len());
        Ok(hits)
    }
}

fn rank(query: &str, products: Vec<ProductBrief>) -> Vec<SearchHit> {
    let mut hits = products
        .into_iter()
        .filter_map(|p| {
            let score = partial_ratio(query, &p.name);
            (score > SEARCH_MIN_SCORE).then_some(SearchHit { product_id: p.product_id, name: p.name, score })
        })
        .collect::<Vec<_>>();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.product_id.cmp(&b.product_id)));
    hits.truncate(SEARCH_MAX_RESULTS);
    hits
}
