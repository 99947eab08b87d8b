//! Cached catalog reads.
//!
//! Product lists, single products and the category list are cached with
//! `moka` for 5 minutes. Any write that changes products, categories or
//! stock must call [`CatalogCache::invalidate_all`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use pasteleria_core::PastelId;

use crate::db::products::ProductFilter;
use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{CategoriaConConteo, Pastel};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products(ProductFilter),
    Product(PastelId),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Pastel>>),
    Product(Option<Box<Pastel>>),
    Categories(Arc<Vec<CategoriaConConteo>>),
}

/// Read-through cache in front of the product and category repositories.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { cache }
    }

    /// Products matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the underlying query fails.
    #[instrument(skip(self, pool))]
    pub async fn products(
        &self,
        pool: &SqlitePool,
        filter: ProductFilter,
    ) -> Result<Arc<Vec<Pastel>>, RepositoryError> {
        let key = CacheKey::Products(filter.clone());
        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            debug!("catalog cache hit");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list(&filter).await?);
        self.cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// A single product. Misses are cached too.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the underlying query fails.
    pub async fn product(
        &self,
        pool: &SqlitePool,
        id: PastelId,
    ) -> Result<Option<Pastel>, RepositoryError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            return Ok(product.map(|p| *p));
        }

        let product = ProductRepository::new(pool).get(id).await?;
        self.cache
            .insert(key, CacheValue::Product(product.clone().map(Box::new)))
            .await;
        Ok(product)
    }

    /// Categories with product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the underlying query fails.
    pub async fn categories(
        &self,
        pool: &SqlitePool,
    ) -> Result<Arc<Vec<CategoriaConConteo>>, RepositoryError> {
        if let Some(CacheValue::Categories(categorias)) = self.cache.get(&CacheKey::Categories).await
        {
            return Ok(categorias);
        }

        let categorias = Arc::new(CategoryRepository::new(pool).list_with_counts().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categorias)),
            )
            .await;
        Ok(categorias)
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("catalog cache invalidated");
    }
}
