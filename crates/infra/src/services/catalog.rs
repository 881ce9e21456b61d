//! Product and category browsing plus admin maintenance.
//!
//! Category and featured/new listings go through [`CatalogCache`]; every
//! mutation here ends with [`CatalogCache::invalidate_catalog`] once the unit
//! of work has committed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use shopfront_auth::{Actor, ensure_admin};
use shopfront_catalog::{Category, CategoryInput, NewProduct, Product, ProductFilter, ProductPatch, ProductSort};
use shopfront_core::page::MAX_PAGE_SIZE;
use shopfront_core::{CategoryId, DomainError, Page, PageRequest, ProductId};

use crate::cache::{CacheKey, CatalogCache};
use crate::services::{ProductViews, ServiceResult};
use crate::store::{Store, UnitOfWork};
use crate::views::ProductView;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    cache: Arc<CatalogCache>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<CatalogCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    #[instrument(skip(self, filter), fields(result_count = tracing::field::Empty), err)]
    pub async fn search(&self, filter: &ProductFilter, sort: ProductSort, page: PageRequest) -> ServiceResult<Page<ProductView>> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(DomainError::validation("minPrice must not exceed maxPrice").into());
            }
        }

        let mut uow = self.store.begin().await?;
        let found = uow.search_products(filter, sort, page).await?;
        let views = ProductViews::new().views(uow.as_mut(), &found.items).await?;
        tracing::Span::current().record("result_count", views.len() as u64);

        Ok(Page::new(views, page, found.total_elements))
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<ProductView> {
        let mut uow = self.store.begin().await?;
        let product = existing_product(uow.as_mut(), id).await?;
        Ok(ProductViews::new().view(uow.as_mut(), &product).await?)
    }

    pub async fn featured_products(&self) -> ServiceResult<Arc<Vec<ProductView>>> {
        let filter = ProductFilter {
            featured: Some(true),
            ..ProductFilter::default()
        };
        self.cached_listing(CacheKey::FeaturedProducts, filter).await
    }

    pub async fn new_products(&self) -> ServiceResult<Arc<Vec<ProductView>>> {
        let filter = ProductFilter {
            is_new: Some(true),
            ..ProductFilter::default()
        };
        self.cached_listing(CacheKey::NewProducts, filter).await
    }

    async fn cached_listing(&self, key: CacheKey, filter: ProductFilter) -> ServiceResult<Arc<Vec<ProductView>>> {
        if let Some(hit) = self.cache.products(key) {
            return Ok(hit);
        }
        let generation = self.cache.generation();

        let mut uow = self.store.begin().await?;
        let found = uow
            .search_products(&filter, ProductSort::Newest, PageRequest::new(0, MAX_PAGE_SIZE))
            .await?;
        let views = ProductViews::new().views(uow.as_mut(), &found.items).await?;

        Ok(self.cache.put_products(key, generation, views))
    }

    pub async fn list_categories(&self) -> ServiceResult<Arc<Vec<Category>>> {
        if let Some(hit) = self.cache.categories() {
            return Ok(hit);
        }
        let generation = self.cache.generation();

        let mut uow = self.store.begin().await?;
        let categories = uow.list_categories().await?;
        Ok(self.cache.put_categories(generation, categories))
    }

    pub async fn get_category(&self, id: CategoryId) -> ServiceResult<Category> {
        let mut uow = self.store.begin().await?;
        existing_category(uow.as_mut(), id).await
    }

    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id), err)]
    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> ServiceResult<ProductView> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        if let Some(category_id) = input.category_id {
            existing_category(uow.as_mut(), category_id).await?;
        }

        let product = Product::create(ProductId::new(), input, Utc::now())?;
        uow.save_product(&product).await?;
        let view = ProductViews::new().view(uow.as_mut(), &product).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();

        info!(product_id = %product.id, "product created");
        Ok(view)
    }

    #[instrument(skip(self, actor, patch), fields(user_id = %actor.user_id), err)]
    pub async fn update_product(&self, actor: &Actor, id: ProductId, patch: ProductPatch) -> ServiceResult<ProductView> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        let mut product = uow
            .lock_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if let Some(category_id) = patch.category_id {
            existing_category(uow.as_mut(), category_id).await?;
        }

        product.apply_patch(patch)?;
        uow.save_product(&product).await?;
        let view = ProductViews::new().view(uow.as_mut(), &product).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(view)
    }

    /// Products that appear on an order are kept so order history stays whole.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> ServiceResult<()> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        existing_product(uow.as_mut(), id).await?;
        if uow.product_has_orders(id).await? {
            return Err(DomainError::conflict(format!("product {id} is referenced by orders")).into());
        }

        uow.delete_product(id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();

        info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id), err)]
    pub async fn create_category(&self, actor: &Actor, input: CategoryInput) -> ServiceResult<Category> {
        ensure_admin(actor)?;
        let category = Category::create(CategoryId::new(), input)?;

        let mut uow = self.store.begin().await?;
        if uow.find_category_by_name(&category.name).await?.is_some() {
            return Err(DomainError::conflict(format!("category '{}' already exists", category.name)).into());
        }
        uow.save_category(&category).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(category)
    }

    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id), err)]
    pub async fn update_category(&self, actor: &Actor, id: CategoryId, input: CategoryInput) -> ServiceResult<Category> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        let mut category = existing_category(uow.as_mut(), id).await?;
        category.update(input)?;

        if let Some(other) = uow.find_category_by_name(&category.name).await? {
            if other.id != id {
                return Err(DomainError::conflict(format!("category '{}' already exists", category.name)).into());
            }
        }
        uow.save_category(&category).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(category)
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn delete_category(&self, actor: &Actor, id: CategoryId) -> ServiceResult<()> {
        ensure_admin(actor)?;
        let mut uow = self.store.begin().await?;
        existing_category(uow.as_mut(), id).await?;
        let in_use = uow.count_products_in_category(id).await?;
        if in_use > 0 {
            return Err(DomainError::conflict(format!("category {id} still has {in_use} products")).into());
        }

        uow.delete_category(id).await?;
        uow.commit().await?;
        self.cache.invalidate_catalog();
        Ok(())
    }
}

pub(crate) async fn existing_product(uow: &mut dyn UnitOfWork, id: ProductId) -> ServiceResult<Product> {
    uow.get_product(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
}

async fn existing_category(uow: &mut dyn UnitOfWork, id: CategoryId) -> ServiceResult<Category> {
    uow.get_category(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("category {id}")).into())
}
