//! Workflow services. Each operation runs in one unit of work and takes the
//! acting user explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use shopfront_catalog::Product;
use shopfront_core::{CategoryId, UserId};

use crate::cache::CatalogCache;
use crate::notify::OrderEventBus;
use crate::store::{Store, StoreResult, UnitOfWork};
use crate::views::ProductView;

pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod users;
pub mod wishlist;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use dashboard::DashboardService;
pub use error::{ServiceError, ServiceResult};
pub use orders::OrderService;
pub use payments::PaymentService;
pub use reviews::ReviewService;
pub use users::UserService;
pub use wishlist::WishlistService;

/// Every service, wired against one store, cache and bus.
#[derive(Clone)]
pub struct Services {
    pub orders: OrderService,
    pub payments: PaymentService,
    pub cart: CartService,
    pub catalog: CatalogService,
    pub wishlist: WishlistService,
    pub reviews: ReviewService,
    pub dashboard: DashboardService,
    pub users: UserService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, bus: Arc<OrderEventBus>) -> Self {
        let cache = Arc::new(CatalogCache::new());
        Self {
            orders: OrderService::new(store.clone(), bus.clone()),
            payments: PaymentService::new(store.clone(), bus),
            cart: CartService::new(store.clone()),
            catalog: CatalogService::new(store.clone(), cache.clone()),
            wishlist: WishlistService::new(store.clone()),
            reviews: ReviewService::new(store.clone(), cache.clone()),
            dashboard: DashboardService::new(store.clone()),
            users: UserService::new(store, cache),
        }
    }
}

/// Builds product views, memoizing category names within one call.
pub(crate) struct ProductViews {
    category_names: HashMap<CategoryId, Option<String>>,
}

impl ProductViews {
    pub(crate) fn new() -> Self {
        Self {
            category_names: HashMap::new(),
        }
    }

    pub(crate) async fn view(&mut self, uow: &mut dyn UnitOfWork, product: &Product) -> StoreResult<ProductView> {
        let category = match product.category_id {
            None => None,
            Some(id) => match self.category_names.get(&id) {
                Some(name) => name.clone(),
                None => {
                    let name = uow.get_category(id).await?.map(|c| c.name);
                    self.category_names.insert(id, name.clone());
                    name
                }
            },
        };
        let ratings = uow.ratings_for_product(product.id).await?;
        Ok(ProductView::new(product, category, &ratings))
    }

    pub(crate) async fn views(&mut self, uow: &mut dyn UnitOfWork, products: &[Product]) -> StoreResult<Vec<ProductView>> {
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(self.view(uow, product).await?);
        }
        Ok(views)
    }
}

pub(crate) async fn user_email(uow: &mut dyn UnitOfWork, user_id: UserId) -> StoreResult<Option<String>> {
    Ok(uow.get_user(user_id).await?.map(|u| u.email))
}
