use std::sync::Arc;

use shopfront_auth::Actor;
use shopfront_core::ProductId;
use shopfront_sales::Wishlist;

use crate::services::catalog::existing_product;
use crate::services::{ProductViews, ServiceResult};
use crate::store::{Store, UnitOfWork};
use crate::views::WishlistView;

#[derive(Clone)]
pub struct WishlistService {
    store: Arc<dyn Store>,
}

impl WishlistService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, actor: &Actor) -> ServiceResult<WishlistView> {
        let mut uow = self.store.begin().await?;
        let wishlist = load(uow.as_mut(), actor).await?;

        let mut products = Vec::with_capacity(wishlist.len());
        for product_id in wishlist.products() {
            if let Some(product) = uow.get_product(product_id).await? {
                products.push(product);
            }
        }
        let items = ProductViews::new().views(uow.as_mut(), &products).await?;
        Ok(WishlistView {
            count: items.len(),
            items,
        })
    }

    pub async fn add(&self, actor: &Actor, product_id: ProductId) -> ServiceResult<()> {
        let mut uow = self.store.begin().await?;
        existing_product(uow.as_mut(), product_id).await?;
        let mut wishlist = load(uow.as_mut(), actor).await?;
        wishlist.add(product_id)?;
        uow.save_wishlist(&wishlist).await?;
        uow.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, actor: &Actor, product_id: ProductId) -> ServiceResult<()> {
        let mut uow = self.store.begin().await?;
        let mut wishlist = load(uow.as_mut(), actor).await?;
        wishlist.remove(product_id);
        uow.save_wishlist(&wishlist).await?;
        uow.commit().await?;
        Ok(())
    }

    pub async fn contains(&self, actor: &Actor, product_id: ProductId) -> ServiceResult<bool> {
        let mut uow = self.store.begin().await?;
        Ok(load(uow.as_mut(), actor).await?.contains(product_id))
    }

    pub async fn clear(&self, actor: &Actor) -> ServiceResult<()> {
        let mut uow = self.store.begin().await?;
        let mut wishlist = load(uow.as_mut(), actor).await?;
        wishlist.clear();
        uow.save_wishlist(&wishlist).await?;
        uow.commit().await?;
        Ok(())
    }
}

async fn load(uow: &mut dyn UnitOfWork, actor: &Actor) -> ServiceResult<Wishlist> {
    Ok(uow
        .get_wishlist(actor.user_id)
        .await?
        .unwrap_or_else(|| Wishlist::new(actor.user_id)))
}
