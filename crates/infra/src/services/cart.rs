use std::sync::Arc;

use tracing::{debug, instrument};

use shopfront_auth::Actor;
use shopfront_catalog::Product;
use shopfront_core::{DomainError, ProductId};
use shopfront_sales::{Cart, line_total};

use crate::services::ServiceResult;
use crate::store::{Store, UnitOfWork};
use crate::views::{CartLineView, CartView};

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The actor's cart, created empty on first access.
    pub async fn get_cart(&self, actor: &Actor) -> ServiceResult<CartView> {
        let mut uow = self.store.begin().await?;
        let cart = match uow.get_cart(actor.user_id).await? {
            Some(cart) => cart,
            None => {
                let cart = Cart::new(actor.user_id);
                uow.save_cart(&cart).await?;
                cart
            }
        };
        let view = cart_view(uow.as_mut(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn add_item(&self, actor: &Actor, product_id: ProductId, quantity: u32) -> ServiceResult<CartView> {
        let mut uow = self.store.begin().await?;
        let product = existing_product(uow.as_mut(), product_id).await?;
        let mut cart = load_cart(uow.as_mut(), actor).await?;

        let line = cart.add(&product, quantity)?;
        debug!(line, "cart line updated");
        uow.save_cart(&cart).await?;

        let view = cart_view(uow.as_mut(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Set a line's quantity. Zero or less removes the line.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id), err)]
    pub async fn update_item(&self, actor: &Actor, product_id: ProductId, quantity: i64) -> ServiceResult<CartView> {
        let mut uow = self.store.begin().await?;
        let mut cart = load_cart(uow.as_mut(), actor).await?;
        if cart.quantity_of(product_id).is_none() {
            return Err(DomainError::not_found(format!("cart item for product {product_id}")).into());
        }
        let product = existing_product(uow.as_mut(), product_id).await?;

        cart.update(&product, quantity)?;
        uow.save_cart(&cart).await?;

        let view = cart_view(uow.as_mut(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    pub async fn remove_item(&self, actor: &Actor, product_id: ProductId) -> ServiceResult<CartView> {
        let mut uow = self.store.begin().await?;
        let mut cart = load_cart(uow.as_mut(), actor).await?;
        if cart.remove(product_id) {
            uow.save_cart(&cart).await?;
        }
        let view = cart_view(uow.as_mut(), &cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    pub async fn clear(&self, actor: &Actor) -> ServiceResult<()> {
        let mut uow = self.store.begin().await?;
        let mut cart = load_cart(uow.as_mut(), actor).await?;
        cart.clear();
        uow.save_cart(&cart).await?;
        uow.commit().await?;
        Ok(())
    }
}

async fn load_cart(uow: &mut dyn UnitOfWork, actor: &Actor) -> ServiceResult<Cart> {
    Ok(uow
        .get_cart(actor.user_id)
        .await?
        .unwrap_or_else(|| Cart::new(actor.user_id)))
}

async fn existing_product(uow: &mut dyn UnitOfWork, product_id: ProductId) -> ServiceResult<Product> {
    uow.get_product(product_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {product_id}")).into())
}

async fn cart_view(uow: &mut dyn UnitOfWork, cart: &Cart) -> ServiceResult<CartView> {
    let mut lines = Vec::new();
    for (product_id, quantity) in cart.lines() {
        // Lines for deleted products are cascaded away; skip any stragglers.
        let Some(product) = uow.get_product(product_id).await? else {
            continue;
        };
        lines.push(CartLineView {
            product_id,
            product_name: product.name.clone(),
            product_image: product.image.clone(),
            price: product.price,
            quantity,
            subtotal: line_total(product.price, quantity)?,
            in_stock: product.in_stock(),
        });
    }
    Ok(CartView::new(lines)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_catalog::NewProduct;
    use shopfront_catalog::product::max_price;

    use crate::test_support::{Fixture, dec};

    #[tokio::test]
    async fn first_access_creates_an_empty_cart() {
        let fx = Fixture::new();
        let user = fx.customer().await;

        let cart = fx.services.cart.get_cart(&user).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.total_amount, dec("0"));
    }

    #[tokio::test]
    async fn add_merges_lines_and_checks_the_merged_quantity() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let lamp = fx.product("Lamp", "12.50", 3).await;

        fx.services.cart.add_item(&user, lamp, 2).await.unwrap();
        let cart = fx.services.cart.add_item(&user, lamp, 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_amount, dec("37.50"));

        let err = fx.services.cart.add_item(&user, lamp, 1).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn add_rejects_unknown_and_sold_out_products() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let sold_out = fx.product("Ghost", "1", 0).await;

        let err = fx.services.cart.add_item(&user, ProductId::new(), 1).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
        let err = fx.services.cart.add_item(&user, sold_out, 1).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn update_sets_or_removes_lines() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let lamp = fx.product("Lamp", "10", 5).await;

        let err = fx.services.cart.update_item(&user, lamp, 2).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));

        fx.services.cart.add_item(&user, lamp, 1).await.unwrap();
        let cart = fx.services.cart.update_item(&user, lamp, 4).await.unwrap();
        assert_eq!(cart.total_items, 4);

        let err = fx.services.cart.update_item(&user, lamp, 6).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InsufficientStock { .. })));

        let cart = fx.services.cart.update_item(&user, lamp, 0).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_prices_never_reach_the_cart() {
        let fx = Fixture::new();
        let admin = fx.admin().await;
        let user = fx.customer().await;

        let huge = NewProduct {
            name: "Crown".into(),
            price: dec("50000000000000000000000000000"),
            stock_count: 5,
            ..NewProduct::default()
        };
        let err = fx.services.catalog.create_product(&admin, huge).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));

        let ceiling = NewProduct {
            name: "Yacht".into(),
            price: max_price(),
            stock_count: 5,
            ..NewProduct::default()
        };
        let yacht = fx.services.catalog.create_product(&admin, ceiling).await.unwrap();
        let cart = fx.services.cart.add_item(&user, yacht.id, 5).await.unwrap();
        assert_eq!(cart.total_amount, dec("49999999999.95"));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let fx = Fixture::new();
        let user = fx.customer().await;
        let lamp = fx.product("Lamp", "10", 5).await;
        let desk = fx.product("Desk", "100", 5).await;
        fx.services.cart.add_item(&user, lamp, 1).await.unwrap();
        fx.services.cart.add_item(&user, desk, 1).await.unwrap();

        let cart = fx.services.cart.remove_item(&user, lamp).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, desk);

        fx.services.cart.clear(&user).await.unwrap();
        assert!(fx.services.cart.get_cart(&user).await.unwrap().items.is_empty());
    }
}
