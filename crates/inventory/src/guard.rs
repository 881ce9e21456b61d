use tracing::debug;

use shopfront_catalog::Product;
use shopfront_core::{DomainError, DomainResult, OrderId};

use crate::Reservation;

/// Debit `quantity` units of `product` for `order_id`.
///
/// Stock is checked before the availability flag, so the loser of a race for
/// the last unit sees `InsufficientStock`.
pub fn reserve(product: &mut Product, order_id: OrderId, quantity: u32) -> DomainResult<Reservation> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    if product.stock_count() < quantity {
        return Err(DomainError::insufficient_stock(&product.name));
    }
    if !product.in_stock() {
        return Err(DomainError::unavailable(&product.name));
    }

    product.set_stock_count(product.stock_count() - quantity);
    debug!(product_id = %product.id, %order_id, quantity, remaining = product.stock_count(), "stock reserved");

    Ok(Reservation::new(order_id, product.id, quantity))
}

/// Credit a reservation back to its product. Each reservation is credited at
/// most once.
pub fn release(product: &mut Product, reservation: &mut Reservation) -> DomainResult<()> {
    if reservation.is_released() {
        return Err(DomainError::AlreadyReleased);
    }
    if reservation.product_id != product.id {
        return Err(DomainError::invariant("reservation targets a different product"));
    }

    let restored = product
        .stock_count()
        .checked_add(reservation.quantity)
        .ok_or_else(|| DomainError::invariant("stock count overflow"))?;

    product.set_stock_count(restored);
    reservation.mark_released();
    debug!(product_id = %product.id, order_id = %reservation.order_id, quantity = reservation.quantity, "stock released");

    Ok(())
}
