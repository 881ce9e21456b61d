use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, Entity, OrderId, ProductId, UserId};

/// Fulfilment lifecycle.
///
/// `PENDING → CONFIRMED → SHIPPED → DELIVERED`, plus `PENDING | CONFIRMED →
/// CANCELLED`. `DELIVERED` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown order status '{s}'")))
    }
}

/// Payment lifecycle, independent of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
        }
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            other => Err(DomainError::validation(format!("unknown payment status '{other}'"))),
        }
    }
}

/// Order line captured at order time. Later catalog edits do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
}

impl OrderItem {
    pub fn subtotal(&self) -> DomainResult<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// Order totals are stored as `NUMERIC(14, 2)`.
pub fn max_order_total() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// `price × quantity` without overflow.
pub fn line_total(price: Decimal, quantity: u32) -> DomainResult<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::invariant(format!("line total overflows: {price} x {quantity}")))
}

/// Exact sum of money amounts without overflow.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::invariant("amount total overflows"))
    })
}

/// An order snapshot. Orders are never deleted; cancellation is a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    items: Vec<OrderItem>,
    total_amount: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    pub shipping_address: String,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new `PENDING` order from captured lines.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        if shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address is required"));
        }
        if items.iter().any(|i| i.quantity == 0) {
            return Err(DomainError::invariant("order line with zero quantity"));
        }

        let subtotals = items.iter().map(OrderItem::subtotal).collect::<DomainResult<Vec<_>>>()?;
        let total_amount = sum_amounts(subtotals)?;
        if total_amount > max_order_total() {
            return Err(DomainError::validation(format!(
                "order total {total_amount} exceeds the maximum of {}",
                max_order_total()
            )));
        }
        Ok(Self {
            id,
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: shipping_address.trim().to_string(),
            payment_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild an order loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        total_amount: Decimal,
        status: OrderStatus,
        payment_status: PaymentStatus,
        shipping_address: String,
        payment_id: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            items,
            total_amount,
            status,
            payment_status,
            shipping_address,
            payment_id,
            created_at,
            updated_at,
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    /// Move along the status graph. Re-setting the current status is rejected.
    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition(self.status, next));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Check that a payment intent may be opened for this order.
    pub fn ensure_payable(&self) -> DomainResult<()> {
        if self.is_paid() {
            return Err(DomainError::AlreadyPaid);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invalid_transition(self.status, OrderStatus::Confirmed));
        }
        Ok(())
    }

    pub fn attach_payment(&mut self, intent_id: &str, now: DateTime<Utc>) {
        self.payment_id = Some(intent_id.to_string());
        self.updated_at = now;
    }

    /// Record a completed payment. A `PENDING` order advances to `CONFIRMED`;
    /// later statuses are kept. Returns `false` if the order was already paid.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> DomainResult<bool> {
        if self.is_paid() {
            return Ok(false);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invalid_transition(self.status, OrderStatus::Confirmed));
        }
        self.payment_status = PaymentStatus::Completed;
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
        }
        self.updated_at = now;
        Ok(true)
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            product_name: "Frame".to_string(),
            product_image: None,
            quantity,
            price: price.parse().unwrap(),
        }
    }

    fn test_order() -> Order {
        Order::place(
            OrderId::new(),
            UserId::new(),
            vec![item("10.00", 2), item("5.00", 1)],
            "1 Main St",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn place_sums_exact_decimal_total() {
        let order = test_order();
        assert_eq!(order.total_amount(), "25.00".parse::<Decimal>().unwrap());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn place_avoids_float_drift() {
        let order = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![item("0.10", 1), item("0.20", 1)],
            "addr",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_amount(), "0.30".parse::<Decimal>().unwrap());
    }

    #[test]
    fn line_arithmetic_reports_overflow_instead_of_panicking() {
        let err = line_total(Decimal::MAX, 2).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = sum_amounts([Decimal::MAX, Decimal::ONE]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        assert_eq!(line_total("2.50".parse().unwrap(), 3).unwrap(), "7.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn place_rejects_totals_beyond_storage_range() {
        let err = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![item("9999999999.99", 200)],
            "addr",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![item("50000000000000000000000000000", 2)],
            "addr",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn place_rejects_empty_items() {
        let err = Order::place(OrderId::new(), UserId::new(), vec![], "addr", Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);
    }

    #[test]
    fn place_rejects_blank_address() {
        let err = Order::place(OrderId::new(), UserId::new(), vec![item("1", 1)], "  ", Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn transition_table_is_exact() {
        use OrderStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Confirmed, Shipped),
            (Shipped, Delivered),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(OrderStatus::ALL.into_iter().all(|to| !from.can_transition_to(to)));
        }
    }

    #[test]
    fn transition_to_same_status_is_rejected() {
        let mut order = test_order();
        let err = order.transition_to(OrderStatus::Pending, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn mark_paid_confirms_pending_order() {
        let mut order = test_order();
        assert!(order.mark_paid(Utc::now()).unwrap());
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.payment_status(), PaymentStatus::Completed);

        assert!(!order.mark_paid(Utc::now()).unwrap());
        assert_eq!(order.ensure_payable(), Err(DomainError::AlreadyPaid));
    }

    #[test]
    fn mark_paid_keeps_later_status() {
        let mut order = test_order();
        order.transition_to(OrderStatus::Confirmed, Utc::now()).unwrap();
        order.transition_to(OrderStatus::Shipped, Utc::now()).unwrap();
        order.mark_paid(Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn cancelled_order_cannot_be_paid() {
        let mut order = test_order();
        order.transition_to(OrderStatus::Cancelled, Utc::now()).unwrap();
        assert!(matches!(order.ensure_payable(), Err(DomainError::InvalidTransition { .. })));
        assert!(matches!(order.mark_paid(Utc::now()), Err(DomainError::InvalidTransition { .. })));
    }

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn status() -> impl Strategy<Value = OrderStatus> {
            proptest::sample::select(OrderStatus::ALL.to_vec())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: whatever is requested, the order only ever moves
            /// along graph edges and never leaves a terminal state.
            #[test]
            fn only_graph_edges_are_taken(requests in proptest::collection::vec(status(), 0..20)) {
                let mut order = test_order();
                for next in requests {
                    let before = order.status();
                    match order.transition_to(next, Utc::now()) {
                        Ok(()) => prop_assert!(before.can_transition_to(next)),
                        Err(_) => prop_assert_eq!(order.status(), before),
                    }
                    if before.is_terminal() {
                        prop_assert_eq!(order.status(), before);
                    }
                }
            }
        }
    }
}
