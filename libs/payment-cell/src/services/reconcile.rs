// libs/payment-cell/src/services/reconcile.rs
use crate::models::PaymentOrderStatus;

/// Status an order should move to for an incoming transfer, or `None` when
/// the event must leave the order alone.
///
/// Settled orders (paid, partially paid, cancelled) are never touched again.
pub fn next_status(
    current: PaymentOrderStatus,
    order_amount: i64,
    transfer_amount: i64,
) -> Option<PaymentOrderStatus> {
    if !current.is_unpaid() || transfer_amount <= 0 {
        return None;
    }

    if transfer_amount >= order_amount {
        Some(PaymentOrderStatus::Paid)
    } else {
        Some(PaymentOrderStatus::Partially)
    }
}
