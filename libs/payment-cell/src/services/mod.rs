// libs/payment-cell/src/services/mod.rs
pub mod display;
pub mod order_code;
pub mod reconcile;
pub mod reconciler;

pub use display::{PaymentDisplay, PaymentDisplayConfig};
pub use order_code::{extract_order_code, generate_order_code};
pub use reconcile::next_status;
pub use reconciler::{PaymentReconciler, TransactionalPaymentReconciler};
