pub mod handlers;
pub mod middleware;
pub mod router;
pub mod models;
pub mod services;

pub use models::{OrderDetail, PaymentError, PaymentOrderStatus, SepayWebhookEvent, WebhookOutcome};
pub use router::{payment_routes, PaymentState};
