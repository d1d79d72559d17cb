// libs/payment-cell/src/services/reconciler.rs
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use mockall::automock;
use tracing::{debug, error, info, warn};

use appointment_cell::models::AppointmentStatus;
use appointment_cell::services::clinic_offset;
use shared_config::AppConfig;
use shared_database::pg::{set_local_lock_timeout, DbPool};
use shared_database::schema::{appointments, payment_events, payment_orders};

use crate::models::{
    CreateOrderRequest, NewPaymentOrderEntity, OrderDetail, PaymentError, PaymentOrderEntity,
    PaymentOrderStatus, SepayWebhookEvent, WebhookOutcome, PAYMENT_METHOD_VA,
    PAYMENT_PROVIDER_SEPAY,
};
use crate::services::display::PaymentDisplayConfig;
use crate::services::order_code::{extract_order_code, generate_order_code};
use crate::services::reconcile::next_status;

#[automock]
#[async_trait]
pub trait PaymentReconciler: Send + Sync {
    /// Opens a payment order for an appointment. With `owner` set, the
    /// appointment must belong to that patient.
    async fn create_order(
        &self,
        request: CreateOrderRequest,
        owner: Option<i32>,
    ) -> Result<OrderDetail, PaymentError>;

    async fn get_order(&self, order_code: String) -> Result<OrderDetail, PaymentError>;

    /// Records a webhook delivery and applies it to its order at most once.
    async fn handle_webhook(&self, event: SepayWebhookEvent) -> Result<WebhookOutcome, PaymentError>;
}

#[derive(Clone)]
pub struct TransactionalPaymentReconciler {
    pool: DbPool,
    display: PaymentDisplayConfig,
    utc_offset: FixedOffset,
    lock_timeout_ms: u64,
}

impl TransactionalPaymentReconciler {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        if !config.is_payment_configured() {
            warn!("Payment settings incomplete; order creation will be refused");
        }

        Self {
            pool,
            display: PaymentDisplayConfig::from_config(config),
            utc_offset: clinic_offset(config),
            lock_timeout_ms: config.booking_lock_timeout_ms,
        }
    }
}

fn pool_error<E: std::fmt::Display>(err: E) -> PaymentError {
    error!("Failed to obtain a DB connection: {}", err);
    PaymentError::DatabaseError(format!("Failed to obtain a DB connection: {}", err))
}

#[async_trait]
impl PaymentReconciler for TransactionalPaymentReconciler {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
        owner: Option<i32>,
    ) -> Result<OrderDetail, PaymentError> {
        if !self.display.is_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let appointment_id = request.appointment_id;
        let ttl_seconds = self.display.ttl_seconds(request.ttl_seconds);
        let now = Utc::now();
        let order_code = generate_order_code(
            appointment_id,
            now.with_timezone(&self.utc_offset).date_naive(),
            rand::random::<u16>(),
        );
        let display = self.display.clone();
        let lock_timeout_ms = self.lock_timeout_ms;

        debug!("Creating payment order {} for appointment {}", order_code, appointment_id);

        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let order = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    set_local_lock_timeout(conn, lock_timeout_ms).await?;

                    let (patient_id, clinic_id, service_id, cur_price, status) = appointments::table
                        .filter(appointments::id.eq(appointment_id))
                        .select((
                            appointments::patient_id,
                            appointments::clinic_id,
                            appointments::service_id,
                            appointments::cur_price,
                            appointments::status,
                        ))
                        .for_update()
                        .first::<(i32, i32, i32, i64, i16)>(conn)
                        .await
                        .optional()?
                        .filter(|(patient_id, ..)| owner.map_or(true, |owner| owner == *patient_id))
                        .ok_or_else(|| PaymentError::NotFound("Appointment".to_string()))?;

                    if status == AppointmentStatus::Canceled.code() {
                        return Err(PaymentError::AppointmentCanceled);
                    }

                    let unpaid_exists = diesel::select(diesel::dsl::exists(
                        payment_orders::table
                            .filter(payment_orders::appointment_id.eq(appointment_id))
                            .filter(payment_orders::status.eq_any(PaymentOrderStatus::unpaid_codes())),
                    ))
                    .get_result::<bool>(conn)
                    .await?;
                    if unpaid_exists {
                        return Err(PaymentError::UnpaidOrderExists);
                    }

                    let pending: PaymentOrderEntity = diesel::insert_into(payment_orders::table)
                        .values(NewPaymentOrderEntity {
                            appointment_id,
                            patient_id,
                            clinic_id,
                            service_id,
                            order_code: order_code.clone(),
                            amount_vnd: cur_price,
                            status: PaymentOrderStatus::Pending.as_str().to_string(),
                            method: PAYMENT_METHOD_VA.to_string(),
                            provider: PAYMENT_PROVIDER_SEPAY.to_string(),
                        })
                        .returning(PaymentOrderEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    let shown = display.render(&order_code, pending.amount_vnd, now, ttl_seconds);

                    let awaiting: PaymentOrderEntity = diesel::update(payment_orders::table.find(pending.id))
                        .set((
                            payment_orders::status.eq(PaymentOrderStatus::Awaiting.as_str()),
                            payment_orders::va_number.eq(Some(shown.va_number)),
                            payment_orders::qr_code_url.eq(Some(shown.qr_code_url)),
                            payment_orders::expires_at.eq(Some(shown.expires_at)),
                        ))
                        .returning(PaymentOrderEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok::<PaymentOrderEntity, PaymentError>(awaiting)
                })
            })
            .await?;

        info!(
            "Payment order {} awaiting {} for appointment {}",
            order.order_code, order.amount_vnd, appointment_id
        );

        OrderDetail::try_from(order)
    }

    async fn get_order(&self, order_code: String) -> Result<OrderDetail, PaymentError> {
        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let order = payment_orders::table
            .filter(payment_orders::order_code.eq(&order_code))
            .select(PaymentOrderEntity::as_select())
            .first::<PaymentOrderEntity>(conn)
            .await
            .optional()?
            .ok_or_else(|| PaymentError::NotFound("Order".to_string()))?;

        OrderDetail::try_from(order)
    }

    async fn handle_webhook(&self, event: SepayWebhookEvent) -> Result<WebhookOutcome, PaymentError> {
        let lock_timeout_ms = self.lock_timeout_ms;
        let transaction_id = event.transaction_id.clone();

        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let outcome = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    set_local_lock_timeout(conn, lock_timeout_ms).await?;

                    let inserted = diesel::insert_into(payment_events::table)
                        .values(event.to_audit_row())
                        .on_conflict(payment_events::sepay_tx_id)
                        .do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        return Ok(WebhookOutcome::Duplicate);
                    }

                    let Some(order_code) =
                        extract_order_code(event.content.as_deref(), event.code.as_deref())
                    else {
                        return Ok(WebhookOutcome::Recorded);
                    };

                    let Some(order) = payment_orders::table
                        .filter(payment_orders::order_code.eq(&order_code))
                        .select(PaymentOrderEntity::as_select())
                        .for_update()
                        .first::<PaymentOrderEntity>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(WebhookOutcome::Recorded);
                    };

                    diesel::update(
                        payment_events::table
                            .filter(payment_events::sepay_tx_id.eq(&event.transaction_id)),
                    )
                    .set(payment_events::payment_order_id.eq(Some(order.id)))
                    .execute(conn)
                    .await?;

                    // Outbound transfers are linked for audit but never move the order
                    if !event.is_incoming() {
                        return Ok(WebhookOutcome::Recorded);
                    }

                    let Some(status) = next_status(order.status()?, order.amount_vnd, event.transfer_amount)
                    else {
                        return Ok(WebhookOutcome::Recorded);
                    };

                    let paid_at = (status == PaymentOrderStatus::Paid).then(Utc::now);
                    let updated = diesel::update(
                        payment_orders::table
                            .find(order.id)
                            .filter(payment_orders::status.eq_any(PaymentOrderStatus::unpaid_codes())),
                    )
                    .set((
                        payment_orders::status.eq(status.as_str()),
                        payment_orders::paid_at.eq(paid_at),
                    ))
                    .execute(conn)
                    .await?;

                    if updated == 0 {
                        return Ok(WebhookOutcome::Recorded);
                    }

                    Ok::<WebhookOutcome, PaymentError>(WebhookOutcome::Applied { order_code, status })
                })
            })
            .await?;

        match &outcome {
            WebhookOutcome::Duplicate => info!("Webhook {} already processed", transaction_id),
            WebhookOutcome::Recorded => info!("Webhook {} recorded without order change", transaction_id),
            WebhookOutcome::Applied { order_code, status } => {
                info!("Webhook {} moved order {} to {}", transaction_id, order_code, status)
            }
        }

        Ok(outcome)
    }
}
