use assert_matches::assert_matches;
use serde_json::json;

use payment_cell::models::{PaymentError, PaymentOrderStatus, SepayWebhookEvent};
use payment_cell::services::{extract_order_code, next_status};

// =============================================================================
// STATUS THRESHOLDS
// =============================================================================

#[test]
fn test_full_amount_marks_paid() {
    assert_eq!(next_status(PaymentOrderStatus::Awaiting, 100, 100), Some(PaymentOrderStatus::Paid));
    assert_eq!(next_status(PaymentOrderStatus::Pending, 100, 150), Some(PaymentOrderStatus::Paid));
}

#[test]
fn test_short_amount_marks_partially() {
    assert_eq!(
        next_status(PaymentOrderStatus::Awaiting, 100, 50),
        Some(PaymentOrderStatus::Partially)
    );
}

#[test]
fn test_zero_or_negative_amount_changes_nothing() {
    assert_eq!(next_status(PaymentOrderStatus::Awaiting, 100, 0), None);
    assert_eq!(next_status(PaymentOrderStatus::Awaiting, 100, -20), None);
}

#[test]
fn test_settled_orders_never_regress() {
    for settled in [
        PaymentOrderStatus::Paid,
        PaymentOrderStatus::Partially,
        PaymentOrderStatus::Cancelled,
    ] {
        assert_eq!(next_status(settled, 100, 100), None);
        assert_eq!(next_status(settled, 100, 50), None);
    }
}

// =============================================================================
// WEBHOOK PAYLOAD
// =============================================================================

#[test]
fn test_parse_incoming_transfer() {
    let event = SepayWebhookEvent::from_value(json!({
        "id": 92704,
        "gateway": "MBBank",
        "code": null,
        "transferAmount": 150000,
        "transferType": "IN",
        "content": "NGUYEN VAN A chuyen tien appt12250812ab12",
        "referenceCode": "FT25224123"
    }))
    .unwrap();

    assert_eq!(event.transaction_id, "92704");
    assert_eq!(event.transfer_amount, 150_000);
    assert!(event.is_incoming());
    assert_eq!(event.code, None);
    assert_eq!(event.reference_code.as_deref(), Some("FT25224123"));

    let audit = event.to_audit_row();
    assert_eq!(audit.sepay_tx_id, "92704");
    assert_eq!(audit.raw_payload["gateway"], "MBBank");
}

#[test]
fn test_parse_string_amount_and_outgoing_type() {
    let event = SepayWebhookEvent::from_value(json!({
        "id": "tx-1",
        "transferAmount": "50000",
        "transferType": "out",
        "content": "refund"
    }))
    .unwrap();

    assert_eq!(event.transfer_amount, 50_000);
    assert!(!event.is_incoming());
}

#[test]
fn test_missing_transaction_id_is_rejected() {
    let result = SepayWebhookEvent::from_value(json!({
        "transferAmount": 100,
        "transferType": "in",
        "content": "APPT1"
    }));
    assert_matches!(result, Err(PaymentError::MissingTransactionId));

    let blank = SepayWebhookEvent::from_value(json!({ "id": "  " }));
    assert_matches!(blank, Err(PaymentError::MissingTransactionId));
}

#[test]
fn test_non_object_payload_is_rejected() {
    let result = SepayWebhookEvent::from_value(json!([1, 2, 3]));
    assert_matches!(result, Err(PaymentError::ValidationError(_)));
}

// =============================================================================
// ORDER CODE EXTRACTION
// =============================================================================

#[test]
fn test_extract_from_lowercase_content() {
    assert_eq!(
        extract_order_code(Some("thanh toan appt42250101beef kham"), None),
        Some("APPT42250101BEEF".to_string())
    );
}

#[test]
fn test_extract_falls_back_to_code_field() {
    assert_eq!(
        extract_order_code(Some("no reference here"), Some("appt9250101abcd")),
        Some("APPT9250101ABCD".to_string())
    );
    assert_eq!(extract_order_code(Some("no reference here"), Some("ORDER-1")), None);
    assert_eq!(extract_order_code(None, None), None);
}
