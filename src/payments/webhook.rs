//! Webhook signature verification and event parsing
//!
//! Stripe signs webhook deliveries with HMAC-SHA256 over `"{t}.{body}"`
//! and sends the result in the `Stripe-Signature` header as
//! `t=<unix>,v1=<hex>[,v1=<hex>...]`. Verification checks the timestamp
//! against a tolerance window before checking any signature, so captured
//! deliveries cannot be replayed later.

use ring::hmac;

use super::PaymentError;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum accepted age (and clock skew) of a delivery, in seconds
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a webhook delivery against the shared endpoint secret.
pub fn verify_signature(
    secret: &str,
    signature_header: &str,
    payload: &str,
    now_unix: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::Signature("Missing timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(PaymentError::Signature("Missing v1 signature".to_string()));
    }
    if (now_unix - timestamp).abs() > TOLERANCE_SECS {
        return Err(PaymentError::Signature(
            "Timestamp outside tolerance window".to_string(),
        ));
    }

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let signed_payload = format!("{timestamp}.{payload}");

    for candidate in candidates {
        if let Ok(signature) = hex::decode(candidate)
            && hmac::verify(&key, signed_payload.as_bytes(), &signature).is_ok()
        {
            return Ok(());
        }
    }
    Err(PaymentError::Signature("No matching signature".to_string()))
}

/// Events this service reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    ChargeRefunded,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: WebhookEventKind,
    /// Payment-intent id the event refers to
    pub intent_id: Option<String>,
    /// Charge id, when the event carries one
    pub charge_id: Option<String>,
}

/// Parse a webhook body into the event kind and the ids we reconcile on.
pub fn parse_event(body: &str) -> Result<WebhookEvent, PaymentError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PaymentError::Payload(format!("Invalid JSON: {e}")))?;
    let event_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| PaymentError::Payload("Missing event type".to_string()))?;
    let object = value
        .get("data")
        .and_then(|d| d.get("object"))
        .ok_or_else(|| PaymentError::Payload("Missing data.object".to_string()))?;

    let str_field = |name: &str| {
        object
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    let event = match event_type {
        "payment_intent.succeeded" => WebhookEvent {
            kind: WebhookEventKind::PaymentSucceeded,
            intent_id: str_field("id"),
            charge_id: str_field("latest_charge"),
        },
        "payment_intent.payment_failed" => WebhookEvent {
            kind: WebhookEventKind::PaymentFailed,
            intent_id: str_field("id"),
            charge_id: str_field("latest_charge"),
        },
        "charge.refunded" => WebhookEvent {
            kind: WebhookEventKind::ChargeRefunded,
            intent_id: str_field("payment_intent"),
            charge_id: str_field("id"),
        },
        other => WebhookEvent {
            kind: WebhookEventKind::Other(other.to_string()),
            intent_id: None,
            charge_id: None,
        },
    };
    Ok(event)
}
