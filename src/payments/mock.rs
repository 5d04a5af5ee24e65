//! Mock payment gateway for tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::{Customer, PaymentError, PaymentGateway, PaymentIntent, RefundReceipt};

/// Deterministic in-memory gateway. Records every call and can be told
/// to fail the next one.
#[derive(Default)]
pub struct MockGateway {
    counter: AtomicU32,
    pub calls: Mutex<Vec<String>>,
    pub fail_next: Mutex<bool>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) -> Result<(), PaymentError> {
        self.calls.lock().unwrap().push(call);
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(PaymentError::Upstream("Mock gateway failure".to_string()));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_customer(&self, email: &str, _name: &str) -> Result<Customer, PaymentError> {
        self.record(format!("create_customer {email}"))?;
        Ok(Customer {
            id: self.next_id("cus"),
        })
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        self.record(format!("attach {customer_id} {payment_method_id}"))
    }

    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        _customer_id: Option<&str>,
        order_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        self.record(format!("create_intent {amount_minor} {currency} {order_id}"))?;
        let id = self.next_id("pi");
        Ok(PaymentIntent {
            client_secret: Some(format!("{id}_secret")),
            id,
            status: "requires_payment_method".to_string(),
            latest_charge: None,
        })
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        self.record(format!("confirm {intent_id} {payment_method_id}"))?;
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            status: "succeeded".to_string(),
            client_secret: None,
            latest_charge: Some(self.next_id("ch")),
        })
    }

    async fn refund(&self, intent_id: &str) -> Result<RefundReceipt, PaymentError> {
        self.record(format!("refund {intent_id}"))?;
        Ok(RefundReceipt {
            id: self.next_id("re"),
            status: "succeeded".to_string(),
        })
    }
}
