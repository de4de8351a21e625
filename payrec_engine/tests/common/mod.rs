//! Shared fixtures for the engine integration tests: a scripted in-memory payment gateway and request builders.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use gateway_client::{GatewayError, PaymentGateway, RemoteOrder, RemotePayment, RemoteRefund};
use payrec_common::{Money, Secret};
use payrec_engine::{
    db_types::LineItem,
    helpers::{hmac_hex, signature_message},
    test_utils::prepare_env::prepare_test_env,
    OrderIntakeRequest,
    PaymentFlowApi,
    SqliteOrderStore,
};

pub const SIGNING_SECRET: &str = "test_webhook_secret";

/// A payment gateway double whose behaviour each test scripts up front. State is behind a mutex so the clones the
/// flow API takes all observe the same script.
#[derive(Clone, Default)]
pub struct TestGateway {
    state: Arc<Mutex<GatewayState>>,
}

#[derive(Default)]
struct GatewayState {
    unreachable: bool,
    fail_next_create: bool,
    seq: u64,
    orders: HashMap<String, RemoteOrder>,
    payments: HashMap<String, RemotePayment>,
    refunds: HashMap<String, RemoteRefund>,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a network partition. Every call fails with a transient error until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// The next `create_order` call fails with a terminal gateway rejection.
    pub fn fail_next_create(&self) {
        self.state.lock().unwrap().fail_next_create = true;
    }

    /// Seed a payment the gateway "knows about", as if the customer had paid through the checkout UI.
    pub fn add_payment(&self, payment_id: &str, remote_order_id: &str, amount: Money, status: &str) {
        let payment = RemotePayment {
            id: payment_id.to_string(),
            order_id: remote_order_id.to_string(),
            amount,
            currency: "INR".to_string(),
            status: status.to_string(),
            method: Some("card".to_string()),
            created_at: None,
        };
        self.state.lock().unwrap().payments.insert(payment_id.to_string(), payment);
    }

    pub fn refund_count(&self) -> usize {
        self.state.lock().unwrap().refunds.len()
    }
}

impl PaymentGateway for TestGateway {
    async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<RemoteOrder, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(GatewayError::RequestFailed { status: 400, message: "amount exceeds maximum".to_string() });
        }
        state.seq += 1;
        let order = RemoteOrder {
            id: format!("order_test{:06}", state.seq),
            amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".to_string(),
            created_at: None,
        };
        state.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        state
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::RequestFailed { status: 404, message: format!("{payment_id} not found") })
    }

    async fn fetch_payments_for_order(&self, remote_order_id: &str) -> Result<Vec<RemotePayment>, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        Ok(state.payments.values().filter(|p| p.order_id == remote_order_id).cloned().collect())
    }

    async fn issue_refund(&self, payment_id: &str, amount: Option<Money>) -> Result<RemoteRefund, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }
        let payment = state
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::RequestFailed { status: 404, message: format!("{payment_id} not found") })?;
        state.seq += 1;
        let refund = RemoteRefund {
            id: format!("rfnd_test{:06}", state.seq),
            payment_id: payment_id.to_string(),
            amount: amount.unwrap_or(payment.amount),
            currency: Some(payment.currency),
            status: "processed".to_string(),
            created_at: None,
        };
        state.refunds.insert(refund.id.clone(), refund.clone());
        Ok(refund)
    }
}

pub type TestApi = PaymentFlowApi<SqliteOrderStore, TestGateway>;

/// Spin up a throwaway database and a flow API wired to a fresh [`TestGateway`].
pub async fn new_test_api(url: &str) -> (TestApi, TestGateway) {
    prepare_test_env(url).await;
    // One connection so reads always observe earlier writes; see SqliteOrderStore::new_with_url.
    let db = SqliteOrderStore::new_with_url(url, 1).await.expect("Error creating database");
    let gateway = TestGateway::new();
    let api = PaymentFlowApi::new(db, gateway.clone(), Secret::new(SIGNING_SECRET.to_string()));
    (api, gateway)
}

pub fn intake_request(subtotal: i64, discount: i64, shipping: i64) -> OrderIntakeRequest {
    OrderIntakeRequest {
        customer_name: "Asha Rao".to_string(),
        customer_email: "asha@example.com".to_string(),
        customer_phone: "+911234567890".to_string(),
        shipping_address: "12 MG Road, Bengaluru".to_string(),
        items: vec![LineItem {
            product_id: "sku-1".to_string(),
            name: "Widget".to_string(),
            quantity: 1,
            unit_price: Money::from(subtotal),
        }],
        subtotal: Money::from(subtotal),
        discount: Money::from(discount),
        shipping: Money::from(shipping),
    }
}

/// The signature the gateway's checkout UI would hand the storefront after a successful payment.
pub fn sign(remote_order_id: &str, remote_payment_id: &str) -> String {
    let message = signature_message(remote_order_id, remote_payment_id);
    hmac_hex(SIGNING_SECRET, message.as_bytes())
}
