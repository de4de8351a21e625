use std::{sync::Arc, time::Duration};

use log::*;
use payrec_common::Money;
use rand::Rng;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::GatewayConfig,
    data_objects::{RemoteOrder, RemotePayment, RemoteRefund},
    traits::PaymentGateway,
    GatewayError,
};

const RETRY_BASE_DELAY_MS: u64 = 250;

/// The live HTTP client for the payment gateway.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends a single request to the gateway and maps the response into `T`.
    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, GatewayError> {
        let url = self.url(path);
        trace!("Sending gateway query: {} {url}", method.as_str());
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(body);
        }
        // Anything that fails before a status line comes back is a transport problem.
        let response = req.send().await.map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            trace!("Gateway query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayError::ResponseFormat(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::ResponseFormat(e.to_string()))?;
            Err(GatewayError::RequestFailed { status, message })
        }
    }

    /// Retry wrapper for idempotent reads. Transient failures are retried with exponential backoff and jitter,
    /// up to the configured budget. Writes must not come through here.
    async fn rest_query_with_retries<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, GatewayError> {
        let mut attempt = 0u32;
        loop {
            match self.rest_query::<T, ()>(method.clone(), path, None).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let jitter = rand::thread_rng().gen_range(0..RETRY_BASE_DELAY_MS);
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt) + jitter;
                    debug!("Transient gateway error on {path} (attempt {}): {e}. Retrying in {delay}ms.", attempt + 1);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                },
                other => return other,
            }
        }
    }

    /// Fetch a refund by its gateway id. Not part of the reconciliation flows; used by operational tooling to
    /// inspect refund state directly.
    pub async fn fetch_refund(&self, refund_id: &str) -> Result<RemoteRefund, GatewayError> {
        let path = format!("/refunds/{refund_id}");
        debug!("Fetching refund {refund_id} from gateway");
        self.rest_query_with_retries(Method::GET, &path).await
    }
}

impl PaymentGateway for GatewayApi {
    async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<RemoteOrder, GatewayError> {
        let body = serde_json::json!({
            "amount": amount.value(),
            "currency": currency,
            "receipt": receipt,
        });
        debug!("Creating gateway order for {amount} ({receipt})");
        let order = self.rest_query::<RemoteOrder, Value>(Method::POST, "/orders", Some(&body)).await?;
        info!("Gateway order {} created for {receipt}", order.id);
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError> {
        let path = format!("/payments/{payment_id}");
        debug!("Fetching payment {payment_id} from gateway");
        self.rest_query_with_retries(Method::GET, &path).await
    }

    async fn fetch_payments_for_order(&self, remote_order_id: &str) -> Result<Vec<RemotePayment>, GatewayError> {
        #[derive(Deserialize)]
        struct PaymentCollection {
            items: Vec<RemotePayment>,
        }
        let path = format!("/orders/{remote_order_id}/payments");
        debug!("Fetching payments for gateway order {remote_order_id}");
        let collection = self.rest_query_with_retries::<PaymentCollection>(Method::GET, &path).await?;
        Ok(collection.items)
    }

    async fn issue_refund(&self, payment_id: &str, amount: Option<Money>) -> Result<RemoteRefund, GatewayError> {
        let path = format!("/payments/{payment_id}/refund");
        let body = match amount {
            Some(amount) => serde_json::json!({ "amount": amount.value() }),
            None => serde_json::json!({}),
        };
        debug!("Issuing refund against payment {payment_id}");
        let refund = self.rest_query::<RemoteRefund, Value>(Method::POST, &path, Some(&body)).await?;
        info!("Refund {} issued against payment {payment_id}", refund.id);
        Ok(refund)
    }
}
