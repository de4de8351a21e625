use chrono::{serde::ts_seconds_option, DateTime, Utc};
use payrec_common::Money;
use serde::{Deserialize, Serialize};

/// Payment states the gateway reports that count as money-in-hand for reconciliation purposes.
pub const SETTLED_PAYMENT_STATES: [&str; 2] = ["captured", "authorized"];

//--------------------------------------    RemoteOrder      ---------------------------------------------------------
/// An order record minted by the gateway. Every field is untrusted input; the reconciliation flows re-verify
/// anything they rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default, with = "ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

//--------------------------------------   RemotePayment     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub order_id: String,
    pub amount: Money,
    pub currency: String,
    /// The gateway's own status string, e.g. "created", "authorized", "captured", "failed".
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, with = "ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RemotePayment {
    /// True when the gateway reports the payment as captured or authorized.
    pub fn is_settled(&self) -> bool {
        SETTLED_PAYMENT_STATES.contains(&self.status.as_str())
    }
}

//--------------------------------------    RemoteRefund     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: Money,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: String,
    #[serde(default, with = "ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}
