use gateway_client::GatewayError;
use payrec_common::Money;
use thiserror::Error;

use crate::traits::OrderStoreError;

/// Failure vocabulary for the reconciliation flows.
///
/// The split matters to callers: `GatewayUnreachable` and `GatewayError` are transient (the user should retry),
/// everything else is a definitive rejection with no state change.
#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("Required fields are missing or invalid. {0}")]
    MissingFields(String),
    #[error("Order {0} was not found.")]
    NotFound(String),
    #[error("Payment signature verification failed.")]
    SignatureMismatch,
    #[error("The payment gateway could not be reached. {0}")]
    GatewayUnreachable(String),
    #[error("The gateway reports the payment as '{0}', which is not a completed state.")]
    PaymentNotCompleted(String),
    #[error("The gateway payment amount does not match the order total.")]
    AmountMismatch,
    #[error("Refund not allowed. {0}")]
    RefundNotAllowed(String),
    #[error("Refund amount {amount} is out of range for order total {total}.")]
    RefundAmountOutOfRange { amount: Money, total: Money },
    #[error("The order has already been refunded.")]
    AlreadyRefunded,
    #[error("Gateway error. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Order store error. {0}")]
    StoreError(#[from] OrderStoreError),
}

impl PaymentFlowError {
    /// Stable machine-readable tag for the HTTP layer and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentFlowError::MissingFields(_) => "MissingFields",
            PaymentFlowError::NotFound(_) => "NotFound",
            PaymentFlowError::SignatureMismatch => "SignatureMismatch",
            PaymentFlowError::GatewayUnreachable(_) => "GatewayUnreachable",
            PaymentFlowError::PaymentNotCompleted(_) => "PaymentNotCompleted",
            PaymentFlowError::AmountMismatch => "AmountMismatch",
            PaymentFlowError::RefundNotAllowed(_) => "RefundNotAllowed",
            PaymentFlowError::RefundAmountOutOfRange { .. } => "RefundAmountOutOfRange",
            PaymentFlowError::AlreadyRefunded => "AlreadyRefunded",
            PaymentFlowError::GatewayError(_) => "GatewayError",
            PaymentFlowError::StoreError(_) => "StoreError",
        }
    }
}
