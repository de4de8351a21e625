mod errors;
mod objects;
mod payment_flow_api;
mod webhook_events;

pub use errors::PaymentFlowError;
pub use objects::{
    OrderIntakeRequest,
    OrderIntakeResult,
    OrderProjection,
    RefundRequest,
    RefundResult,
    SweepSummary,
    VerifyPaymentRequest,
    VerifyPaymentResult,
};
pub use payment_flow_api::PaymentFlowApi;
pub use webhook_events::{
    Entity,
    EventKind,
    PaymentEventData,
    RefundEventData,
    WebhookEvent,
    WebhookOutcome,
    WebhookPayload,
};
