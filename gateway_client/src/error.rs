use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize gateway client: {0}")]
    Initialization(String),
    #[error("Could not reach the payment gateway: {0}")]
    Unreachable(String),
    #[error("Could not deserialize gateway response: {0}")]
    ResponseFormat(String),
    #[error("Gateway rejected the request. Error {status}. {message}")]
    RequestFailed { status: u16, message: String },
}

impl GatewayError {
    /// Whether a retry of the same request could plausibly succeed. Callers use this to distinguish "try again
    /// later" from "the gateway said no".
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Unreachable(_) => true,
            GatewayError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
