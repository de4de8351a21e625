use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use payrec_engine::PaymentFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment gateway could not be reached. Please try again shortly.")]
    GatewayUnavailable,
    #[error("The payment could not be verified. Please contact support if you were charged.")]
    PaymentVerificationFailed,
    #[error("{0}")]
    BadRequest(String),
    #[error("Access denied. {0}")]
    Forbidden(String),
    #[error("Refund rejected. {0}")]
    RefundRejected(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::RefundRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Maps flow errors onto HTTP responses. Verification rejections deliberately collapse into one generic
/// client-facing message: the storefront must not learn whether the amount mismatched or the gateway refused,
/// only that the payment did not verify. The specific reason is logged server-side at the call site.
impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::MissingFields(s) => Self::BadRequest(s),
            PaymentFlowError::NotFound(s) => Self::NoRecordFound(s),
            PaymentFlowError::SignatureMismatch |
            PaymentFlowError::PaymentNotCompleted(_) |
            PaymentFlowError::AmountMismatch => Self::PaymentVerificationFailed,
            PaymentFlowError::GatewayUnreachable(_) => Self::GatewayUnavailable,
            PaymentFlowError::RefundNotAllowed(_) |
            PaymentFlowError::RefundAmountOutOfRange { .. } |
            PaymentFlowError::AlreadyRefunded => Self::RefundRejected(e.to_string()),
            PaymentFlowError::GatewayError(e) => Self::BackendError(e.to_string()),
            PaymentFlowError::StoreError(e) => Self::BackendError(e.to_string()),
        }
    }
}
