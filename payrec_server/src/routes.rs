//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, gateway calls, etc.) must be expressed as futures or asynchronous functions. Async handlers
//! get executed concurrently by worker threads and thus don't block execution.

use actix_web::{get, web, HttpResponse, Responder};
use gateway_client::PaymentGateway;
use log::*;
use payrec_engine::{
    OrderIntakeRequest,
    OrderStore,
    PaymentFlowApi,
    RefundRequest,
    VerifyPaymentRequest,
    WebhookEvent,
    WebhookOutcome,
};

use crate::{data_objects::JsonResponse, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Intake  ----------------------------------------------------
route!(create_order => Post "/payments/create-order" impl OrderStore, PaymentGateway);
pub async fn create_order<B, G>(
    body: web::Json<OrderIntakeRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST create-order for {}", request.customer_email);
    let result = api.process_intake(request).await.map_err(|e| {
        warn!("💻️ Order intake failed. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Order {} created. Remote order id: {}", result.order_number, result.remote_order_id);
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Verify  ----------------------------------------------------
route!(verify_payment => Post "/payments/verify" impl OrderStore, PaymentGateway);
pub async fn verify_payment<B, G>(
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let request = body.into_inner();
    let order_id = request.order_id;
    debug!("💻️ POST verify for order id {order_id}");
    // The full reason stays in the logs. The storefront only learns that verification did not succeed.
    let result = api.verify_payment(request).await.map_err(|e| {
        warn!("💻️ Payment verification failed for order id {order_id}. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Order {} verified. Payment status: {}", result.order_number, result.payment_status);
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
// Registered inside the webhook scope, which carries the HMAC check and the optional IP whitelist.
route!(webhook => Post "" impl OrderStore, PaymentGateway);
pub async fn webhook<B, G>(body: web::Bytes, api: web::Data<PaymentFlowApi<B, G>>) -> HttpResponse
where
    B: OrderStore,
    G: PaymentGateway,
{
    trace!("🪝️ Received webhook request");
    // Webhook responses must always be in the 200 range, otherwise the gateway will retry the delivery.
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("🪝️ Could not deserialize webhook body. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not deserialize event."));
        },
    };
    let tag = event.event.clone();
    let result = match api.process_webhook_event(event).await {
        Ok(WebhookOutcome::Applied(order_number)) => {
            info!("🪝️ Event '{tag}' applied to order {order_number}.");
            JsonResponse::success("Event processed.")
        },
        Ok(WebhookOutcome::AlreadyApplied) => {
            info!("🪝️ Event '{tag}' was already applied. Duplicate delivery.");
            JsonResponse::success("Event already processed.")
        },
        Ok(WebhookOutcome::OrderNotFound) => {
            warn!("🪝️ Event '{tag}' does not match any order.");
            JsonResponse::success("No matching order.")
        },
        Ok(WebhookOutcome::Ignored) => {
            debug!("🪝️ Event '{tag}' is not supported. Ignoring.");
            JsonResponse::success("Event ignored.")
        },
        Ok(WebhookOutcome::MalformedPayload) => {
            warn!("🪝️ Event '{tag}' was missing its payload object.");
            JsonResponse::failure("Malformed payload.")
        },
        Err(e) => {
            error!("🪝️ Error processing '{tag}' event. {e}");
            JsonResponse::failure("Unexpected error handling event.")
        },
    };
    HttpResponse::Ok().json(result)
}

//----------------------------------------------   Refund  ----------------------------------------------------
route!(refund => Post "/payments/refund" impl OrderStore, PaymentGateway);
pub async fn refund<B, G>(
    body: web::Json<RefundRequest>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST refund for order id {}", request.order_id);
    let result = api.process_refund(request).await.map_err(|e| {
        warn!("💻️ Refund rejected. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Refund {} ({}) recorded for order {}.", result.remote_refund_id, result.amount, result.order_number);
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Status  ----------------------------------------------------
route!(order_status => Get "/payments/{order_id}" impl OrderStore, PaymentGateway);
pub async fn order_status<B, G>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    trace!("💻️ GET status for order id {order_id}");
    let projection = api.order_status(order_id).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(projection))
}
