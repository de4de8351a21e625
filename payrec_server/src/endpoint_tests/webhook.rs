use std::net::{IpAddr, SocketAddr};

use actix_web::{body::MessageBody, dev::Service, http::StatusCode, test, test::TestRequest, web, App};
use futures::{future::ok, FutureExt};
use payrec_common::{Money, Secret};
use payrec_engine::{helpers::hmac_hex, OrderStoreError, PaymentFlowApi};
use serde_json::json;

use super::{
    helpers::{completed_order, pending_order, TEST_SIGNING_SECRET},
    mocks::{MockGateway, MockOrderDb},
};
use crate::{
    config::WEBHOOK_SIGNATURE_HEADER,
    errors::ServerError,
    helpers::get_remote_ip,
    middleware::HmacMiddlewareFactory,
    routes::WebhookRoute,
};

const WEBHOOK_SECRET: &str = "webhook_test_secret";

async fn deliver(
    body: serde_json::Value,
    signature: Option<String>,
    hmac_checks: bool,
    db: MockOrderDb,
) -> (StatusCode, String) {
    let api = PaymentFlowApi::new(db, MockGateway::new(), Secret::new(TEST_SIGNING_SECRET.to_string()));
    let scope = web::scope("/payments/webhook")
        .wrap(HmacMiddlewareFactory::new(
            WEBHOOK_SIGNATURE_HEADER,
            Secret::new(WEBHOOK_SECRET.to_string()),
            hmac_checks,
        ))
        .service(WebhookRoute::<MockOrderDb, MockGateway>::new());
    let app = App::new().app_data(web::Data::new(api)).service(scope);
    let service = test::init_service(app).await;

    let payload = body.to_string();
    let mut req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(payload);
    if let Some(signature) = signature {
        req = req.insert_header((WEBHOOK_SIGNATURE_HEADER, signature));
    }
    // Middleware rejections surface as service errors, so convert those into responses too.
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = actix_web::HttpResponse::from_error(e);
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

/// Delivers a correctly-signed capture event through the HMAC middleware stacked under the IP whitelist closure,
/// the same composition the server builds for the webhook scope.
async fn deliver_from_peer(peer: &str, whitelist: Vec<IpAddr>, db: MockOrderDb) -> (StatusCode, String) {
    let api = PaymentFlowApi::new(db, MockGateway::new(), Secret::new(TEST_SIGNING_SECRET.to_string()));
    let scope = web::scope("/payments/webhook")
        .wrap(HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true))
        .wrap_fn(move |req, srv| {
            let allowed = get_remote_ip(req.request(), false, false).is_some_and(|ip| whitelist.contains(&ip));
            if allowed {
                srv.call(req).boxed_local()
            } else {
                ok(req.error_response(ServerError::Forbidden("Webhook peer is not whitelisted.".to_string())))
                    .boxed_local()
            }
        })
        .service(WebhookRoute::<MockOrderDb, MockGateway>::new());
    let app = App::new().app_data(web::Data::new(api)).service(scope);
    let service = test::init_service(app).await;

    let event = captured_event();
    let signature = sign_body(&event);
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .peer_addr(SocketAddr::new(peer.parse().unwrap(), 44444))
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, signature))
        .set_payload(event.to_string());
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = actix_web::HttpResponse::from_error(e);
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

fn sign_body(body: &serde_json::Value) -> String {
    hmac_hex(WEBHOOK_SECRET, body.to_string().as_bytes())
}

fn captured_event() -> serde_json::Value {
    json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": "pay_remote001",
            "order_id": "order_remote001",
            "status": "captured",
            "amount": 106000
        }}}
    })
}

#[actix_web::test]
async fn signed_capture_event_is_applied() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id().returning(|_| Ok(Some(pending_order())));
    db.expect_mark_payment_completed().times(1).returning(|_, _| Ok(Some(completed_order())));

    let event = captured_event();
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event processed"));
}

#[actix_web::test]
async fn unsigned_delivery_is_forbidden() {
    let _ = env_logger::try_init().ok();
    // The handler must never run, so the mock carries no expectations.
    let (status, _body) = deliver(captured_event(), None, true, MockOrderDb::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn tampered_body_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let signature = sign_body(&captured_event());
    let mut tampered = captured_event();
    tampered["payload"]["payment"]["entity"]["amount"] = json!(1);
    let (status, _body) = deliver(tampered, Some(signature), true, MockOrderDb::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn disabled_hmac_checks_allow_unsigned_deliveries() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id().returning(|_| Ok(Some(pending_order())));
    db.expect_mark_payment_completed().returning(|_, _| Ok(Some(completed_order())));
    let (status, _body) = deliver(captured_event(), None, false, db).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn whitelisted_peer_reaches_the_handler() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id().returning(|_| Ok(Some(pending_order())));
    db.expect_mark_payment_completed().returning(|_, _| Ok(Some(completed_order())));
    let whitelist = vec!["10.0.0.1".parse().unwrap()];
    let (status, body) = deliver_from_peer("10.0.0.1", whitelist, db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event processed"));
}

#[actix_web::test]
async fn non_whitelisted_peer_is_rejected_before_the_handler() {
    let _ = env_logger::try_init().ok();
    let whitelist = vec!["10.0.0.1".parse().unwrap()];
    // No expectations: neither the HMAC check nor the handler may run for a denied peer.
    let (status, _body) = deliver_from_peer("10.0.0.2", whitelist, MockOrderDb::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhook_acknowledges_unknown_events() {
    let _ = env_logger::try_init().ok();
    let event = json!({ "event": "subscription.activated", "payload": {} });
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, MockOrderDb::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ignored"));
}

#[actix_web::test]
async fn webhook_acknowledges_unknown_orders() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id().returning(|_| Ok(None));
    let event = captured_event();
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No matching order"));
}

#[actix_web::test]
async fn webhook_swallows_internal_errors() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id()
        .returning(|_| Err(OrderStoreError::DatabaseError("disk I/O error".to_string())));
    let event = captured_event();
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, db).await;
    // The gateway must still see a 200, or it will hammer the endpoint with retries.
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":false"));
}

#[actix_web::test]
async fn webhook_acknowledges_undeserializable_bodies() {
    let _ = env_logger::try_init().ok();
    let event = json!({ "event": 42 });
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, MockOrderDb::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":false"));
}

#[actix_web::test]
async fn duplicate_refund_event_is_acknowledged_as_duplicate() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    let mut refunded = completed_order();
    refunded.remote_refund_id = Some("rfnd_other".to_string());
    db.expect_fetch_order_by_remote_payment_id().returning(move |_| Ok(Some(refunded.clone())));
    db.expect_record_refund().returning(|id, _, _| Err(OrderStoreError::LinkageAlreadySet(id, "refund")));

    let event = json!({
        "event": "refund.processed",
        "payload": { "refund": { "entity": {
            "id": "rfnd_new",
            "payment_id": "pay_remote001",
            "amount": 106000,
            "status": "processed"
        }}}
    });
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("already processed"));
}

#[actix_web::test]
async fn capture_event_with_mismatched_amount_is_still_applied_locally() {
    // The webhook path trusts the signed event; amount checks belong to the verify path.
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderDb::new();
    db.expect_fetch_order_by_remote_order_id().returning(|_| Ok(Some(pending_order())));
    db.expect_mark_payment_completed().returning(|_, _| Ok(Some(completed_order())));
    let mut event = captured_event();
    event["payload"]["payment"]["entity"]["amount"] = json!(Money::from(1).value());
    let signature = sign_body(&event);
    let (status, body) = deliver(event, Some(signature), true, db).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event processed"));
}
