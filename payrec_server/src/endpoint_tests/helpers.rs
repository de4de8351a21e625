use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use payrec_common::Money;
use payrec_engine::db_types::{Json, LineItem, Order, OrderNumber, OrderStatus, PaymentStatus, RefundStatus};
use serde_json::Value;

/// The signing secret the mocked flow API is configured with in these tests.
pub const TEST_SIGNING_SECRET: &str = "endpoint_test_secret";

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn post_request(
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// A representative order row, pending payment, linked to a remote order.
pub fn pending_order() -> Order {
    let created_at = Utc.with_ymd_and_hms(2025, 8, 1, 10, 30, 0).unwrap();
    Order {
        id: 1,
        order_number: OrderNumber::from("ORD-20250801103000-4321".to_string()),
        customer_name: "Asha Rao".to_string(),
        customer_email: "asha@example.com".to_string(),
        customer_phone: "+911234567890".to_string(),
        shipping_address: "12 MG Road, Bengaluru".to_string(),
        items: Json(vec![LineItem {
            product_id: "sku-1".to_string(),
            name: "Widget".to_string(),
            quantity: 1,
            unit_price: Money::from(106_000),
        }]),
        subtotal: Money::from(106_000),
        discount: Money::from(0),
        shipping: Money::from(0),
        total: Money::from(106_000),
        currency: "INR".to_string(),
        remote_order_id: Some("order_remote001".to_string()),
        remote_payment_id: None,
        remote_refund_id: None,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        refund_status: RefundStatus::None,
        created_at,
        updated_at: created_at,
    }
}

/// The same order after the completion transition has been applied.
pub fn completed_order() -> Order {
    Order {
        remote_payment_id: Some("pay_remote001".to_string()),
        status: OrderStatus::Processing,
        payment_status: PaymentStatus::Completed,
        ..pending_order()
    }
}
