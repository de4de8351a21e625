use chrono::Duration;
use gateway_client::{GatewayError, PaymentGateway, RemoteOrder, RemotePayment, RemoteRefund};
use mockall::mock;
use payrec_common::Money;
use payrec_engine::{
    db_types::{NewOrder, Order, OrderNumber, RefundStatus},
    OrderStore,
    OrderStoreError,
};

mock! {
    pub OrderDb {}
    impl Clone for OrderDb {
        fn clone(&self) -> Self;
    }
    impl OrderStore for OrderDb {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn delete_order(&self, id: i64) -> Result<(), OrderStoreError>;
        async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_remote_order_id(&self, remote_order_id: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_remote_payment_id(&self, remote_payment_id: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn set_remote_order_id(&self, id: i64, remote_order_id: &str) -> Result<Order, OrderStoreError>;
        async fn mark_payment_completed(&self, id: i64, remote_payment_id: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn mark_payment_failed(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;
        async fn record_refund(&self, id: i64, remote_refund_id: &str, refund_status: RefundStatus) -> Result<Order, OrderStoreError>;
        async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderStoreError>;
        async fn close(&mut self) -> Result<(), OrderStoreError>;
    }
}

mock! {
    pub Gateway {}
    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGateway for Gateway {
        async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<RemoteOrder, GatewayError>;
        async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError>;
        async fn fetch_payments_for_order(&self, remote_order_id: &str) -> Result<Vec<RemotePayment>, GatewayError>;
        async fn issue_refund(&self, payment_id: &str, amount: Option<Money>) -> Result<RemoteRefund, GatewayError>;
    }
}
