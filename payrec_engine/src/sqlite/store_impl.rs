use std::fmt::Debug;

use chrono::Duration;
use log::trace;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders};
use crate::{
    db_types::{NewOrder, Order, OrderNumber, RefundStatus},
    traits::{OrderStore, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteOrderStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteOrderStore ({:?})", self.pool)
    }
}

impl SqliteOrderStore {
    pub async fn new(max_connections: u32) -> Result<Self, OrderStoreError> {
        let url = db_url();
        SqliteOrderStore::new_with_url(url.as_str(), max_connections).await
    }

    /// SQLite connections do not share a read view: a read on one pooled connection can lag a commit made on
    /// another, so the flows' read-after-write sequences break with `max_connections > 1`. SQLite serializes
    /// writers anyway; callers should pass 1.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderStoreError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderStore for SqliteOrderStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn delete_order(&self, id: i64) -> Result<(), OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::delete_unlinked_order(id, &mut conn).await
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_by_remote_order_id(&self, remote_order_id: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_remote_order_id(remote_order_id, &mut conn).await?)
    }

    async fn fetch_order_by_remote_payment_id(
        &self,
        remote_payment_id: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_remote_payment_id(remote_payment_id, &mut conn).await?)
    }

    async fn set_remote_order_id(&self, id: i64, remote_order_id: &str) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_remote_order_id(id, remote_order_id, &mut conn).await
    }

    async fn mark_payment_completed(
        &self,
        id: i64,
        remote_payment_id: &str,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_payment_completed(id, remote_payment_id, &mut conn).await
    }

    async fn mark_payment_failed(&self, id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_payment_failed(id, &mut conn).await
    }

    async fn record_refund(
        &self,
        id: i64,
        remote_refund_id: &str,
        refund_status: RefundStatus,
    ) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::record_refund(id, remote_refund_id, refund_status, &mut conn).await
    }

    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_stale_pending_orders(older_than, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
