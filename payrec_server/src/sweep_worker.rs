use gateway_client::GatewayApi;
use log::*;
use payrec_engine::{PaymentFlowApi, SqliteOrderStore};
use tokio::task::JoinHandle;

use crate::config::SweepConfig;

/// Starts the reconciliation sweep worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval_secs` the worker asks the gateway about orders that have sat in `Pending`/`Pending` for longer
/// than the stale threshold. That catches payments whose webhook never arrived and whose customer closed the
/// browser before the verification callback.
pub fn start_sweep_worker(db: SqliteOrderStore, gateway: GatewayApi, config: SweepConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(config.interval_secs));
        // The sweep completes orders via gateway lookups keyed on stored ids, so it has no signature to verify.
        let api = PaymentFlowApi::new(db, gateway, Default::default());
        info!("🕰️ Reconciliation sweep worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Running reconciliation sweep");
            match api.reconcile_stale_orders(config.stale_after).await {
                Ok(summary) => {
                    if summary.scanned == 0 {
                        debug!("🕰️ No stale orders to reconcile");
                    } else {
                        info!(
                            "🕰️ Swept {} stale orders: {} completed, {} deferred",
                            summary.scanned,
                            summary.completed.len(),
                            summary.deferred
                        );
                        debug!("🕰️ Completed orders: {}", order_list(&summary.completed));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running reconciliation sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[payrec_engine::db_types::OrderNumber]) -> String {
    orders.iter().map(|o| o.to_string()).collect::<Vec<String>>().join(", ")
}
