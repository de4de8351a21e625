use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use gateway_client::GatewayApi;
use log::{info, warn};
use payrec_engine::{PaymentFlowApi, SqliteOrderStore};

use crate::{
    config::{ServerConfig, WEBHOOK_SIGNATURE_HEADER},
    errors::ServerError,
    helpers::get_remote_ip,
    middleware::HmacMiddlewareFactory,
    routes::{health, CreateOrderRoute, OrderStatusRoute, RefundRoute, VerifyPaymentRoute, WebhookRoute},
    sweep_worker::start_sweep_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    // A single connection: SQLite reads on other pooled connections can return pre-commit snapshots, and the
    // flows rely on read-after-write across handlers.
    let db = SqliteOrderStore::new_with_url(&config.database_url, 1)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.sweep.enabled {
        let gateway =
            GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let _handle = start_sweep_worker(db.clone(), gateway, config.sweep);
    }
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteOrderStore) -> Result<Server, ServerError> {
    let gateway = GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = HttpServer::new(move || {
        let signing_secret = config.gateway.key_secret.clone();
        let flow_api = PaymentFlowApi::new(db.clone(), gateway.clone(), signing_secret);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("prs::access_log"))
            .app_data(web::Data::new(flow_api));
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook.whitelist.clone();
        let webhook_scope = web::scope("/payments/webhook")
            .wrap(HmacMiddlewareFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(whitelist)) => {
                        info!("Gateway webhook from {ip}");
                        whitelist.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("No IP address found in webhook remote peer request, denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ServerError::Forbidden("Webhook peer is not whitelisted.".to_string())))
                        .boxed_local()
                }
            })
            .service(WebhookRoute::<SqliteOrderStore, GatewayApi>::new());
        app.service(health)
            .service(webhook_scope)
            .service(CreateOrderRoute::<SqliteOrderStore, GatewayApi>::new())
            .service(VerifyPaymentRoute::<SqliteOrderStore, GatewayApi>::new())
            .service(RefundRoute::<SqliteOrderStore, GatewayApi>::new())
            .service(OrderStatusRoute::<SqliteOrderStore, GatewayApi>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
