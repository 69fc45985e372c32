use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use paygate_engine::{
    traits::{Notifier, PaymentStatusProvider},
    PaymentGatewayDatabase,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    config::{CallbackConfig, ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{moolre::MoolreStatusProvider, notifier::OrderNotifier},
    rate_limit::RateLimiter,
    routes::{callback_readiness, health, MoolreCallbackRoute, NotificationsRoute, VerifyPaymentRoute},
};

const DB_POOL_SIZE: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate database. {e}")))?;
    info!("🗃️ Database at {} is ready", config.database_url);
    let provider = MoolreStatusProvider::new(config.moolre.clone())?;
    let notifier = OrderNotifier::from_url(config.notify_url.as_deref())?;
    let srv = create_server_instance(config, db, provider, notifier)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: MoolreStatusProvider,
    notifier: OrderNotifier,
) -> Result<Server, ServerError> {
    // State shared by every worker. The rate limiter in particular must be a single instance, or each worker would
    // keep its own counts.
    let api = web::Data::new(ReconciliationApi::new(db, notifier, config.effect_timeout));
    let provider = web::Data::new(provider);
    let limiter = web::Data::new(RateLimiter::new(config.rate_limits));
    let options = web::Data::new(ServerOptions::from_config(&config));
    let callback = web::Data::new(CallbackConfig::new(config.callback_secret.clone()));
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("paygate::access_log"))
            .app_data(api.clone())
            .app_data(provider.clone())
            .app_data(limiter.clone())
            .app_data(options.clone())
            .app_data(callback.clone())
            .configure(configure_routes::<SqliteDatabase, OrderNotifier, MoolreStatusProvider>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The handlers expect the following application data to be present:
/// `ReconciliationApi<B, N>`, `P`, [`RateLimiter`], [`ServerOptions`] and [`CallbackConfig`].
pub fn configure_routes<B, N, P>(cfg: &mut web::ServiceConfig)
where
    B: PaymentGatewayDatabase + 'static,
    N: Notifier + 'static,
    P: PaymentStatusProvider + 'static,
{
    cfg.service(health).service(
        web::scope("/api")
            .service(MoolreCallbackRoute::<B, N>::new())
            .service(callback_readiness)
            .service(VerifyPaymentRoute::<B, N, P>::new())
            .service(NotificationsRoute::<B, N>::new()),
    );
}
