use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gigpay_engine::{events::EventProducers, SettlementApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::WebhookSignatureMiddlewareFactory,
    routes::{
        gateways,
        health,
        AcceptOfferRoute,
        ApproveCompletionRoute,
        CancelContractRoute,
        ContractByIdRoute,
        ContractPaymentsRoute,
        CreatePaymentIntentRoute,
        DashboardRoute,
        IncomingWebhookRoute,
        MyContractsRoute,
        RefundContractRoute,
        RequestRevisionRoute,
        SubmitWorkRoute,
        WithdrawRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let api = SettlementApi::new(db.clone(), EventProducers::default(), config.fees);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gps::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(config.gateways.clone()))
            .app_data(web::Data::new(config.auth.clone()));
        let webhook_scope = web::scope("/webhook")
            .wrap(WebhookSignatureMiddlewareFactory::new(config.gateways.clone(), config.signature_checks))
            .service(IncomingWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(gateways)
            .service(AcceptOfferRoute::<SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase>::new())
            .service(RefundContractRoute::<SqliteDatabase>::new())
            .service(SubmitWorkRoute::<SqliteDatabase>::new())
            .service(ApproveCompletionRoute::<SqliteDatabase>::new())
            .service(RequestRevisionRoute::<SqliteDatabase>::new())
            .service(CancelContractRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase>::new())
            .service(DashboardRoute::<SqliteDatabase>::new())
            .service(MyContractsRoute::<SqliteDatabase>::new())
            .service(ContractByIdRoute::<SqliteDatabase>::new())
            .service(ContractPaymentsRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
