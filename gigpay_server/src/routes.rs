//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers which block the current thread will stall the worker, so any long, non-cpu-bound operation (I/O,
//! database calls, gateway calls) must be awaited, never blocked on.

use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use gateway_tools::{GatewayAdapter, GatewayFactory};
use gigpay_engine::{db_types::NewContract, SettlementApi, SettlementDatabase};
use log::*;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{
        ApproveCompletionRequest,
        CancelRequest,
        ContractWithPayment,
        GatewaySelection,
        JsonResponse,
        SubmitWorkRequest,
        WithdrawRequest,
    },
    errors::ServerError,
};

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

// ----------------------------------------------   Health  ----------------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ---------------------------------------------   Gateways  ---------------------------------------------------------
/// Public display metadata for the supported payment providers. Purely descriptive; authorization never reads it.
#[get("/gateways")]
pub async fn gateways() -> impl Responder {
    trace!("💻️ Received gateway metadata request");
    HttpResponse::Ok().json(GatewayFactory::supported_gateways())
}

// --------------------------------------------  Accept offer  -------------------------------------------------------
route!(accept_offer => Post "/contracts/accept-offer" impl SettlementDatabase);
/// The tasker accepts an offer on a gig. Returns 201 with the new contract, or 200 with the existing one when the
/// gig already has a live contract.
pub async fn accept_offer<B: SettlementDatabase>(
    user: AuthenticatedUser,
    api: web::Data<SettlementApi<B>>,
    body: web::Json<NewContract>,
) -> Result<HttpResponse, ServerError> {
    let offer = body.into_inner();
    debug!("💻️ POST accept-offer for gig {} by {}", offer.gig_id, user.user_id);
    let (contract, created) = api.accept_offer(&user.user_id, offer).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok(HttpResponse::build(status).json(contract))
}

// -----------------------------------------  Create payment intent  -------------------------------------------------
route!(create_payment_intent => Post "/contracts/{id}/create-payment-intent" impl SettlementDatabase);
/// The provider funds the contract through the chosen provider. Idempotent while an intent is in flight.
pub async fn create_payment_intent<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
    factory: web::Data<GatewayFactory>,
    body: web::Json<GatewaySelection>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    debug!("💻️ POST create-payment-intent on contract {contract_id} via {}", body.gateway);
    let gateway = select_gateway(&factory, &body.gateway)?;
    let (contract, payment) = api.create_payment_intent(&user.user_id, contract_id, &gateway).await?;
    Ok(HttpResponse::Ok().json(ContractWithPayment { contract, payment }))
}

// ----------------------------------------------   Refund   ---------------------------------------------------------
route!(refund_contract => Post "/contracts/{id}/refund" impl SettlementDatabase);
/// The provider asks for their money back. The refund is initiated here and settles via webhook.
pub async fn refund_contract<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
    factory: web::Data<GatewayFactory>,
    body: web::Json<GatewaySelection>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    debug!("💻️ POST refund on contract {contract_id} via {}", body.gateway);
    let gateway = select_gateway(&factory, &body.gateway)?;
    let (contract, payment) = api.refund_contract(&user.user_id, contract_id, &gateway).await?;
    Ok(HttpResponse::Ok().json(ContractWithPayment { contract, payment }))
}

// --------------------------------------------  Submit work  --------------------------------------------------------
route!(submit_work => Patch "/contracts/{id}/submit-work" impl SettlementDatabase);
pub async fn submit_work<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
    body: web::Json<SubmitWorkRequest>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    debug!("💻️ PATCH submit-work on contract {contract_id} by {}", user.user_id);
    let contract = api.submit_work(&user.user_id, contract_id, body.actual_hours).await?;
    Ok(HttpResponse::Ok().json(contract))
}

// -----------------------------------------  Approve completion  ----------------------------------------------------
route!(approve_completion => Patch "/contracts/{id}/approve-completion" impl SettlementDatabase);
/// The provider approves the submitted work, triggering the payout. Exactly one payout is ever created, no matter
/// how many times this is called.
pub async fn approve_completion<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
    factory: web::Data<GatewayFactory>,
    body: web::Json<ApproveCompletionRequest>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    debug!("💻️ PATCH approve-completion on contract {contract_id} by {}", user.user_id);
    let gateway = select_gateway(&factory, &body.gateway)?;
    let (contract, payment) =
        api.approve_completion(&user.user_id, contract_id, &gateway, &body.destination_account).await?;
    Ok(HttpResponse::Ok().json(ContractWithPayment { contract, payment }))
}

// ------------------------------------------  Request revision  -----------------------------------------------------
route!(request_revision => Patch "/contracts/{id}/request-revision" impl SettlementDatabase);
pub async fn request_revision<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    debug!("💻️ PATCH request-revision on contract {contract_id} by {}", user.user_id);
    let contract = api.request_revision(&user.user_id, contract_id).await?;
    Ok(HttpResponse::Ok().json(contract))
}

// ----------------------------------------------   Cancel   ---------------------------------------------------------
route!(cancel_contract => Patch "/contracts/{id}/cancel" impl SettlementDatabase);
pub async fn cancel_contract<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
    body: web::Json<CancelRequest>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    let body = body.into_inner();
    debug!("💻️ PATCH cancel on contract {contract_id} by {} as {:?}", user.user_id, body.cancelled_by);
    let contract =
        api.cancel_contract(&user.user_id, contract_id, body.cancelled_by.contract_status(), body.reason).await?;
    Ok(HttpResponse::Ok().json(contract))
}

// ---------------------------------------------   Withdraw   --------------------------------------------------------
route!(withdraw => Post "/payments/withdraw" impl SettlementDatabase);
/// The tasker withdraws their balance. No fee, no tax; the record settles when the payout webhook arrives.
pub async fn withdraw<B: SettlementDatabase>(
    user: AuthenticatedUser,
    api: web::Data<SettlementApi<B>>,
    factory: web::Data<GatewayFactory>,
    body: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST withdraw {} by {} via {}", body.amount, user.user_id, body.gateway);
    let gateway = select_gateway(&factory, &body.gateway)?;
    let payment = api.withdraw(&user.user_id, body.amount, &gateway, &body.provider_account_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

// ---------------------------------------------   Dashboard  --------------------------------------------------------
route!(dashboard => Get "/dashboard" impl SettlementDatabase);
pub async fn dashboard<B: SettlementDatabase>(
    user: AuthenticatedUser,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET dashboard for {}", user.user_id);
    let summary = api.dashboard(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

// ---------------------------------------------   Contracts  --------------------------------------------------------
route!(my_contracts => Get "/contracts" impl SettlementDatabase);
pub async fn my_contracts<B: SettlementDatabase>(
    user: AuthenticatedUser,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET contracts for {}", user.user_id);
    let contracts = api.contracts_for_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(contracts))
}

route!(contract_by_id => Get "/contracts/{id}" impl SettlementDatabase);
pub async fn contract_by_id<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    trace!("💻️ GET contract {contract_id} for {}", user.user_id);
    let contract = api.contract(contract_id).await?;
    if user.user_id != contract.provider_id && user.user_id != contract.tasker_id {
        return Err(ServerError::Settlement(gigpay_engine::SettlementError::Forbidden(format!(
            "User {} is not a party to contract {contract_id}",
            user.user_id
        ))));
    }
    Ok(HttpResponse::Ok().json(contract))
}

route!(contract_payments => Get "/contracts/{id}/payments" impl SettlementDatabase);
pub async fn contract_payments<B: SettlementDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let contract_id = path.into_inner();
    trace!("💻️ GET payments on contract {contract_id} for {}", user.user_id);
    let contract = api.contract(contract_id).await?;
    if user.user_id != contract.provider_id && user.user_id != contract.tasker_id {
        return Err(ServerError::Settlement(gigpay_engine::SettlementError::Forbidden(format!(
            "User {} is not a party to contract {contract_id}",
            user.user_id
        ))));
    }
    let payments = api.payments_for_contract(contract_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

// ----------------------------------------------   Webhook   --------------------------------------------------------
route!(incoming_webhook => Post "/{provider}" impl SettlementDatabase);
/// Receives a provider webhook delivery. The signature has already been verified by the webhook middleware.
///
/// Every outcome the provider should not retry is acknowledged with 200: applied settlements, duplicates, unknown
/// event types, and recorded anomalies. Only infrastructure failures return an error status, which makes the
/// provider redeliver.
pub async fn incoming_webhook<B: SettlementDatabase>(
    path: web::Path<String>,
    api: web::Data<SettlementApi<B>>,
    factory: web::Data<GatewayFactory>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    let provider = path.into_inner();
    debug!("💻️📨️ Webhook delivery from {provider} ({} bytes)", body.len());
    let gateway = select_gateway(&factory, &provider)?;
    let event = match gateway.parse_webhook(&body) {
        Ok(event) => event,
        Err(e) => {
            // Unknown event types are expected; providers send their full catalogue.
            debug!("💻️📨️ Ignoring {provider} delivery: {e}");
            return Ok(HttpResponse::Ok().json(JsonResponse::success("ignored")));
        },
    };
    let message = match api.reconcile_webhook_event(event).await? {
        Some(settled) if settled.applied => format!("payment {} settled", settled.payment.id),
        Some(settled) => format!("duplicate event for payment {} acknowledged", settled.payment.id),
        None => "event acknowledged".to_string(),
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//------------------------------------------------  helpers  ---------------------------------------------------------

fn select_gateway(factory: &GatewayFactory, key: &str) -> Result<gateway_tools::Gateway, ServerError> {
    if !GatewayFactory::is_supported(key) {
        return Err(ServerError::UnsupportedGateway(key.to_string()));
    }
    factory.for_provider(key).map_err(|e| ServerError::ConfigurationError(e.to_string()))
}
