use actix_web::{
    http::{header::ContentType, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use gateway_tools::GatewayFactory;
use gigpay_common::MoneyCents;
use gigpay_engine::{
    db_types::ContractStatus,
    events::EventProducers,
    traits::{DashboardSummary, SettlementDatabaseError},
    SettlementApi,
};
use log::debug;

use super::{
    helpers::{sample_contract, send_request, standard_schedule, valid_token},
    mocks::MockSettlementDb,
};
use crate::routes::{
    self,
    AcceptOfferRoute,
    CreatePaymentIntentRoute,
    DashboardRoute,
    RequestRevisionRoute,
    SubmitWorkRoute,
};

const OFFER_JSON: &str = r#"{
    "gig_id": "gig-1",
    "provider_id": "prov-1",
    "tasker_id": "task-1",
    "pricing_mode": "fixed",
    "hourly_rate": 10000,
    "estimated_hours": null,
    "currency": "usd"
}"#;

#[actix_web::test]
async fn accept_offer_requires_a_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/contracts/accept-offer")
        .insert_header(ContentType::json())
        .set_payload(OFFER_JSON);
    let (status, body) = send_request(req, "", configure_accept).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided."), "unexpected body: {body}");
}

#[actix_web::test]
async fn tasker_accepts_an_offer() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("task-1");
    let req = TestRequest::post()
        .uri("/contracts/accept-offer")
        .insert_header(ContentType::json())
        .set_payload(OFFER_JSON);
    let (status, body) = send_request(req, &token, configure_accept).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""gig_id":"gig-1""#), "unexpected body: {body}");
    assert!(body.contains(r#""status":"pending_payment""#), "unexpected body: {body}");
}

#[actix_web::test]
async fn only_the_tasker_may_accept() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("prov-1");
    let req = TestRequest::post()
        .uri("/contracts/accept-offer")
        .insert_header(ContentType::json())
        .set_payload(OFFER_JSON);
    let (status, body) = send_request(req, &token, configure_accept).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Only the tasker may accept"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_forged_token_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut token = valid_token("task-1");
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    debug!("Calling accept-offer with tampered token {token}");
    let req = TestRequest::post()
        .uri("/contracts/accept-offer")
        .insert_header(ContentType::json())
        .set_payload(OFFER_JSON);
    let (status, body) = send_request(req, &token, configure_accept).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token validation failed."), "unexpected body: {body}");
}

#[actix_web::test]
async fn only_the_tasker_may_submit_work() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("prov-1");
    let req = TestRequest::patch()
        .uri("/contracts/1/submit-work")
        .insert_header(ContentType::json())
        .set_payload(r#"{"actual_hours":null}"#);
    let (status, body) = send_request(req, &token, configure_active_contract).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Only the tasker may submit work"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_conflicting_transition_is_a_409() {
    let _ = env_logger::try_init().ok();
    // Revision can only be requested on submitted work; the contract is still active.
    let token = valid_token("prov-1");
    let req = TestRequest::patch().uri("/contracts/1/request-revision");
    let (status, body) = send_request(req, &token, configure_active_contract).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("cannot move to"), "unexpected body: {body}");
}

#[actix_web::test]
async fn an_unknown_gateway_is_not_found() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("prov-1");
    let req = TestRequest::post()
        .uri("/contracts/1/create-payment-intent")
        .insert_header(ContentType::json())
        .set_payload(r#"{"gateway":"paypal"}"#);
    let (status, body) = send_request(req, &token, configure_active_contract).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Unknown payment gateway"), "unexpected body: {body}");
}

#[actix_web::test]
async fn dashboard_returns_the_money_summary() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("task-1");
    let req = TestRequest::get().uri("/dashboard");
    let (status, body) = send_request(req, &token, configure_dashboard).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""total_earned":10000"#), "unexpected body: {body}");
    assert!(body.contains(r#""completed_contracts":1"#), "unexpected body: {body}");
}

#[actix_web::test]
async fn gateway_metadata_is_public() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/gateways");
    let (status, body) = send_request(req, "", configure_gateways).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("cardgate"), "unexpected body: {body}");
    assert!(body.contains("bankwire"), "unexpected body: {body}");
}

//------------------------------------------  configurations  --------------------------------------------------------

fn configure_accept(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_create_accepted_contract()
        .returning(|_, _| Ok((sample_contract(ContractStatus::PendingPayment), true)));
    let api = SettlementApi::new(db, EventProducers::default(), standard_schedule());
    cfg.service(AcceptOfferRoute::<MockSettlementDb>::new()).app_data(web::Data::new(api));
}

fn configure_active_contract(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_contract().returning(|_| Ok(Some(sample_contract(ContractStatus::Active))));
    db.expect_transition_contract().returning(|contract_id, _, new_status, _| {
        Err(SettlementDatabaseError::ContractConflict {
            id: contract_id,
            current: ContractStatus::Active,
            requested: new_status,
            contract: Box::new(sample_contract(ContractStatus::Active)),
        })
    });
    let api = SettlementApi::new(db, EventProducers::default(), standard_schedule());
    cfg.service(SubmitWorkRoute::<MockSettlementDb>::new())
        .service(RequestRevisionRoute::<MockSettlementDb>::new())
        .service(CreatePaymentIntentRoute::<MockSettlementDb>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(GatewayFactory::default()));
}

fn configure_dashboard(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_dashboard_summary().returning(|user_id| {
        Ok(DashboardSummary {
            user_id: user_id.to_string(),
            total_earned: MoneyCents::from(10_000),
            completed_contracts: 1,
            ..Default::default()
        })
    });
    let api = SettlementApi::new(db, EventProducers::default(), standard_schedule());
    cfg.service(DashboardRoute::<MockSettlementDb>::new()).app_data(web::Data::new(api));
}

fn configure_gateways(cfg: &mut ServiceConfig) {
    cfg.service(routes::gateways);
}
