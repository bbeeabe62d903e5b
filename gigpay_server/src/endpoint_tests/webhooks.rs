use actix_web::{
    http::{header::ContentType, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use chrono::Utc;
use gateway_tools::{webhook::sign_payload, GatewayConfig, GatewayFactory};
use gigpay_common::Secret;
use gigpay_engine::{
    db_types::PaymentStatus,
    events::EventProducers,
    traits::SettledPayment,
    SettlementApi,
};

use super::{
    helpers::{sample_contract, sample_payment, send_request, standard_schedule},
    mocks::MockSettlementDb,
};
use crate::{
    middleware::{WebhookSignatureMiddlewareFactory, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    routes::IncomingWebhookRoute,
};

const CARDGATE_SECRET: &str = "whsec_cardgate_test";
const BANKWIRE_SECRET: &str = "whsec_bankwire_test";

const SETTLED_BODY: &str =
    r#"{ "event": "transfer.settled", "transfer_id": "tr_77", "amount_cents": 12995, "currency": "usd" }"#;

fn signed_request(path: &str, body: &'static str, secret: &str) -> TestRequest {
    let ts = Utc::now().timestamp();
    let sig = sign_payload(secret, ts, body.as_bytes());
    TestRequest::post()
        .uri(path)
        .insert_header(ContentType::json())
        .insert_header((TIMESTAMP_HEADER, ts.to_string()))
        .insert_header((SIGNATURE_HEADER, sig))
        .set_payload(body)
}

#[actix_web::test]
async fn a_signed_delivery_settles_the_payment() {
    let _ = env_logger::try_init().ok();
    let req = signed_request("/webhook/bankwire", SETTLED_BODY, BANKWIRE_SECRET);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("payment 1 settled"), "unexpected body: {body}");
}

#[actix_web::test]
async fn an_unmatched_delivery_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let req = signed_request("/webhook/bankwire", SETTLED_BODY, BANKWIRE_SECRET);
    let (status, body) = send_request(req, "", configure_unknown_payment).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event acknowledged"), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_tampered_body_is_rejected() {
    let _ = env_logger::try_init().ok();
    let ts = Utc::now().timestamp();
    let sig = sign_payload(BANKWIRE_SECRET, ts, SETTLED_BODY.as_bytes());
    let tampered =
        r#"{ "event": "transfer.settled", "transfer_id": "tr_77", "amount_cents": 999995, "currency": "usd" }"#;
    let req = TestRequest::post()
        .uri("/webhook/bankwire")
        .insert_header(ContentType::json())
        .insert_header((TIMESTAMP_HEADER, ts.to_string()))
        .insert_header((SIGNATURE_HEADER, sig))
        .set_payload(tampered);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Invalid webhook signature."), "unexpected body: {body}");
}

#[actix_web::test]
async fn missing_signature_headers_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/webhook/bankwire")
        .insert_header(ContentType::json())
        .set_payload(SETTLED_BODY);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Missing webhook signature headers."), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_stale_timestamp_is_rejected() {
    let _ = env_logger::try_init().ok();
    let ts = Utc::now().timestamp() - 600; // 10 minutes old
    let sig = sign_payload(BANKWIRE_SECRET, ts, SETTLED_BODY.as_bytes());
    let req = TestRequest::post()
        .uri("/webhook/bankwire")
        .insert_header(ContentType::json())
        .insert_header((TIMESTAMP_HEADER, ts.to_string()))
        .insert_header((SIGNATURE_HEADER, sig))
        .set_payload(SETTLED_BODY);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Invalid webhook signature."), "unexpected body: {body}");
}

#[actix_web::test]
async fn a_delivery_signed_with_the_wrong_providers_secret_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req = signed_request("/webhook/bankwire", SETTLED_BODY, CARDGATE_SECRET);
    let (status, _) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn an_unknown_provider_is_not_found() {
    let _ = env_logger::try_init().ok();
    let req = signed_request("/webhook/paypal", SETTLED_BODY, BANKWIRE_SECRET);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Unknown webhook provider."), "unexpected body: {body}");
}

#[actix_web::test]
async fn an_unrecognised_event_type_is_ignored() {
    let _ = env_logger::try_init().ok();
    let body: &'static str = r#"{ "event": "account.updated", "transfer_id": "tr_77" }"#;
    let req = signed_request("/webhook/bankwire", body, BANKWIRE_SECRET);
    let (status, body) = send_request(req, "", configure_settling).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ignored"), "unexpected body: {body}");
}

//------------------------------------------  configurations  --------------------------------------------------------

fn test_factory() -> GatewayFactory {
    let cardgate = GatewayConfig::new(
        "https://api.cardgate.test",
        Secret::new("sk_test".to_string()),
        Secret::new(CARDGATE_SECRET.to_string()),
    );
    let bankwire = GatewayConfig::new(
        "https://api.bankwire.test",
        Secret::new("bw_test".to_string()),
        Secret::new(BANKWIRE_SECRET.to_string()),
    );
    GatewayFactory::new(cardgate, bankwire)
}

fn webhook_scope(cfg: &mut ServiceConfig, db: MockSettlementDb) {
    let api = SettlementApi::new(db, EventProducers::default(), standard_schedule());
    cfg.service(
        web::scope("/webhook")
            .wrap(WebhookSignatureMiddlewareFactory::new(test_factory(), true))
            .service(IncomingWebhookRoute::<MockSettlementDb>::new()),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(test_factory()));
}

fn configure_settling(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_payment_by_external_id()
        .returning(|_| Ok(Some(sample_payment(PaymentStatus::Processing))));
    db.expect_settle_payment().returning(|_, new_status| {
        let mut payment = sample_payment(new_status);
        payment.succeeded_at = Some(Utc::now());
        Ok(SettledPayment {
            payment,
            contract: Some(sample_contract(gigpay_engine::db_types::ContractStatus::Active)),
            applied: true,
        })
    });
    webhook_scope(cfg, db);
}

fn configure_unknown_payment(cfg: &mut ServiceConfig) {
    let mut db = MockSettlementDb::new();
    db.expect_fetch_payment_by_external_id().returning(|_| Ok(None));
    db.expect_record_anomaly().returning(|_, _, _| Ok(()));
    webhook_scope(cfg, db);
}
