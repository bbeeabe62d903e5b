use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{DateTime, Days, TimeZone, Utc};
use gigpay_common::{FeeSchedule, MoneyCents, Secret};
use gigpay_engine::db_types::{
    Contract,
    ContractPaymentStatus,
    ContractStatus,
    Payment,
    PaymentStatus,
    PaymentType,
    PricingMode,
};

use crate::{auth::TokenIssuer, config::AuthConfig};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-signing-secret-0123456789".to_string()) }
}

pub fn valid_token(user_id: &str) -> String {
    let signer = TokenIssuer::new(&get_auth_config());
    signer.issue_token(user_id, Utc::now() + Days::new(1)).expect("Failed to sign token")
}

/// $5.00 fixed + 10% fee, 13% tax. A $100 contract charges $129.95.
pub fn standard_schedule() -> FeeSchedule {
    FeeSchedule::new(MoneyCents::from(500), 1000, 1300)
}

pub async fn send_request(
    mut req: TestRequest,
    token: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    let app = App::new().app_data(actix_web::web::Data::new(get_auth_config())).configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

fn ts(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
}

/// A $100 fixed-price contract between prov-1 and task-1, at the standard schedule's numbers.
pub fn sample_contract(status: ContractStatus) -> Contract {
    Contract {
        id: 1,
        gig_id: "gig-1".to_string(),
        provider_id: "prov-1".to_string(),
        tasker_id: "task-1".to_string(),
        pricing_mode: PricingMode::Fixed,
        hourly_rate: Some(MoneyCents::from(10_000)),
        estimated_hours: None,
        actual_hours: None,
        service_amount: MoneyCents::from(10_000),
        currency: "usd".to_string(),
        status,
        payment_status: ContractPaymentStatus::Pending,
        fee_amount: MoneyCents::from(1_500),
        tax_amount: MoneyCents::from(1_495),
        payout_amount: MoneyCents::from(10_000),
        accepted_at: Some(ts(10)),
        work_submitted_at: None,
        approved_at: None,
        completed_at: None,
        cancelled_at: None,
        cancellation_reason: None,
        created_at: ts(10),
        updated_at: ts(10),
    }
}

/// The charge record funding [`sample_contract`].
pub fn sample_payment(status: PaymentStatus) -> Payment {
    Payment {
        id: 1,
        payment_type: PaymentType::Payment,
        contract_id: Some(1),
        payer_id: "prov-1".to_string(),
        payee_id: "task-1".to_string(),
        currency: "usd".to_string(),
        amount: MoneyCents::from(10_000),
        application_fee_amount: MoneyCents::from(1_500),
        provider_tax_amount: MoneyCents::from(1_495),
        tasker_tax_amount: MoneyCents::default(),
        total_provider_payment: MoneyCents::from(12_995),
        amount_received_by_payee: MoneyCents::from(10_000),
        gateway: "bankwire".to_string(),
        intent_id: Some("tr_77".to_string()),
        payout_id: None,
        refund_id: None,
        transfer_id: None,
        provider_account_id: None,
        status,
        succeeded_at: None,
        refunded_at: None,
        created_at: ts(11),
        updated_at: ts(11),
    }
}
