use gigpay_common::MoneyCents;
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::SettlementDatabaseError,
};

pub async fn insert_payment(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, SettlementDatabaseError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payment_type,
                contract_id,
                payer_id,
                payee_id,
                currency,
                amount,
                application_fee_amount,
                provider_tax_amount,
                tasker_tax_amount,
                total_provider_payment,
                amount_received_by_payee,
                gateway,
                provider_account_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(payment.payment_type)
    .bind(payment.contract_id)
    .bind(payment.payer_id)
    .bind(payment.payee_id)
    .bind(payment.currency)
    .bind(payment.amount)
    .bind(payment.breakdown.application_fee_amount)
    .bind(payment.breakdown.provider_tax_amount)
    .bind(payment.breakdown.tasker_tax_amount)
    .bind(payment.breakdown.total_provider_payment)
    .bind(payment.breakdown.amount_received_by_payee)
    .bind(payment.gateway)
    .bind(payment.provider_account_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️💰️ Payment #{} ({}) recorded for {}", payment.id, payment.payment_type, payment.amount);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await
}

/// Matches a payment on any of its gateway identifiers. All four columns carry partial unique indexes, so at most
/// one record can match.
pub async fn fetch_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payments WHERE intent_id = $1 OR payout_id = $1 OR refund_id = $1 OR transfer_id = $1",
    )
    .bind(external_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_for_contract(contract_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE contract_id = $1 ORDER BY created_at ASC")
        .bind(contract_id)
        .fetch_all(conn)
        .await
}

/// Attaches the gateway intent id and promotes the record to `processing`. Only legal while the payment is still
/// `pending` with no intent attached.
pub async fn attach_intent(
    payment_id: i64,
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementDatabaseError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET intent_id = $2, status = 'processing', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'pending' AND intent_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(intent_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn attach_refund(
    payment_id: i64,
    refund_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementDatabaseError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET refund_id = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND refund_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(refund_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// The exactly-once payout guard: the update matches only while `payout_id` is NULL, so precisely one of two racing
/// approvals claims the slot.
pub async fn claim_payout(
    payment_id: i64,
    payout_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementDatabaseError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET payout_id = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND payout_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .bind(payout_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Compare-and-set status update. `expected` is the set of statuses allowed to move to `new_status` (see
/// [`PaymentStatus::legal_sources`]); settlement timestamps are stamped once.
pub async fn update_status(
    payment_id: i64,
    expected: &[PaymentStatus],
    new_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SettlementDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE payments SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(new_status);
    match new_status {
        PaymentStatus::Succeeded => {
            builder.push(", succeeded_at = COALESCE(succeeded_at, CURRENT_TIMESTAMP)");
        },
        PaymentStatus::Refunded => {
            builder.push(", refunded_at = COALESCE(refunded_at, CURRENT_TIMESTAMP)");
        },
        _ => {},
    }
    builder.push(" WHERE id = ");
    builder.push_bind(payment_id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in expected {
        statuses.push_bind(*status);
    }
    builder.push(") RETURNING *");
    let payment: Option<Payment> = builder.build_query_as().fetch_optional(conn).await?;
    if let Some(p) = &payment {
        debug!("🗃️💰️ Payment #{} moved to '{}'", p.id, p.status);
    }
    Ok(payment)
}

//--------------------------------------  Dashboard queries   --------------------------------------------------------

async fn sum(query: &str, user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(query).bind(user_id).fetch_one(conn).await?;
    Ok(MoneyCents::from(total))
}

pub async fn total_earned(user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    sum(
        r#"
            SELECT COALESCE(SUM(amount_received_by_payee), 0) FROM payments
            WHERE payee_id = $1 AND payment_type = 'payment' AND status = 'succeeded'
        "#,
        user_id,
        conn,
    )
    .await
}

pub async fn pending_earnings(user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    sum(
        r#"
            SELECT COALESCE(SUM(amount_received_by_payee), 0) FROM payments
            WHERE payee_id = $1 AND payment_type = 'payment' AND status IN ('pending', 'processing')
        "#,
        user_id,
        conn,
    )
    .await
}

pub async fn total_spent(user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    sum(
        r#"
            SELECT COALESCE(SUM(total_provider_payment), 0) FROM payments
            WHERE payer_id = $1 AND payment_type = 'payment' AND status = 'succeeded'
        "#,
        user_id,
        conn,
    )
    .await
}

pub async fn fees_paid(user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    sum(
        r#"
            SELECT COALESCE(SUM(application_fee_amount), 0) FROM payments
            WHERE payer_id = $1 AND payment_type = 'payment' AND status = 'succeeded'
        "#,
        user_id,
        conn,
    )
    .await
}

pub async fn total_withdrawn(user_id: &str, conn: &mut SqliteConnection) -> Result<MoneyCents, sqlx::Error> {
    sum(
        r#"
            SELECT COALESCE(SUM(amount_received_by_payee), 0) FROM payments
            WHERE payee_id = $1 AND payment_type = 'withdrawal' AND status = 'succeeded'
        "#,
        user_id,
        conn,
    )
    .await
}
