use gigpay_common::FeeBreakdown;
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Contract, ContractPaymentStatus, ContractStatus, NewContract},
    traits::SettlementDatabaseError,
};

/// Inserts a contract for an accepted offer. The row is created in `pending_acceptance`; callers advance it with
/// [`transition`] inside the same transaction so the intermediate state is never observable.
pub async fn insert_contract(
    offer: NewContract,
    ledger: &FeeBreakdown,
    conn: &mut SqliteConnection,
) -> Result<Contract, SettlementDatabaseError> {
    let service_amount = offer.service_amount();
    let contract = sqlx::query_as(
        r#"
            INSERT INTO contracts (
                gig_id,
                provider_id,
                tasker_id,
                pricing_mode,
                hourly_rate,
                estimated_hours,
                service_amount,
                currency,
                fee_amount,
                tax_amount,
                payout_amount
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(offer.gig_id)
    .bind(offer.provider_id)
    .bind(offer.tasker_id)
    .bind(offer.pricing_mode)
    .bind(offer.hourly_rate)
    .bind(offer.estimated_hours)
    .bind(service_amount)
    .bind(offer.currency)
    .bind(ledger.application_fee_amount)
    .bind(ledger.provider_tax_amount)
    .bind(ledger.amount_received_by_payee)
    .fetch_one(conn)
    .await?;
    Ok(contract)
}

pub async fn fetch_contract(contract_id: i64, conn: &mut SqliteConnection) -> Result<Option<Contract>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM contracts WHERE id = $1").bind(contract_id).fetch_optional(conn).await
}

/// Returns the (at most one, enforced by a partial unique index) non-terminal contract for the gig.
pub async fn fetch_active_for_gig(gig_id: &str, conn: &mut SqliteConnection) -> Result<Option<Contract>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM contracts
            WHERE gig_id = $1
              AND status NOT IN ('completed', 'cancelled_by_provider', 'cancelled_by_tasker', 'cancelled_mutual')
        "#,
    )
    .bind(gig_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Contract>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM contracts WHERE provider_id = $1 OR tasker_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Compare-and-set transition. Returns `None` when the persisted status was not in `expected` (somebody else won the
/// race, or the transition is illegal); the caller re-fetches and decides.
///
/// The target state's set-once timestamp is stamped with `COALESCE`, so re-entering a state (e.g. `active` after a
/// revision request) never advances the original timestamp.
pub async fn transition(
    contract_id: i64,
    expected: &[ContractStatus],
    new_status: ContractStatus,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Contract>, SettlementDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE contracts SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(new_status);
    if let Some(col) = new_status.timestamp_column() {
        builder.push(format!(", {col} = COALESCE({col}, CURRENT_TIMESTAMP)"));
    }
    if let Some(reason) = reason {
        builder.push(", cancellation_reason = ");
        builder.push_bind(reason.to_string());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(contract_id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in expected {
        statuses.push_bind(*status);
    }
    builder.push(") RETURNING *");
    let contract: Option<Contract> = builder.build_query_as().fetch_optional(conn).await?;
    if let Some(c) = &contract {
        debug!("🗃️📋️ Contract #{} moved to '{}'", c.id, c.status);
    }
    Ok(contract)
}

/// Records the hours actually worked. Only sensible while the engagement is still in flight, so the update is
/// restricted to non-terminal states.
pub async fn set_actual_hours(
    contract_id: i64,
    hours: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Contract>, SettlementDatabaseError> {
    let contract = sqlx::query_as(
        r#"
            UPDATE contracts
            SET actual_hours = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND status NOT IN ('completed', 'cancelled_by_provider', 'cancelled_by_tasker', 'cancelled_mutual')
            RETURNING *;
        "#,
    )
    .bind(contract_id)
    .bind(hours)
    .fetch_optional(conn)
    .await?;
    Ok(contract)
}

/// Guarded update of the contract's funding status. `expected` prevents downgrades, e.g. a late "failed" event
/// cannot overwrite `paid`.
pub async fn set_payment_status(
    contract_id: i64,
    expected: &[ContractPaymentStatus],
    new_status: ContractPaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Contract>, SettlementDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE contracts SET updated_at = CURRENT_TIMESTAMP, payment_status = ");
    builder.push_bind(new_status);
    builder.push(" WHERE id = ");
    builder.push_bind(contract_id);
    builder.push(" AND payment_status IN (");
    let mut statuses = builder.separated(", ");
    for status in expected {
        statuses.push_bind(*status);
    }
    builder.push(") RETURNING *");
    let contract = builder.build_query_as().fetch_optional(conn).await?;
    Ok(contract)
}

/// Open (non-terminal) and completed contract counts for the dashboard.
pub async fn contract_counts(user_id: &str, conn: &mut SqliteConnection) -> Result<(i64, i64), sqlx::Error> {
    let open: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM contracts
            WHERE (provider_id = $1 OR tasker_id = $1)
              AND status NOT IN ('completed', 'cancelled_by_provider', 'cancelled_by_tasker', 'cancelled_mutual')
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    let completed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contracts WHERE (provider_id = $1 OR tasker_id = $1) AND status = 'completed'",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok((open, completed))
}
