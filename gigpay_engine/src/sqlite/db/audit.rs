use sqlx::SqliteConnection;

/// Appends an audit row. Detail is free-form JSON assembled by the caller.
pub async fn insert_audit_row(
    entity: &str,
    entity_id: &str,
    event: &str,
    detail: Option<serde_json::Value>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let detail = detail.map(|d| d.to_string());
    sqlx::query("INSERT INTO settlement_audit (entity, entity_id, event, detail) VALUES ($1, $2, $3, $4)")
        .bind(entity)
        .bind(entity_id)
        .bind(event)
        .bind(detail)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn contract_transition(
    contract_id: i64,
    from: &str,
    to: &str,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let detail = serde_json::json!({ "from": from, "to": to, "reason": reason });
    insert_audit_row("contract", &contract_id.to_string(), "transition", Some(detail), conn).await
}

pub async fn payment_transition(
    payment_id: i64,
    from: &str,
    to: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let detail = serde_json::json!({ "from": from, "to": to });
    insert_audit_row("payment", &payment_id.to_string(), "transition", Some(detail), conn).await
}

pub async fn reconciliation_anomaly(
    external_id: &str,
    gateway: &str,
    detail: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let detail = serde_json::json!({ "gateway": gateway, "detail": detail });
    insert_audit_row("webhook", external_id, "anomaly", Some(detail), conn).await
}
