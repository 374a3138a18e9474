use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, CancellationReason, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use crate::error::{FeeError, Result};
use crate::membership::StatusChange;
use crate::types::{Member, MemberStatus, MembershipMonth, Role};

/// DynamoDB caps a transaction at 100 items
pub const TRANSACTION_LIMIT: usize = 100;

pub const USER_ENTITY_TYPE: &str = "user";

pub fn user_key(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn get_s<'a>(item: &'a HashMap<String, AttributeValue>, key: &str) -> Option<&'a str> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.as_str())
}

/// Decode a user item; `None` when it is not a usable member record
pub fn member_from_item(item: &HashMap<String, AttributeValue>) -> Option<Member> {
    let user_id = get_s(item, "user_id")
        .map(|s| s.to_string())
        .or_else(|| {
            get_s(item, "PK")
                .and_then(|pk| pk.strip_prefix("USER#"))
                .map(|s| s.to_string())
        })?;

    let role = match get_s(item, "role").and_then(Role::parse) {
        Some(role) => role,
        None => {
            tracing::warn!("User {} has no recognised role, skipping", user_id);
            return None;
        }
    };

    let status = get_s(item, "status")
        .and_then(MemberStatus::parse)
        .unwrap_or(MemberStatus::Inactive);

    let last_payment_month = get_s(item, "last_payment_month").and_then(|raw| {
        raw.parse::<MembershipMonth>()
            .map_err(|e| tracing::warn!("User {} has bad last_payment_month: {}", user_id, e))
            .ok()
    });

    let total_paid = item
        .get("total_paid")
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(0.0);

    Some(Member {
        name: get_s(item, "name").unwrap_or_default().to_string(),
        email: get_s(item, "email").map(|s| s.to_string()),
        phone: get_s(item, "phone").map(|s| s.to_string()),
        membership_id: get_s(item, "membership_id").map(|s| s.to_string()),
        role,
        status,
        last_payment_month,
        push_token: get_s(item, "push_token").map(|s| s.to_string()),
        join_date: get_s(item, "join_date").map(|s| s.to_string()),
        total_paid,
        user_id,
    })
}

pub fn member_to_item(member: &Member) -> HashMap<String, AttributeValue> {
    let pk = user_key(&member.user_id);
    let mut item = HashMap::from([
        ("PK".to_string(), s(pk.clone())),
        ("SK".to_string(), s(pk)),
        ("entity_type".to_string(), s(USER_ENTITY_TYPE)),
        ("user_id".to_string(), s(member.user_id.clone())),
        ("name".to_string(), s(member.name.clone())),
        ("role".to_string(), s(member.role.as_str())),
        ("status".to_string(), s(member.status.as_str())),
        ("total_paid".to_string(), AttributeValue::N(member.total_paid.to_string())),
    ]);

    let optional = [
        ("email", member.email.clone()),
        ("phone", member.phone.clone()),
        ("membership_id", member.membership_id.clone()),
        ("last_payment_month", member.last_payment_month.map(|m| m.to_string())),
        ("push_token", member.push_token.clone()),
        ("join_date", member.join_date.clone()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            item.insert(key.to_string(), s(value));
        }
    }

    item
}

/// Create or replace a member item
pub async fn put_member(client: &DynamoClient, table_name: &str, member: &Member) -> Result<()> {
    client
        .put_item()
        .table_name(table_name)
        .set_item(Some(member_to_item(member)))
        .send()
        .await
        .map_err(FeeError::datastore)?;
    Ok(())
}

pub async fn get_member(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Option<Member>> {
    let pk = user_key(user_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", s(pk.clone()))
        .key("SK", s(pk))
        .send()
        .await
        .map_err(FeeError::datastore)?;

    Ok(result.item().and_then(member_from_item))
}

/// All users holding `role`, following scan pagination to the end
pub async fn list_by_role(
    client: &DynamoClient,
    table_name: &str,
    role: Role,
) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let output = client
            .scan()
            .table_name(table_name)
            .filter_expression("entity_type = :type AND #role = :role")
            .expression_attribute_names("#role", "role")
            .expression_attribute_values(":type", s(USER_ENTITY_TYPE))
            .expression_attribute_values(":role", s(role.as_str()))
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(FeeError::datastore)?;

        if let Some(items) = output.items {
            members.extend(items.iter().filter_map(member_from_item));
        }

        match output.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(members)
}

/// Update expression, attribute values and condition for `change`
fn status_update_parts(
    change: &StatusChange,
) -> (String, HashMap<String, AttributeValue>, String) {
    let mut values = HashMap::from([(":status".to_string(), s(change.status.as_str()))]);
    let mut expr = String::from("SET #status = :status");
    let mut condition = String::from("attribute_exists(PK)");

    if let Some(month) = change.last_payment_month {
        expr.push_str(", last_payment_month = :month");
        values.insert(":month".to_string(), s(month.to_string()));
    }

    // A payment landing after the roster scan must win over the lapse
    if let Some(month) = change.unless_paid_for {
        condition.push_str(
            " AND (attribute_not_exists(last_payment_month) OR last_payment_month <> :paid_month)",
        );
        values.insert(":paid_month".to_string(), s(month.to_string()));
    }

    (expr, values, condition)
}

/// Apply a status change to one existing member
pub async fn apply_status_change(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    change: &StatusChange,
) -> Result<()> {
    let pk = user_key(user_id);
    let (expr, values, condition) = status_update_parts(change);

    client
        .update_item()
        .table_name(table_name)
        .key("PK", s(pk.clone()))
        .key("SK", s(pk))
        .update_expression(expr)
        .condition_expression(condition)
        .expression_attribute_names("#status", "status")
        .set_expression_attribute_values(Some(values))
        .send()
        .await
        .map_err(|e| {
            let service_error = e.into_service_error();
            if service_error.is_conditional_check_failed_exception() {
                FeeError::NotFound(format!("member {}", user_id))
            } else {
                FeeError::datastore(service_error)
            }
        })?;

    Ok(())
}

/// One transaction applying `change` to every id in `user_ids`
fn status_transaction(
    table_name: &str,
    user_ids: &[String],
    change: &StatusChange,
) -> Result<Vec<TransactWriteItem>> {
    let (expr, values, condition) = status_update_parts(change);

    user_ids
        .iter()
        .map(|user_id| -> Result<TransactWriteItem> {
            let pk = user_key(user_id);
            let update = Update::builder()
                .table_name(table_name)
                .key("PK", s(pk.clone()))
                .key("SK", s(pk))
                .update_expression(expr.clone())
                .condition_expression(condition.clone())
                .expression_attribute_names("#status", "status")
                .set_expression_attribute_values(Some(values.clone()))
                .build()
                .map_err(FeeError::datastore)?;
            Ok(TransactWriteItem::builder().update(update).build())
        })
        .collect()
}

/// Split `user_ids` into transactions of at most [`TRANSACTION_LIMIT`] items
fn status_transactions(
    table_name: &str,
    user_ids: &[String],
    change: &StatusChange,
) -> Result<Vec<Vec<TransactWriteItem>>> {
    user_ids
        .chunks(TRANSACTION_LIMIT)
        .map(|chunk| status_transaction(table_name, chunk, change))
        .collect()
}

/// Ids still worth writing after a cancelled transaction. `None` unless
/// every cancellation was a failed condition.
fn retry_after_cancellation(
    pending: &[String],
    reasons: &[CancellationReason],
) -> Option<Vec<String>> {
    if reasons.len() != pending.len() {
        return None;
    }

    let mut remaining = Vec::with_capacity(pending.len());
    let mut dropped = 0;
    for (user_id, reason) in pending.iter().zip(reasons) {
        match reason.code() {
            Some("ConditionalCheckFailed") => {
                tracing::info!("Skipping status change for {}: condition no longer holds", user_id);
                dropped += 1;
            }
            None | Some("None") => remaining.push(user_id.clone()),
            Some(_) => return None,
        }
    }

    (dropped > 0).then_some(remaining)
}

fn partial_batch_failure(written: usize, total: usize, detail: String) -> FeeError {
    tracing::error!(
        "Status batch stopped after {} of {} updates were committed",
        written,
        total
    );
    FeeError::Datastore(format!("{} ({} of {} updates committed)", detail, written, total))
}

/// Apply the same change to many members. Each chunk of
/// [`TRANSACTION_LIMIT`] commits atomically; members whose condition fails
/// are left out and the rest of their chunk is resubmitted. Returns the
/// number written.
pub async fn apply_status_batch(
    client: &DynamoClient,
    table_name: &str,
    user_ids: &[String],
    change: &StatusChange,
) -> Result<usize> {
    let mut written = 0;

    let transactions = status_transactions(table_name, user_ids, change)?;
    for (chunk, mut items) in user_ids.chunks(TRANSACTION_LIMIT).zip(transactions) {
        let mut pending = chunk.to_vec();

        while !pending.is_empty() {
            let result = client
                .transact_write_items()
                .set_transact_items(Some(items))
                .send()
                .await;

            let err = match result {
                Ok(_) => {
                    written += pending.len();
                    break;
                }
                Err(e) => e.into_service_error(),
            };

            let remaining = match &err {
                TransactWriteItemsError::TransactionCanceledException(cancelled) => {
                    retry_after_cancellation(&pending, cancelled.cancellation_reasons())
                }
                _ => None,
            };

            match remaining {
                Some(remaining) => {
                    pending = remaining;
                    items = status_transaction(table_name, &pending, change)?;
                }
                None => {
                    return Err(partial_batch_failure(
                        written,
                        user_ids.len(),
                        DisplayErrorContext(err).to_string(),
                    ));
                }
            }
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_member() -> Member {
        Member {
            user_id: "abc-123".to_string(),
            name: "Selvi".to_string(),
            email: Some("selvi@example.org".to_string()),
            phone: None,
            membership_id: Some("NT-042".to_string()),
            role: Role::Member,
            status: MemberStatus::Active,
            last_payment_month: MembershipMonth::new(2026, 9),
            push_token: Some("tok-selvi".to_string()),
            join_date: Some("2025-01-04T10:00:00+05:30".to_string()),
            total_paid: 0.0,
        }
    }

    #[test]
    fn test_item_round_trip_keeps_every_field() {
        let member = sample_member();
        let item = member_to_item(&member);

        assert_eq!(get_s(&item, "PK"), Some("USER#abc-123"));
        assert_eq!(get_s(&item, "entity_type"), Some("user"));
        assert_eq!(get_s(&item, "last_payment_month"), Some("2026-09"));
        assert!(!item.contains_key("phone"));

        assert_eq!(member_from_item(&item), Some(member));
    }

    #[test]
    fn test_decoding_tolerates_sparse_items() {
        let item = HashMap::from([
            ("PK".to_string(), s("USER#legacy")),
            ("role".to_string(), s("admin")),
            ("last_payment_month".to_string(), s("September")),
        ]);

        let member = member_from_item(&item).unwrap();
        assert_eq!(member.user_id, "legacy");
        assert_eq!(member.role, Role::Admin);
        assert_eq!(member.status, MemberStatus::Inactive);
        assert_eq!(member.last_payment_month, None);
        assert_eq!(member.total_paid, 0.0);
    }

    #[test]
    fn test_items_without_role_are_skipped() {
        let item = HashMap::from([("user_id".to_string(), s("x"))]);
        assert_eq!(member_from_item(&item), None);
    }

    #[test]
    fn test_payment_sets_month_and_only_requires_the_item() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let (expr, values, condition) =
            status_update_parts(&StatusChange::payment_received(month));
        assert_eq!(expr, "SET #status = :status, last_payment_month = :month");
        assert_eq!(condition, "attribute_exists(PK)");
        assert_eq!(values[":status"], s("active"));
        assert_eq!(values[":month"], s("2026-10"));
        assert!(!values.contains_key(":paid_month"));
    }

    #[test]
    fn test_lapse_is_conditional_on_the_month_still_unpaid() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let (expr, values, condition) = status_update_parts(&StatusChange::lapsed(month));
        assert_eq!(expr, "SET #status = :status");
        assert_eq!(
            condition,
            "attribute_exists(PK) AND (attribute_not_exists(last_payment_month) \
             OR last_payment_month <> :paid_month)"
        );
        assert_eq!(values[":status"], s("inactive"));
        assert_eq!(values[":paid_month"], s("2026-10"));
        assert!(!values.contains_key(":month"));
    }

    #[test]
    fn test_transactions_are_chunked_at_the_item_limit() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let ids: Vec<String> = (0..250).map(|i| format!("u{}", i)).collect();

        let transactions =
            status_transactions("feeguard", &ids, &StatusChange::lapsed(month)).unwrap();
        let sizes: Vec<usize> = transactions.iter().map(|t| t.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let update = transactions[2][0].update().unwrap();
        assert_eq!(update.table_name(), "feeguard");
        assert_eq!(update.key()["PK"], s("USER#u200"));
        assert_eq!(update.key()["SK"], s("USER#u200"));
        assert_eq!(update.update_expression(), "SET #status = :status");
        assert!(update
            .condition_expression()
            .unwrap()
            .contains("last_payment_month <> :paid_month"));
        assert_eq!(
            update.expression_attribute_values().unwrap()[":paid_month"],
            s("2026-10")
        );
    }

    #[test]
    fn test_no_ids_means_no_transactions() {
        let month = MembershipMonth::new(2026, 10).unwrap();
        let transactions = status_transactions("feeguard", &[], &StatusChange::lapsed(month));
        assert!(transactions.unwrap().is_empty());
    }

    fn reason(code: &str) -> CancellationReason {
        CancellationReason::builder().code(code).build()
    }

    #[test]
    fn test_cancelled_chunk_retries_without_failed_conditions() {
        let pending = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let reasons = [reason("None"), reason("ConditionalCheckFailed"), reason("None")];

        assert_eq!(
            retry_after_cancellation(&pending, &reasons),
            Some(vec!["a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_cancellation_for_other_reasons_is_not_retried() {
        let pending = vec!["a".to_string(), "b".to_string()];

        let conflict = [reason("TransactionConflict"), reason("None")];
        assert_eq!(retry_after_cancellation(&pending, &conflict), None);

        // nothing was dropped, so a resubmit would fail the same way
        let unexplained = [reason("None"), reason("None")];
        assert_eq!(retry_after_cancellation(&pending, &unexplained), None);

        assert_eq!(retry_after_cancellation(&pending, &[reason("None")]), None);
    }

    #[test]
    fn test_partial_failure_reports_committed_count() {
        let err = partial_batch_failure(200, 250, "throttled".to_string());
        assert_eq!(
            err.to_string(),
            "datastore error: throttled (200 of 250 updates committed)"
        );
    }
}
