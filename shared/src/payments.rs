use crate::error::{FeeError, Result};
use crate::members;
use crate::membership::StatusChange;
use crate::push::{send_multicast, PushMessage};
use crate::reminders::{format_amount, format_rupees};
use crate::types::{MembershipMonth, PaymentRecord, Role};
use crate::AppState;

pub const PAYMENT_RECEIVED_TYPE: &str = "PAYMENT_RECEIVED";

/// Alert sent to admins when a member pays
pub fn payment_alert(member_name: Option<&str>, payment: &PaymentRecord) -> PushMessage {
    let name = member_name.filter(|n| !n.trim().is_empty()).unwrap_or("A member");

    PushMessage::new(
        "💵 New Payment Received",
        format!(
            "{} paid {} for membership fee.",
            name,
            format_rupees(payment.amount)
        ),
    )
    .with_data("type", PAYMENT_RECEIVED_TYPE)
    .with_data("userId", payment.user_id.clone())
    .with_data("amount", format_amount(payment.amount))
}

/// React to a newly recorded payment. Only `success` payments reactivate;
/// anything else is ignored.
pub async fn handle_payment_created(state: &AppState, payment: &PaymentRecord) -> Result<()> {
    if !payment.is_success() {
        tracing::info!(
            "Payment {} has status {}, nothing to do",
            payment.payment_id,
            payment.status
        );
        return Ok(());
    }

    let month = MembershipMonth::of(&state.settings.now());
    members::apply_status_change(
        &state.dynamo_client,
        &state.settings.table_name,
        &payment.user_id,
        &StatusChange::payment_received(month),
    )
    .await?;

    tracing::info!("User {} reactivated for {}", payment.user_id, month);

    if let Err(e) = notify_admins_about_payment(state, payment).await {
        tracing::error!("Error notifying admins: {}", e);
    }

    Ok(())
}

async fn notify_admins_about_payment(state: &AppState, payment: &PaymentRecord) -> Result<()> {
    let table_name = &state.settings.table_name;

    let member = members::get_member(&state.dynamo_client, table_name, &payment.user_id)
        .await?
        .ok_or_else(|| FeeError::NotFound(format!("member {}", payment.user_id)))?;

    let admins = members::list_by_role(&state.dynamo_client, table_name, Role::Admin).await?;
    let admin_tokens: Vec<String> = admins
        .iter()
        .filter_map(|admin| admin.push_token().map(|t| t.to_string()))
        .collect();

    if admin_tokens.is_empty() {
        tracing::info!("No admin tokens to notify");
        return Ok(());
    }

    let receipt = send_multicast(
        state.messenger.as_ref(),
        &admin_tokens,
        &payment_alert(Some(&member.name), payment),
    )
    .await;

    tracing::info!(
        "Notified {} of {} admins about payment from {}",
        receipt.success_count,
        admin_tokens.len(),
        payment.user_id
    );
    Ok(())
}
