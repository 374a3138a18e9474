use aws_sdk_cognitoidentityprovider::types::{AttributeType, MessageActionType};
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::error::FeeError;
use crate::http::{body_str, error_response, json_response};
use crate::members;
use crate::types::{CreateMemberRequest, CreateMemberResponse, Member, MemberStatus, Role};
use crate::AppState;

fn attribute(name: &str, value: &str) -> Result<AttributeType, FeeError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(FeeError::auth)
}

fn validate(req: &CreateMemberRequest) -> Result<(), String> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err("A valid email is required".to_string());
    }
    if req.password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if req.name.trim().is_empty() {
        return Err("Name is required".to_string());
    }
    Ok(())
}

/// Create a member account: Cognito user first, then the member record
pub async fn create_member(
    state: &AppState,
    caller_id: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    let req: CreateMemberRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid-argument",
                format!("Invalid request body: {}", e),
            );
        }
    };

    if let Err(message) = validate(&req) {
        return error_response(StatusCode::BAD_REQUEST, "invalid-argument", message);
    }

    let caller =
        members::get_member(&state.dynamo_client, &state.settings.table_name, caller_id).await?;
    if caller.map(|c| c.role) != Some(Role::Admin) {
        tracing::warn!("User {} tried to create a member without admin role", caller_id);
        return error_response(
            StatusCode::FORBIDDEN,
            "permission-denied",
            "Only admins can create members.",
        );
    }

    let Some(user_pool_id) = state.settings.user_pool_id.as_deref() else {
        tracing::error!("COGNITO_USER_POOL_ID not set; cannot create members");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Member creation is not configured",
        );
    };

    match register_member(state, user_pool_id, req).await {
        Ok(uid) => {
            tracing::info!("Successfully created new member: {}", uid);
            json_response(StatusCode::CREATED, &CreateMemberResponse { success: true, uid })
        }
        Err(e) => {
            tracing::error!("Error creating member: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        }
    }
}

async fn register_member(
    state: &AppState,
    user_pool_id: &str,
    req: CreateMemberRequest,
) -> Result<String, FeeError> {
    let created = state
        .cognito_client
        .admin_create_user()
        .user_pool_id(user_pool_id)
        .username(&req.email)
        .user_attributes(attribute("email", &req.email)?)
        .user_attributes(attribute("email_verified", "true")?)
        .user_attributes(attribute("name", &req.name)?)
        .message_action(MessageActionType::Suppress)
        .send()
        .await
        .map_err(FeeError::auth)?;

    let uid = created
        .user()
        .and_then(|user| user.attributes().iter().find(|a| a.name() == "sub"))
        .and_then(|a| a.value())
        .map(|s| s.to_string())
        .ok_or_else(|| FeeError::Auth("Cognito returned no sub for the new user".to_string()))?;

    state
        .cognito_client
        .admin_set_user_password()
        .user_pool_id(user_pool_id)
        .username(&req.email)
        .password(&req.password)
        .permanent(true)
        .send()
        .await
        .map_err(FeeError::auth)?;

    let member = Member {
        user_id: uid.clone(),
        name: req.name,
        email: Some(req.email),
        phone: req.phone,
        membership_id: req.membership_id,
        role: Role::Member,
        status: MemberStatus::Active,
        last_payment_month: None,
        push_token: None,
        join_date: Some(chrono::Utc::now().to_rfc3339()),
        total_paid: 0.0,
    };
    members::put_member(&state.dynamo_client, &state.settings.table_name, &member).await?;

    Ok(uid)
}
