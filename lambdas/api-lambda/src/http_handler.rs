use feeguard_shared::{
    auth,
    http::{body_str, cors_preflight, error_response, json_response},
    notification_log::LogSource,
    reminders::{send_fee_reminders, ReminderKind},
    types::TriggerRemindersRequest,
    AppState,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

/// Main Lambda handler - routes admin requests
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return cors_preflight();
    }

    if path != "/members" && path != "/reminders" {
        return error_response(StatusCode::NOT_FOUND, "not-found", "Not found");
    }

    if method != Method::POST {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method-not-allowed",
            "Method not allowed",
        );
    }

    // JWT is validated by API Gateway; we only read its subject
    let Some(caller_id) = caller_id(&event) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "Only authenticated users can call this endpoint.",
        );
    };

    match path {
        "/members" => auth::create_member(&state, &caller_id, event.body()).await,
        _ => trigger_reminders(&state, event.body()).await,
    }
}

fn caller_id(event: &Request) -> Option<String> {
    event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|auth| auth.jwt.as_ref())
        .and_then(|jwt| jwt.claims.get("sub"))
        .filter(|sub| !sub.is_empty())
        .map(|sub| sub.to_string())
}

/// Manual reminder run; `reminder_type` defaults to MANUAL
async fn trigger_reminders(state: &AppState, body: &Body) -> Result<Response<Body>, Error> {
    let raw = body_str(body);
    let req = if raw.trim().is_empty() {
        TriggerRemindersRequest::default()
    } else {
        match serde_json::from_str::<TriggerRemindersRequest>(raw) {
            Ok(req) => req,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid-argument",
                    format!("Invalid request body: {}", e),
                );
            }
        }
    };

    let kind = req.reminder_type.unwrap_or(ReminderKind::Manual);

    match send_fee_reminders(state, kind, LogSource::Api).await {
        Ok(_) => json_response(
            StatusCode::OK,
            &serde_json::json!({
                "success": true,
                "message": "Fee reminders sent successfully",
            }),
        ),
        Err(e) => {
            tracing::error!("Manual fee reminder run failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        }
    }
}
