use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

pub fn error_response(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
) -> Result<Response<Body>, Error> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        },
    )
}

pub fn cors_preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn body_str(body: &Body) -> &str {
    match body {
        Body::Text(text) => text,
        Body::Binary(bytes) => std::str::from_utf8(bytes).unwrap_or(""),
        Body::Empty => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let resp =
            error_response(StatusCode::FORBIDDEN, "permission-denied", "Admins only").unwrap();
        assert_eq!(resp.status(), 403);
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");

        let body: serde_json::Value = serde_json::from_str(body_str(resp.body())).unwrap();
        assert_eq!(body["error"], "permission-denied");
        assert_eq!(body["message"], "Admins only");
    }

    #[test]
    fn test_body_str_handles_every_variant() {
        assert_eq!(body_str(&Body::Text("{}".to_string())), "{}");
        assert_eq!(body_str(&Body::Binary(b"{\"a\":1}".to_vec())), "{\"a\":1}");
        assert_eq!(body_str(&Body::Binary(vec![0xff, 0xfe])), "");
        assert_eq!(body_str(&Body::Empty), "");
    }
}
