/// Development error detail
///
/// Internal errors reach clients as a generic message. Outside production
/// this layer swaps that message for the logged detail carried in the
/// response's [`ErrorDetail`] extension.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    app::AppState,
    error::{ErrorDetail, ErrorResponse},
};

pub async fn expose_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if state.config.is_production() {
        return response;
    }

    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail(detail)) => with_detail(response, detail),
        None => response,
    }
}

fn with_detail(response: Response, detail: String) -> Response {
    let status = response.status();
    let body = ErrorResponse {
        status: "error".to_string(),
        error: "internal_error".to_string(),
        message: detail,
        details: None,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_detail_replaces_generic_message() {
        let response = ApiError::InternalError("pool timed out".to_string()).into_response();
        let rewritten = with_detail(response, "pool timed out".to_string());
        assert_eq!(rewritten.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(rewritten.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "pool timed out");
        assert_eq!(body.status, "error");
    }
}
