/**
 * Error Conversion
 *
 * Backend errors implement `IntoResponse` so handlers can return them
 * directly. The body is a JSON object of the form
 * `{"error": "<message>", "status": <code>}`.
 */

use crate::backend::error::types::BackendError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("[Server] {} ({})", message, status);
        } else {
            tracing::debug!("[Server] {} ({})", message, status);
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
