//! API error types with HTTP response mapping.

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use booking::BookingError;
use common::DateError;
use inventory::InventoryError;
use saga::{HotelClientError, SagaError};

/// Largest error body the path middleware will rewrite.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request conflicts with current state.
    Conflict(String),
    /// A downstream service could not be reached.
    Unavailable(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unavailable(msg) => msg,
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                msg
            }
        };

        let body = serde_json::json!({ "error": message, "status": status.as_u16() });
        (status, axum::Json(body)).into_response()
    }
}

/// Adds the request path to JSON error bodies.
pub async fn with_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    if !response.status().is_client_error() && !response.status().is_server_error() {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_ERROR_BODY).await else {
        return (parts.status, "error body too large").into_response();
    };
    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(mut map)) if map.contains_key("error") => {
            map.insert("path".to_string(), serde_json::Value::String(path));
            serde_json::Value::Object(map).to_string().into_bytes()
        }
        _ => bytes.to_vec(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<DateError> for ApiError {
    fn from(err: DateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match &err {
            InventoryError::RoomNotFound(_) => ApiError::NotFound(err.to_string()),
            InventoryError::InvalidDates(_)
            | InventoryError::MissingRequestId
            | InventoryError::KeyTooLong { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            InventoryError::ConcurrentHold(_) => ApiError::Conflict(err.to_string()),
            InventoryError::Database(_) | InventoryError::Migration(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::NotFound(_) | BookingError::UserNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            BookingError::InvalidDates(_)
            | BookingError::MissingRequestId
            | BookingError::RequestIdTooLong { .. } => ApiError::BadRequest(err.to_string()),
            BookingError::InvalidTransition { .. } | BookingError::ConcurrentModification { .. } => {
                ApiError::Conflict(err.to_string())
            }
            BookingError::CorruptStatus(_)
            | BookingError::Database(_)
            | BookingError::Migration(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<HotelClientError> for ApiError {
    fn from(err: HotelClientError) -> Self {
        match &err {
            HotelClientError::Conflict(_) => ApiError::Conflict(err.to_string()),
            HotelClientError::RoomNotFound(_) => ApiError::NotFound(err.to_string()),
            HotelClientError::BadRequest(_) => ApiError::BadRequest(err.to_string()),
            HotelClientError::Timeout
            | HotelClientError::CircuitOpen
            | HotelClientError::Server(_)
            | HotelClientError::UnexpectedStatus(_)
            | HotelClientError::Transport(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match err {
            SagaError::RoomRequired => ApiError::BadRequest(err.to_string()),
            SagaError::NoRoomsAvailable
            | SagaError::RequestIdTaken(_)
            | SagaError::Compensated { .. } => {
                ApiError::Conflict(err.to_string())
            }
            SagaError::Booking(e) => e.into(),
            SagaError::Hotel(e) => e.into(),
        }
    }
}
