//! HTTP response types and utilities
//!
//! Every response, success or error, carries `Access-Control-Allow-Origin: *`,
//! an explicit `Content-Length` and a public `Cache-Control` max-age.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::error;

use crate::errors::AppError;

const CONTENT_TYPE_PNG: &str = "image/png";
const CONTENT_TYPE_TEXT: &str = "text/plain";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Wire format for image endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Base64,
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "base64" => Ok(Self::Base64),
            other => Err(AppError::validation(
                "format",
                format!("unsupported format '{other}', expected 'png' or 'base64'"),
            )),
        }
    }
}

/// Error body returned for rejected requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Health check body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub blacklisted_urls: usize,
}

impl HealthResponse {
    pub fn healthy(blacklisted_urls: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            blacklisted_urls,
        }
    }
}

fn cache_control(max_age: Duration) -> String {
    format!("public, max-age={}", max_age.as_secs())
}

/// Build a response with the common header set
pub fn raw_response(
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
    max_age: Duration,
) -> Response {
    let length = body.len();
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(&cache_control(max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

/// PNG bytes rendered in the requested wire format
pub fn image_response(png: Bytes, format: OutputFormat, max_age: Duration) -> Response {
    match format {
        OutputFormat::Png => raw_response(StatusCode::OK, CONTENT_TYPE_PNG, png, max_age),
        OutputFormat::Base64 => raw_response(
            StatusCode::OK,
            CONTENT_TYPE_TEXT,
            Bytes::from(BASE64.encode(&png)),
            max_age,
        ),
    }
}

/// Pre-serialized JSON body
pub fn json_response(json: Bytes, max_age: Duration) -> Response {
    raw_response(StatusCode::OK, CONTENT_TYPE_JSON, json, max_age)
}

/// Serialize a value as a JSON response
pub fn json_value_response<T: Serialize>(status: StatusCode, value: &T, max_age: Duration) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => raw_response(status, CONTENT_TYPE_JSON, Bytes::from(body), max_age),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            raw_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                CONTENT_TYPE_JSON,
                Bytes::from_static(br#"{"success":false,"error":"serialization failed"}"#),
                Duration::ZERO,
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(message.clone()).with_detail("field", field.clone()),
            ),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };
        json_value_response(status, &body, Duration::ZERO)
    }
}
