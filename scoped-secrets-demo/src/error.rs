use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scoped_secrets_core::ContextError;
use serde::Serialize;
use thiserror::Error;

use crate::telemetry::{CORRELATION_ID_HEADER, correlation_header_value};

#[derive(Debug, Error)]
pub enum AppErrorKind {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct AppError {
    kind: AppErrorKind,
    correlation_id: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            correlation_id: None,
        }
    }

    pub fn with_correlation(mut self, id: String) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::new(AppErrorKind::Internal(message.into()))
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            AppErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            AppErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    correlation_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation = self.correlation_id.clone();
        let body = Json(ErrorBody {
            error: match &self.kind {
                AppErrorKind::NotFound(_) => "not_found",
                AppErrorKind::Internal(_) => "internal",
            },
            message: self.kind.to_string(),
            correlation_id: correlation.as_deref(),
        });

        let mut response = (status, body).into_response();
        if let Some(id) = correlation {
            response
                .headers_mut()
                .insert(CORRELATION_ID_HEADER, correlation_header_value(&id));
        }
        response
    }
}

impl From<ContextError> for AppError {
    fn from(value: ContextError) -> Self {
        let kind = match value {
            ContextError::MissingRequiredValue { name } => AppErrorKind::NotFound(name),
            err @ ContextError::NoActiveContext { .. } => AppErrorKind::Internal(err.to_string()),
        };
        AppError::new(kind)
    }
}
