use crate::application::{ApplicationError, ErrorKind};
use crate::domain::ValidationError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーと、リクエストの解析エラーをHTTPレスポンスにマッピングする。
#[derive(Debug)]
pub enum ApiError {
    Application(ApplicationError),
    /// JSONボディやクエリ文字列、パスパラメータが解析できない
    BadRequest(String),
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError::Application(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Application(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// エラーコード（レスポンスの`error`フィールド）
fn error_code(err: &ApplicationError) -> &'static str {
    match err {
        ApplicationError::BookNotFound(_) => "BOOK_NOT_FOUND",
        ApplicationError::StudentNotFound(_) => "STUDENT_NOT_FOUND",
        ApplicationError::RecordNotFound(_) => "RECORD_NOT_FOUND",
        ApplicationError::BookAlreadyBorrowed(_) => "BOOK_ALREADY_BORROWED",
        ApplicationError::AlreadyReturned(_) => "ALREADY_RETURNED",
        ApplicationError::BookCurrentlyBorrowed(_) => "BOOK_CURRENTLY_BORROWED",
        ApplicationError::BookNotDeleted(_) => "BOOK_NOT_DELETED",
        ApplicationError::StudentIdTaken(_) => "STUDENT_ID_TAKEN",
        ApplicationError::EmailTaken(_) => "EMAIL_TAKEN",
        ApplicationError::Validation(_) => "VALIDATION_ERROR",
        ApplicationError::StoreError(_) => "STORE_ERROR",
        ApplicationError::CatalogError(_) => "CATALOG_ERROR",
        ApplicationError::DirectoryError(_) => "DIRECTORY_ERROR",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::Application(err) => {
                let status = match err.kind() {
                    // 404 Not Found - リクエストされたリソースが存在しない
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    // 409 Conflict - 台帳の不変条件違反
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    // 400 Bad Request - 入力値の欠落・形式不正
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    // 500 Internal Server Error - システム障害
                    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };

                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                let message = if err.kind() == ErrorKind::Internal {
                    tracing::error!(error = ?err, "{}", err);
                    "An unexpected error occurred".to_string()
                } else {
                    err.to_string()
                };

                (status, error_code(&err), message)
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
