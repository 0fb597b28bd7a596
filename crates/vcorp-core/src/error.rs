// Platform error taxonomy.
//
// Every failure a route handler can report maps to one ErrorCode, and every
// ErrorCode maps to one HTTP status. Lookup and validation errors surface
// immediately at the boundary; collaborator failures (email, payments) are
// downgraded to warnings when local state has already committed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All error codes the platform can return to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UserNotFound,
    ProgramNotFound,
    AccountNotFound,
    InvalidCredential,
    CredentialExpired,
    UserAlreadyExists,
    AlreadyOnboarded,
    MissingPaymentMethod,
    EmailNotVerified,
    AccountInactive,
    Unauthorized,
    InvalidWebhookSignature,
    InvalidRedirectUrl,
    InvalidProgram,
    InvalidPinFormat,
    MissingRequiredField,
    CouldNotParseBody,
    EmailSendFailed,
    PaymentFailed,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::UserNotFound => "User not found",
            Self::ProgramNotFound => "Program not found",
            Self::AccountNotFound => "Program account not found",
            Self::InvalidCredential => "Invalid token or PIN",
            Self::CredentialExpired => "Credential has expired",
            Self::UserAlreadyExists => "User with this email already exists",
            Self::AlreadyOnboarded => "Program account already exists",
            Self::MissingPaymentMethod => "No payment method on file",
            Self::EmailNotVerified => "Email not verified",
            Self::AccountInactive => "Account is not active",
            Self::Unauthorized => "Unauthorized",
            Self::InvalidWebhookSignature => "Webhook signature verification failed",
            Self::InvalidRedirectUrl => "Invalid or unauthorized redirect URL",
            Self::InvalidProgram => "Unknown program identifier",
            Self::InvalidPinFormat => "Invalid PIN format. Must be 6 digits",
            Self::MissingRequiredField => "Missing required field",
            Self::CouldNotParseBody => "Could not parse request body",
            Self::EmailSendFailed => "Failed to send email",
            Self::PaymentFailed => "Payment attempt failed",
            Self::InternalServerError => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// HTTP status codes used by the API error system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpStatus {
    Ok = 200,
    Found = 302,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    Conflict = 409,
    Gone = 410,
    UnprocessableEntity = 422,
    InternalServerError = 500,
    BadGateway = 502,
}

impl HttpStatus {
    pub fn status_code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

/// API error carrying an HTTP status, an error code, and a message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status} {code:?}: {message}")]
pub struct ApiError {
    pub status: HttpStatus,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: HttpStatus, code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            status,
            code,
        }
    }

    pub fn with_message(status: HttpStatus, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(HttpStatus::BadRequest, code)
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Unauthorized, code)
    }

    pub fn forbidden(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Forbidden, code)
    }

    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(HttpStatus::NotFound, code)
    }

    pub fn conflict(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Conflict, code)
    }

    pub fn gone(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Gone, code)
    }

    pub fn upstream(code: ErrorCode) -> Self {
        Self::new(HttpStatus::BadGateway, code)
    }

    pub fn internal(code: ErrorCode) -> Self {
        Self::new(HttpStatus::InternalServerError, code)
    }

    /// Build a JSON body for the error response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "message": self.message,
        })
    }
}

/// Internal (non-HTTP) platform error.
#[derive(Debug, thiserror::Error)]
pub enum VcorpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Unified result type for platform operations.
pub type Result<T> = std::result::Result<T, VcorpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::InvalidRedirectUrl).unwrap();
        assert_eq!(json, "\"INVALID_REDIRECT_URL\"");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(HttpStatus::Ok.status_code(), 200);
        assert_eq!(HttpStatus::Conflict.status_code(), 409);
        assert_eq!(HttpStatus::Gone.status_code(), 410);
        assert_eq!(HttpStatus::BadGateway.status_code(), 502);
    }

    #[test]
    fn test_api_error_to_json() {
        let err = ApiError::conflict(ErrorCode::UserAlreadyExists);
        let body = err.to_json();
        assert_eq!(body["code"], "USER_ALREADY_EXISTS");
        assert_eq!(body["message"], "User with this email already exists");
    }

    #[test]
    fn test_api_error_custom_message() {
        let err = ApiError::with_message(
            HttpStatus::BadRequest,
            ErrorCode::MissingRequiredField,
            "Email is required",
        );
        assert_eq!(err.message, "Email is required");
        assert_eq!(err.status, HttpStatus::BadRequest);
    }

    #[test]
    fn test_vcorp_error_from_api_error() {
        let err: VcorpError = ApiError::not_found(ErrorCode::UserNotFound).into();
        assert!(matches!(err, VcorpError::Api(_)));
    }
}
