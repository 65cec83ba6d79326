use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub const UNAUTHORIZED_MESSAGE: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    AuthFailure,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid token: {0}")]
    TokenInvalid(String),
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthFailure | AuthError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Bodies never carry the internal detail string.
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AuthError::AuthFailure | AuthError::TokenInvalid(_) => UNAUTHORIZED_MESSAGE,
            AuthError::Validation(_) => "Invalid request",
            AuthError::Configuration(_) => "Internal server error",
        };
        HttpResponse::build(self.status_code()).json(MessageResponse { message })
    }
}
