use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

/// The error kinds surfaced across components, per the core's error taxonomy.
///
/// `CacheUnavailable` and `BusUnavailable` are internal-only: every call site
/// that can observe them degrades instead of propagating them to a client
/// (see `search::cache` and `generator`). If one of these reaches the HTTP
/// boundary it is mapped to `Internal`.
#[derive(Error, Debug, Serialize)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate flight: {0}")]
    DuplicateFlight(String),

    #[error("Journey not found: {0}")]
    JourneyNotFound(String),

    #[error("Insufficient seats: {0}")]
    InsufficientSeats(String),

    #[error("Seat conflict: {0}")]
    SeatConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Bus unavailable: {0}")]
    BusUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheUnavailable(err.to_string())
    }
}

#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = match self {
            AppError::InvalidInput(_) => Status::BadRequest,
            AppError::DuplicateFlight(_) => Status::Conflict,
            AppError::JourneyNotFound(_) => Status::NotFound,
            AppError::InsufficientSeats(_) => Status::UnprocessableEntity,
            AppError::SeatConflict(_) => Status::Conflict,
            AppError::NotFound(_) => Status::NotFound,
            AppError::StoreUnavailable(_) => Status::ServiceUnavailable,
            // These two never legitimately reach a responder; treat as internal.
            AppError::CacheUnavailable(_) => Status::InternalServerError,
            AppError::BusUnavailable(_) => Status::InternalServerError,
            AppError::Internal(_) => Status::InternalServerError,
        };

        let json = json!({ "error": self.to_string() });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(json.to_string()))
            .ok()
    }
}
