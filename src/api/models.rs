use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::errors::TripError;

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTripRequest {
    pub name: String,
    pub destination: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: String,
}

// Error response struct
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for TripError to implement IntoResponse
pub struct ApiError(pub TripError);

impl From<TripError> for ApiError {
    fn from(err: TripError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TripError::MissingEmail | TripError::InvalidEmail(_) | TripError::InvalidInput(..) => {
                StatusCode::BAD_REQUEST
            }
            TripError::Settlement(err) if err.is_user_error() => StatusCode::BAD_REQUEST,
            TripError::Settlement(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TripError::EmailAlreadyRegistered(_) | TripError::AlreadyTripMember(_) | TripError::MemberHasExpenses(_) => {
                StatusCode::CONFLICT
            }
            TripError::InvalidCredentials | TripError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            TripError::UserNotFound(_) | TripError::TripNotFound(_) | TripError::ExpenseNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TripError::NotTripMember(_)
            | TripError::NotTripOwner(_)
            | TripError::OwnerCannotRemoveSelf
            | TripError::NotExpenseEditor(..) => StatusCode::FORBIDDEN,
            TripError::InternalServerError(_) | TripError::StorageError(_) | TripError::LoggingError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = match &self.0 {
            TripError::InvalidInput(_, field) => format!("{}: {}", field.title, field.description),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
