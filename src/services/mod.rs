//! Business rules on top of the repositories. Each successful mutation is
//! announced on the event bus.

pub mod products;
pub mod users;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::repository::RepoError;
use crate::validator::{self, FieldErrors};

pub use products::ProductService;
pub use users::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} is already taken")]
    Taken(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl ServiceError {
    fn from_repo(entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound(entity),
            RepoError::Duplicate { field } => Self::Taken(field),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => AppError::not_found(err.to_string()),
            ServiceError::Taken(_) => AppError::conflict(err.to_string()),
            ServiceError::InvalidCredentials => AppError::unauthorized(err.to_string()),
            ServiceError::WrongPassword => AppError::bad_request(err.to_string()),
            ServiceError::Validation(fields) => AppError::validation(fields),
            ServiceError::Hash(_) => {
                tracing::error!(error = %err, "password hashing failed");
                AppError::internal("Internal server error")
            }
        }
    }
}

/// Request body with a validation rule table.
pub trait Validated: DeserializeOwned {
    const RULES: &'static [(&'static str, &'static [&'static str])];
}

/// Run `T::RULES` over a raw JSON body, then decode it.
pub fn parse<T: Validated>(body: Value) -> Result<T, ServiceError> {
    validator::validate(&body, T::RULES).map_err(ServiceError::Validation)?;
    serde_json::from_value(body).map_err(|e| invalid("body", &e.to_string()))
}

/// One-field validation failure.
fn invalid(field: &str, message: &str) -> ServiceError {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_owned(), message.to_owned());
    ServiceError::Validation(fields)
}
