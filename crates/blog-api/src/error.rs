use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use blog_db::DbError;

pub type Result<T> = std::result::Result<T, BlogError>;

/// Everything an application operation can fail with.
///
/// The first five variants are user mistakes and are shown back to the user
/// as a flash message. The rest are server faults: they are logged and
/// answered with a bare 500.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("That {field} is already registered.")]
    ConstraintViolation { field: String },

    #[error("Login failed. Check your email and password.")]
    AuthenticationFailed,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("You can only edit your own articles.")]
    Forbidden,

    #[error("storage failure: {0}")]
    Store(DbError),

    #[error("password hashing failed: {0}")]
    Credential(String),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BlogError {
    /// Whether the boundary should answer with a message instead of a failure page.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BlogError::ConstraintViolation { .. }
                | BlogError::AuthenticationFailed
                | BlogError::ValidationFailed(_)
                | BlogError::NotFound(_)
                | BlogError::Forbidden
        )
    }
}

impl From<DbError> for BlogError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConstraintViolation { column } => BlogError::ConstraintViolation { field: column },
            other => BlogError::Store(other),
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let status = match &self {
            BlogError::ConstraintViolation { .. } => StatusCode::CONFLICT,
            BlogError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            BlogError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BlogError::NotFound(_) => StatusCode::NOT_FOUND,
            BlogError::Forbidden => StatusCode::FORBIDDEN,
            BlogError::Store(_) | BlogError::Credential(_) | BlogError::Task(_) => {
                error!("Request failed: {}", self);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}
