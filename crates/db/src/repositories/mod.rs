use thiserror::Error;

use tireslingers_core::errors::ApplicationError;

pub mod memory;
pub mod recommendation;

pub use memory::InMemoryRecommendationStore;
pub use recommendation::SqlRecommendationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}
