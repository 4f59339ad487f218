use sea_orm::DbErr;
use thiserror::Error;

use crate::events::DecodeError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("db error: {0}")]
    Db(#[from] DbErr),
    #[error("hot store error: {0}")]
    HotStore(#[source] anyhow::Error),
    #[error("queue error: {0}")]
    Queue(#[source] anyhow::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("external api error: {0}")]
    ExternalApi(#[source] anyhow::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Deterministic errors yield the same failure on redelivery, so the
    /// poll loop acks the message instead of letting the queue retry it.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Validation(_))
    }
}
