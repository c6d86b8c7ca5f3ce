use axum::response::{IntoResponse, Response};
use log::error;
use thiserror::Error;

use crate::db::StoreError;
use crate::handlers::views::render_error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("{0}")]
    Validation(String),

    #[error("'{existing_name}' has already voted from this computer. Everyone can vote only once.")]
    DuplicateVote { existing_name: String },

    #[error("Invalid credentials.")]
    Auth,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Unhandled poll error: {0}")]
    Unhandled(PollError),
}

impl From<PollError> for AppError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Store(e) => AppError::Store(e),
            other => AppError::Unhandled(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        render_error("The poll data could not be read or written.")
    }
}
