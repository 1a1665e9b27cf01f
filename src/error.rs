use std::sync::PoisonError;

use thiserror::Error;

use crate::TrackedWindow;

#[derive(Debug, Error)]
pub enum TopMenuError {
    #[error("{0}")]
    Error(String),

    #[error("StdSyncPoisonError {0}")]
    StdSyncPoisonError(String),

    #[error("Unsupported")]
    Unsupported,

    #[error("No display available")]
    NoDisplay,

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Window {0} is gone")]
    WindowGone(TrackedWindow),
}

impl TopMenuError {
    pub fn new<S: ToString>(err: S) -> Self {
        TopMenuError::Error(err.to_string())
    }
}

pub type TopMenuResult<T> = Result<T, TopMenuError>;

impl<T> From<PoisonError<T>> for TopMenuError {
    fn from(value: PoisonError<T>) -> Self {
        TopMenuError::StdSyncPoisonError(value.to_string())
    }
}
