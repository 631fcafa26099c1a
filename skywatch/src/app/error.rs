//! Startup errors.

use thiserror::Error;

use crate::feed::FeedError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Errors raised while assembling the application.
///
/// Runtime trouble (failed polls, store outages) is handled by the components
/// themselves and never surfaces here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
