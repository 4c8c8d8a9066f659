//! Brand resolver errors

use fos_watch::WatchError;

pub type BrandResult<T> = Result<T, BrandError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrandError {
    /// The host application element is missing or never got a shadow root
    #[error("No <{0}> element to attach to")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Watch(#[from] WatchError),
}
