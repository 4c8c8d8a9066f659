//! Watch errors

use std::time::Duration;

use fos_css::SelectorError;
use fos_dom::{DomError, NodeId};

/// Result type for watch operations
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors raised by waits, subscriptions and handlers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The wait's deadline passed first
    #[error("Wait timed out after {0:?}")]
    Timeout(Duration),

    /// The wait's cancellation token fired
    #[error("Wait cancelled")]
    Cancelled,

    /// Shadow roots only exist on elements
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Invalid handler key '{0}'")]
    InvalidHandlerKey(String),
}
