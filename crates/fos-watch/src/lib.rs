//! fOS Watch - Shadow-DOM-aware element watcher
//!
//! Resolves selector paths that cross shadow boundaries, subscribes to
//! subtree mutations on elements and shadow roots, and dispatches
//! added/removed/attribute events to handlers keyed by tag names.
//!
//! Everything runs on one thread: futures returned here are `!Send` and are
//! driven by an [`EventLoop`].

mod dispatch;
mod element;
mod error;
mod multiplexer;
mod path;
mod resolve;
mod runtime;
mod shadow;
mod wait;
mod watcher;

pub use dispatch::{
    AttributeHandler, ElementEvent, ElementHandler, HandlerKey, HandlerTable, TagPattern,
};
pub use element::wait_element;
pub use error::{WatchError, WatchResult};
pub use multiplexer::{
    AttributeCallback, ChangeCallbacks, Disconnect, ElementCallback, ObserveOptions, observe_changes,
};
pub use path::{SelectorPath, Step};
pub use resolve::{resolve_path, wait_selector};
pub use runtime::EventLoop;
pub use shadow::wait_shadow_root;
pub use wait::WaitOptions;
pub use watcher::Watcher;

pub use tokio_util::sync::CancellationToken;
