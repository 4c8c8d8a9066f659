//! fOS Brand - brand icon replacement
//!
//! A handler set for the fOS element watcher that swaps integration logos
//! in the Home Assistant frontend for locally served images. Images are
//! picked by integration domain, which is derived from element properties,
//! entity ids or the original image URL.

mod bootstrap;
mod config;
mod context;
mod error;
mod handlers;
mod hass;
pub mod logging;

pub use bootstrap::BrandResolver;
pub use config::{BrandConfig, ReplacementImages};
pub use context::BrandContext;
pub use error::{BrandError, BrandResult};
pub use handlers::{BrandWatcher, handler_table};
pub use hass::{EntityState, StateRegistry};
