//! Time-boxed sheet cache and the read-through client built on it.

mod client;
mod store;

pub use client::{ClientStats, SheetClient};
pub use store::{CacheKey, CacheStats, SheetCache};
