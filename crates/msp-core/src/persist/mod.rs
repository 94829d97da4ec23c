//! Persisted dataset format, codec and storage backends
//!
//! This module provides the on-disk envelope for both dataset shapes and the
//! `DataStore` abstraction the `DataManager` reads and writes through.

mod backend;
mod codec;
mod format;

pub use backend::*;
pub use codec::*;
pub use format::*;
