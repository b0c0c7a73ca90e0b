//! Pincode cache and cache-aside resolution.
//!
//! Maps a 6-digit postal code to its sorting center, consulting the local
//! cache table first and falling back to the external postal directory on
//! a miss, populating the cache on the way back.

mod model;
mod repository;
mod resolver;

pub use model::PincodeCacheEntry;
pub use repository::PincodeCacheRepository;
pub use resolver::{DirectoryLookup, PincodeResolver};
