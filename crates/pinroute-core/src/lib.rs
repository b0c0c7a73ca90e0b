//! # pinroute-core
//!
//! Core business logic for the pinroute mail-routing service.
//!
//! This crate provides:
//! - Mail record lifecycle (`PENDING → PROCESSING → {COMPLETED, FAILED}`)
//! - The asynchronous processing pipeline (extraction, then resolution)
//! - Cache-aside pincode resolution against the postal directory
//! - Local storage (`SQLite`) for mail records and the pincode cache
//! - Boundary traits for object storage, extraction, and directory lookup
//!
//! The HTTP surface, authentication, and real presigned-URL issuance live
//! outside this crate; they drive it through [`MailService`] and implement
//! the [`ObjectStorage`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
pub mod mail;
pub mod pincode;
pub mod service;
pub mod storage;

pub use config::CoreConfig;
pub use error::{Error, Result};
pub use mail::{MailId, MailRecord, MailRepository, OwnerId, ProcessingStatus};
pub use pincode::{DirectoryLookup, PincodeCacheEntry, PincodeCacheRepository, PincodeResolver};
pub use service::{ImageExtractor, MailService, RetryPolicy};
pub use storage::{ObjectStorage, UploadReference};
