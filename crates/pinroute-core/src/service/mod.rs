//! High-level orchestration of the mail-processing pipeline.

mod mail;
mod retry;

pub use mail::{ImageExtractor, MailService};
pub use retry::{RetryPolicy, with_backoff};
