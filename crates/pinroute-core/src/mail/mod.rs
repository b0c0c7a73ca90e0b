//! Mail records and their lifecycle.
//!
//! A mail record represents one photographed physical-mail item moving
//! through the pipeline: registered as `Pending`, claimed as `Processing`
//! by exactly one run, and finished as `Completed` or `Failed`.

mod model;
mod repository;

pub use model::{MailId, MailRecord, OwnerId, ProcessingStatus};
pub use repository::MailRepository;
