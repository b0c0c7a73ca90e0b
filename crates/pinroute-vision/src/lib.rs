//! # pinroute-vision
//!
//! Extraction adapter: turns a photographed mail item into structured
//! addressing fields by calling an OpenAI-compatible vision model.
//!
//! The crate owns two things:
//!
//! - the wire schema ([`RawExtraction`]) the model is asked to fill, and
//! - the normalization contract ([`Extraction`]) downstream code relies on:
//!   pincode fields are either exactly six ASCII digits or empty, free-text
//!   fields are stripped of null bytes and surrounding whitespace, and
//!   nothing is ever null.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pinroute_vision::{Extraction, VisionClient, VisionConfig};
//!
//! let client = VisionClient::new(VisionConfig {
//!     base_url: "https://api.openai.com/v1".into(),
//!     api_key: "sk-...".into(),
//!     model: "gpt-4o-mini".into(),
//!     ..VisionConfig::default()
//! })?;
//!
//! let raw = client.extract("https://storage.example/mail.jpg?sig=...").await?;
//! let fields = Extraction::from_raw(&raw);
//! println!("receiver pincode: {}", fields.receiver_pincode);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod schema;

pub use client::{VisionClient, VisionConfig};
pub use error::{Error, Result};
pub use schema::{Extraction, RawExtraction};
