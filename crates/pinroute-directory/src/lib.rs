//! # pinroute-directory
//!
//! Client for the public India Post pincode directory
//! (`https://api.postalpincode.in`).
//!
//! A lookup answers with the post offices registered under a 6-digit pincode,
//! including the sorting district/division used for physical mail routing.
//! The API wraps every answer in a one-element JSON array:
//!
//! ```json
//! [{"Message": "...", "Status": "Success", "PostOffice": [{...}, ...]}]
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use pinroute_directory::DirectoryClient;
//!
//! let client = DirectoryClient::default();
//! let result = client.lookup("560001").await?;
//! if let Some(office) = result.first_office() {
//!     println!("division: {}", office.division);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::DirectoryClient;
pub use error::{Error, Result};
pub use response::{LookupResult, LookupStatus, PostOffice};
