//! Image handling for BuenaVista.
//!
//! - [`ImageKitClient`] uploads location images and rewrites display URLs.
//! - [`LinkImageExtractor`] finds a preview image for a pasted web page.

mod error;
mod imagekit;
mod link;

pub use error::*;
pub use imagekit::*;
pub use link::*;
