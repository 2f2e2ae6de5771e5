//! Request middleware and extractors.

pub mod context;
pub mod method_override;
pub mod ownership;

pub use context::{Page, RequestContext, ResponseMode};
pub use method_override::method_override;
pub use ownership::Denial;
