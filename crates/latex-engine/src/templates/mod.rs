//! Template management and embedded templates

pub mod embedded;
pub mod registry;

pub use embedded::MINIMAL_DOCUMENT;
pub use registry::{is_minimal_request, TemplateRenderer, MINIMAL_FLAG};
