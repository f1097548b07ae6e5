//! HTML fragment handling for the sitefeed pipeline.
//!
//! - [`dom`]: parse/serialize fragments and mutate them in place
//! - [`sanitizer`]: the blocklist sanitizer applied to every rendered snippet
pub mod dom;
pub mod sanitizer;

pub use dom::Fragment;
pub use html5ever::Attribute;
pub use sanitizer::{sanitize, try_sanitize};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("fragment parser produced no root element")]
    MissingRoot,
    #[error("failed to serialize fragment: {0}")]
    Serialize(#[from] std::io::Error),
    #[error("serialized fragment is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("output still changed after {passes} sanitize passes")]
    Unstable { passes: usize },
}
