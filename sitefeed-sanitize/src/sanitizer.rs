//! Blocklist sanitization for untrusted HTML fragments.
//!
//! The sanitizer parses the input into a DOM, then removes:
//!
//! - every `<script>` element together with its subtree
//! - every attribute whose name starts with `on` (any case)
//! - `href`/`src` attributes whose trimmed, lowercased value starts with
//!   `javascript:`; the parser has already decoded entities at that point, so
//!   `javascript&#58;` is caught as well
//!
//! Raw-text elements (`<style>`, `<xmp>`, `<iframe>` and friends) below an
//! `<svg>` or `<math>` element are dropped as well: their serialized text can
//! turn back into live markup when the output is parsed again in a different
//! namespace. The passes repeat until the output parses back to itself, so
//! sanitizing a sanitized fragment is a no-op.
//!
//! Everything else is kept verbatim. This is defense in depth for content from a
//! known upstream, not a general-purpose allowlist sanitizer: `javascript:` in
//! attributes other than `href`/`src` (for example `<form action>`) passes
//! through untouched.

use crate::dom::{attr_name, Fragment};
use crate::SanitizeError;
use html5ever::Attribute;

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Elements whose text the serializer writes unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Passes allowed before the output must be stable.
const MAX_PASSES: usize = 4;

/// Sanitize `html`, failing closed.
///
/// A parse or serialization failure yields an empty string, never the
/// unsanitized input.
///
/// ```
/// use sitefeed_sanitize::sanitize;
///
/// let out = sanitize(r#"<p onclick="steal()">Hi<script>alert(1)</script></p>"#);
/// assert_eq!(out, "<p>Hi</p>");
/// assert_eq!(sanitize(""), "");
/// ```
pub fn sanitize(html: &str) -> String {
    match try_sanitize(html) {
        Ok(clean) => clean,
        Err(err) => {
            tracing::warn!(error = %err, input_len = html.len(), "sanitize.failed_closed");
            String::new()
        }
    }
}

/// Sanitize `html`, surfacing parser/serializer failures to the caller.
pub fn try_sanitize(html: &str) -> Result<String, SanitizeError> {
    if html.is_empty() {
        return Ok(String::new());
    }

    let mut current = sanitize_pass(html)?;
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&current)?;
        if next == current {
            return Ok(current);
        }
        tracing::debug!(before = current.len(), after = next.len(), "sanitize.reparse_changed");
        current = next;
    }
    Err(SanitizeError::Unstable { passes: MAX_PASSES })
}

fn sanitize_pass(html: &str) -> Result<String, SanitizeError> {
    let mut fragment = Fragment::parse(html)?;
    fragment.remove_elements(|tag, _| tag == "script");
    fragment.remove_elements_in_foreign_content(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
    fragment.for_each_element(|_, attrs| attrs.retain(|a| !is_dangerous_attribute(a)));
    fragment.to_html()
}

pub fn is_event_handler(name: &str) -> bool {
    name.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

pub fn is_javascript_url(value: &str) -> bool {
    value.trim().to_lowercase().starts_with("javascript:")
}

fn is_dangerous_attribute(attr: &Attribute) -> bool {
    let name = attr_name(attr);
    if is_event_handler(name) {
        return true;
    }
    URL_ATTRIBUTES.iter().any(|u| name.eq_ignore_ascii_case(u)) && is_javascript_url(&attr.value)
}
