//! HTML sanitization for the document renderer.
//!
//! The renderer handles plain text and simple inline/block formatting. It
//! crashes on table layouts with fixed row heights and misbehaves with sizing
//! and color attributes, so message HTML is reduced before embedding:
//!
//! 1. Media, scripts, styles and other non-body elements are removed with
//!    their content.
//! 2. Table structure, document wrappers, tags with non-alphanumeric
//!    names (`o:p`, mangled markup) and tags whose name starts like a
//!    forbidden one (`tr-row`, `metadata`) are unwrapped; their content
//!    stays in place.
//! 3. Every attribute is cleared.

pub mod dom;

use self::dom::{Element, Fragment};

/// Removed together with everything inside them.
pub const REMOVED_ELEMENTS: &[&str] = &[
    "script", "style", "link", "meta", "img", "image", "video", "audio", "head", "title",
    "iframe", "object", "embed", "noscript", "noembed", "noframes", "xmp", "track", "source",
];

/// Replaced by their children.
pub const UNWRAPPED_ELEMENTS: &[&str] = &[
    "table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption", "colgroup", "col", "html",
    "body",
];

/// Tag-name prefixes that never appear as `<name` in the output.
pub const FORBIDDEN_PREFIXES: &[&str] = &[
    "script", "style", "img", "table", "tr", "td", "meta", "link", "video", "audio",
];

/// Reduce raw message HTML to a fragment safe to embed in the document.
///
/// Empty input yields an empty string. The result is trimmed, and
/// sanitizing it again returns it unchanged.
pub fn sanitize_html(raw_html: &str) -> String {
    if raw_html.trim().is_empty() {
        return String::new();
    }

    let mut fragment = Fragment::parse(raw_html);
    fragment.remove(&|el: &Element| REMOVED_ELEMENTS.contains(&el.name.as_str()));
    fragment.unwrap_preserving_children(&|el: &Element| {
        UNWRAPPED_ELEMENTS.contains(&el.name.as_str())
            || !is_plain_tag_name(&el.name)
            || FORBIDDEN_PREFIXES.iter().any(|p| el.name.starts_with(p))
    });
    fragment.clear_attributes();

    fragment.to_html().trim().to_string()
}

/// `[a-z][a-z0-9-]*`, which excludes namespaced and mangled names.
fn is_plain_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
