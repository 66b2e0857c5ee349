// ── Engine: Page Surface ───────────────────────────────────────────────────
// The rendering surface the assistant lives on, as an injected capability.
// The scanner reads the document through it and the command executor acts
// on it; core logic never touches a real DOM, so the whole pipeline runs
// headlessly against a fake implementation in tests.
//
// Element addressing: core resolves selectors against the serialized
// document and hands the surface an `ElementTarget { selector, index }` —
// "the index-th element matching selector". That keeps the non-standard
// `tag:contains('…')` resolution on this side of the boundary.

use crate::atoms::types::{ElementTarget, PageLocation};

pub trait PageSurface: Send + Sync {
    /// Serialized current DOM. Read-only input for the scanner and for
    /// selector resolution; may be re-read per operation.
    fn document_html(&self) -> String;

    /// Current location of the hosting page.
    fn location(&self) -> PageLocation;

    /// Smooth, centered scroll bringing the target into view.
    fn scroll_into_view(&self, target: &ElementTarget);

    /// Read one inline style property off the target. `None` when unset.
    fn read_inline_style(&self, target: &ElementTarget, property: &str) -> Option<String>;

    /// Write (`Some`) or clear (`None`) one inline style property.
    fn write_inline_style(&self, target: &ElementTarget, property: &str, value: Option<&str>);

    /// Full top-level navigation to a path on the current site.
    fn goto(&self, path: &str);

    /// Open a URL in a new browsing context with no opener link back.
    fn open_external(&self, url: &str);
}
