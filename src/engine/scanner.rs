// ── Engine: Page Scanner ───────────────────────────────────────────────────
// Reads the current document off the page surface and produces:
//   digest          — the formatted text block handed to the prompt builder
//   scan_site       — site-map update from the current page's outbound links
//   extract_page_content — structured content for the site map store
//
// The digest is opaque text to the rest of the pipeline. Absent elements
// simply omit their line; there is no error path. Scanning never crawls
// beyond the current page — only hrefs found in its DOM are collected.

use log::info;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::atoms::constants::{
    CONTENT_MAX_PARAGRAPHS, CONTENT_MIN_PARAGRAPH_CHARS, DIGEST_FLAGGED_TEXT_CHARS,
    DIGEST_MAX_FLAGGED, DIGEST_MAX_HEADINGS, DIGEST_MAX_SECTIONS,
};
use crate::atoms::types::{Brain, LinkRecord, PageContent};
use crate::engine::surface::PageSurface;

// Containers whose anchors count as navigation.
const NAV_LINK_SELECTOR: &str = "nav a, .nav a, .menu a, .navigation a, header a";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
const SECTION_SELECTOR: &str = "section, .section, main, .main, article, .article";

// Bilingual id/class tokens that flag an element as important for the digest.
const FLAGGED_KEYWORDS: [&str; 6] = ["akcio", "action", "contact", "kapcsolat", "about", "rolunk"];

/// Must-parse selectors are compile-time literals; a parse failure is a
/// programming error, so `expect` is acceptable here.
fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

/// Collapse an element's text nodes into one space-joined string.
/// Shared with the command processor's `:contains()` resolution.
pub(crate) fn element_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for node in element.text() {
        let trimmed = node.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }
    text
}

/// `(tag#id.class1.class2)` suffix used to make digest entries addressable
/// by the model's SCROLL/HIGHLIGHT selectors.
fn element_label(element: &ElementRef) -> String {
    let mut label = element.value().name().to_lowercase();
    if let Some(id) = element.value().id() {
        label.push('#');
        label.push_str(id);
    }
    for class in element.value().classes() {
        label.push('.');
        label.push_str(class);
    }
    label
}

// ── Digest ─────────────────────────────────────────────────────────────────

/// Produce the text digest of the current page for the prompt builder.
/// Field labels stay in the assistant's own language; the builder treats
/// the whole block as opaque text.
pub fn digest(surface: &dyn PageSurface, brain: &Brain) -> String {
    let html = Html::parse_document(&surface.document_html());
    let mut info = String::new();

    let title = html
        .select(&sel("title"))
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();
    info.push_str(&format!("Oldal címe: {}\n", title));
    info.push_str(&format!("URL: {}\n", surface.location().href));

    let nav_labels: Vec<String> = html
        .select(&sel(NAV_LINK_SELECTOR))
        .map(|a| element_text(&a))
        .filter(|t| !t.is_empty())
        .collect();
    if !nav_labels.is_empty() {
        info.push_str(&format!("Navigációs linkek: {}\n", nav_labels.join(", ")));
    }

    let headings: Vec<String> = html
        .select(&sel(HEADING_SELECTOR))
        .filter_map(|h| {
            let text = element_text(&h);
            if text.is_empty() {
                None
            } else {
                Some(format!("{} ({})", text, element_label(&h)))
            }
        })
        .take(DIGEST_MAX_HEADINGS)
        .collect();
    if !headings.is_empty() {
        info.push_str(&format!("Főcímek: {}\n", headings.join(", ")));
    }

    let heading_sel = sel(HEADING_SELECTOR);
    let sections: Vec<String> = html
        .select(&sel(SECTION_SELECTOR))
        .filter_map(|s| {
            // Only sections that actually carry a heading are worth naming.
            let heading = s.select(&heading_sel).next()?;
            let title = element_text(&heading);
            if title.is_empty() {
                None
            } else {
                Some(format!("{} ({})", title, element_label(&s)))
            }
        })
        .take(DIGEST_MAX_SECTIONS)
        .collect();
    if !sections.is_empty() {
        info.push_str(&format!("Szekciók: {}\n", sections.join(", ")));
    }

    let flagged = flagged_elements(&html);
    if !flagged.is_empty() {
        info.push_str(&format!("Fontos elemek: {}\n", flagged.join(", ")));
    }

    if let Some(meta) = html
        .select(&sel(r#"meta[name="description"]"#))
        .next()
        .and_then(|el| el.value().attr("content"))
    {
        info.push_str(&format!("Leírás: {}\n", meta));
    }

    if !brain.site_map.pages.is_empty() {
        info.push_str(&format!("Elérhető oldalak: {}\n", brain.site_map.pages.join(", ")));
    }

    info
}

/// Elements whose id or class contains one of the bilingual keywords.
fn flagged_elements(html: &Html) -> Vec<String> {
    let selector = FLAGGED_KEYWORDS
        .iter()
        .flat_map(|kw| [format!("[id*=\"{}\"]", kw), format!("[class*=\"{}\"]", kw)])
        .collect::<Vec<_>>()
        .join(", ");
    html.select(&sel(&selector))
        .map(|el| {
            let text: String = element_text(&el).chars().take(DIGEST_FLAGGED_TEXT_CHARS).collect();
            format!("{} ({})", text, element_label(&el))
        })
        .take(DIGEST_MAX_FLAGGED)
        .collect()
}

// ── Site scan ──────────────────────────────────────────────────────────────

/// Collect the current page's outbound relative links into the site map and
/// store the page's extracted content under its path. Merges with what
/// earlier page loads discovered; never fetches another page's DOM.
///
/// Returns the total number of known pages after the scan.
pub fn scan_site(surface: &dyn PageSurface, brain: &mut Brain) -> usize {
    let html = Html::parse_document(&surface.document_html());
    let path = surface.location().path;

    let mut pages = std::mem::take(&mut brain.site_map.pages);
    push_unique(&mut pages, &path);
    for anchor in html.select(&sel("a[href]")) {
        if let Some(href) = anchor.value().attr("href") {
            if is_site_relative(href) {
                push_unique(&mut pages, href);
            }
        }
    }

    brain.site_map.content.insert(path, extract_page_content(&html));
    brain.site_map.last_scan = Some(chrono::Utc::now().to_rfc3339());
    let count = pages.len();
    brain.site_map.pages = pages;

    info!("[scanner] site scan complete, {} pages known", count);
    count
}

/// A href belongs in the site map when it is relative to the current site:
/// anything that parses as an absolute URL (http(s), mailto:, tel:, …) is
/// skipped.
fn is_site_relative(href: &str) -> bool {
    !href.is_empty() && Url::parse(href).is_err()
}

fn push_unique(pages: &mut Vec<String>, path: &str) {
    if !pages.iter().any(|p| p == path) {
        pages.push(path.to_string());
    }
}

/// Structured extraction of the current page for the site map store.
pub fn extract_page_content(html: &Html) -> PageContent {
    let title = html
        .select(&sel("title"))
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();

    let headings = html
        .select(&sel(HEADING_SELECTOR))
        .map(|h| element_text(&h))
        .filter(|t| !t.is_empty())
        .collect();

    let paragraphs = html
        .select(&sel("p"))
        .map(|p| element_text(&p))
        .filter(|t| t.chars().count() > CONTENT_MIN_PARAGRAPH_CHARS)
        .take(CONTENT_MAX_PARAGRAPHS)
        .collect();

    let links = html
        .select(&sel("a[href]"))
        .filter_map(|a| {
            let text = element_text(&a);
            let href = a.value().attr("href").unwrap_or_default();
            if text.is_empty() || href.is_empty() {
                None
            } else {
                Some(LinkRecord { text, href: href.to_string() })
            }
        })
        .collect();

    PageContent { title, headings, paragraphs, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{ElementTarget, PageLocation};
    use crate::engine::surface::PageSurface;

    struct StaticPage {
        html: String,
        path: String,
    }

    impl PageSurface for StaticPage {
        fn document_html(&self) -> String {
            self.html.clone()
        }
        fn location(&self) -> PageLocation {
            PageLocation {
                href: format!("https://example.hu{}", self.path),
                path: self.path.clone(),
            }
        }
        fn scroll_into_view(&self, _target: &ElementTarget) {}
        fn read_inline_style(&self, _target: &ElementTarget, _property: &str) -> Option<String> {
            None
        }
        fn write_inline_style(&self, _t: &ElementTarget, _p: &str, _v: Option<&str>) {}
        fn goto(&self, _path: &str) {}
        fn open_external(&self, _url: &str) {}
    }

    const PAGE: &str = r#"
        <html><head>
            <title>Teszt Oldal</title>
            <meta name="description" content="Egy teszt weboldal.">
        </head><body>
            <nav><a href="/">Főoldal</a><a href="/kapcsolat">Kapcsolat</a></nav>
            <h1 id="fo">Üdvözlünk</h1>
            <section id="kapcsolat" class="contact"><h2>Kapcsolat</h2>
                <p>Írj nekünk bátran emailt bármikor, szívesen válaszolunk.</p>
                <p>rövid</p>
            </section>
            <a href="mailto:info@example.hu">Email</a>
            <a href="tel:+3611234567">Telefon</a>
            <a href="https://kulso.example.com/x">Külső</a>
            <a href="/arak">Árak</a>
        </body></html>"#;

    fn page() -> StaticPage {
        StaticPage { html: PAGE.into(), path: "/".into() }
    }

    #[test]
    fn test_digest_contains_expected_lines() {
        let d = digest(&page(), &Brain::default());
        assert!(d.contains("Oldal címe: Teszt Oldal"));
        assert!(d.contains("URL: https://example.hu/"));
        assert!(d.contains("Navigációs linkek: Főoldal, Kapcsolat"));
        assert!(d.contains("Főcímek: Üdvözlünk (h1#fo)"));
        assert!(d.contains("Szekciók: Kapcsolat (section#kapcsolat.contact)"));
        assert!(d.contains("Fontos elemek:"));
        assert!(d.contains("Leírás: Egy teszt weboldal."));
        // No pages scanned yet, so the cached-pages line is absent.
        assert!(!d.contains("Elérhető oldalak"));
    }

    #[test]
    fn test_digest_omits_absent_blocks() {
        let bare = StaticPage { html: "<html><body><p>hello</p></body></html>".into(), path: "/".into() };
        let d = digest(&bare, &Brain::default());
        assert!(!d.contains("Navigációs linkek"));
        assert!(!d.contains("Főcímek"));
        assert!(!d.contains("Leírás"));
    }

    #[test]
    fn test_scan_site_collects_relative_links_only() {
        let mut brain = Brain::default();
        let count = scan_site(&page(), &mut brain);
        assert_eq!(count, brain.site_map.pages.len());
        assert_eq!(brain.site_map.pages, vec!["/", "/kapcsolat", "/arak"]);
        assert!(brain.site_map.last_scan.is_some());
    }

    #[test]
    fn test_scan_site_merges_across_page_loads() {
        let mut brain = Brain::default();
        scan_site(&page(), &mut brain);

        let second = StaticPage {
            html: r#"<html><head><title>Árak</title></head>
                     <body><a href="/">Vissza</a><a href="/blog">Blog</a></body></html>"#
                .into(),
            path: "/arak".into(),
        };
        scan_site(&second, &mut brain);

        assert_eq!(brain.site_map.pages, vec!["/", "/kapcsolat", "/arak", "/blog"]);
        assert!(brain.site_map.content.contains_key("/"));
        assert!(brain.site_map.content.contains_key("/arak"));
    }

    #[test]
    fn test_extract_page_content_filters_noise() {
        let html = Html::parse_document(PAGE);
        let content = extract_page_content(&html);
        assert_eq!(content.title, "Teszt Oldal");
        assert_eq!(content.headings, vec!["Üdvözlünk", "Kapcsolat"]);
        // The 5-char paragraph is below the noise threshold.
        assert_eq!(content.paragraphs.len(), 1);
        assert!(content.links.iter().any(|l| l.href == "mailto:info@example.hu"));
    }
}
