// ── Engine: Command Processor ──────────────────────────────────────────────
// The model embeds bracketed directives in its replies:
//
//   [SCROLL:h2:contains('Kapcsolat'), .contact]   [NAVIGATE:/arak]   [HIGHLIGHT:.akcio]
//
// Parsing and text-splicing are separated from execution so both halves are
// testable on their own. `parse_reply` runs one linear scan per command
// kind (all SCROLL matches, then NAVIGATE, then HIGHLIGHT — execution
// follows that kind order, not left-to-right document order) and emits the
// commands with their byte spans; a second pass removes the spans from the
// display text. `execute` then drives the page surface; a selector that
// resolves to nothing is logged and dropped, never surfaced to the user.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use log::{debug, warn};
use regex::Regex;
use scraper::{Html, Selector};

use crate::atoms::constants::{
    HIGHLIGHT_BACKGROUND, HIGHLIGHT_COMMAND_MS, HIGHLIGHT_DEFAULT_MS, HIGHLIGHT_OUTLINE,
    HIGHLIGHT_REVERT_SETTLE_MS, HIGHLIGHT_TRANSITION,
};
use crate::atoms::types::{Command, ElementTarget};
use crate::engine::scanner::element_text;
use crate::engine::surface::PageSurface;

static SCROLL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[SCROLL:([^\]]+)\]").unwrap());
static NAVIGATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[NAVIGATE:([^\]]+)\]").unwrap());
static HIGHLIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[HIGHLIGHT:([^\]]+)\]").unwrap());

/// The non-standard `tag:contains('text')` pseudo-selector.
static CONTAINS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^:]+):contains\(['\x22]?([^'\x22)]+)['\x22]?\)").unwrap());

// ── Parsing ────────────────────────────────────────────────────────────────

/// One model reply, split into executable commands and the text to show.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// Commands in execution order (kind scan order).
    pub commands: Vec<Command>,
    /// The reply with all command spans removed, trimmed at both ends.
    /// Interior spacing around removed spans is left untouched.
    pub display_text: String,
}

pub fn parse_reply(raw: &str) -> ParsedReply {
    let mut commands: Vec<Command> = Vec::new();
    let mut spans: Vec<Range<usize>> = Vec::new();

    for m in SCROLL_RE.captures_iter(raw) {
        commands.push(Command::Scroll { selectors: split_selectors(&m[1]) });
        spans.push(m.get(0).unwrap().range());
    }
    for m in NAVIGATE_RE.captures_iter(raw) {
        commands.push(Command::Navigate { url: m[1].trim().to_string() });
        spans.push(m.get(0).unwrap().range());
    }
    for m in HIGHLIGHT_RE.captures_iter(raw) {
        commands.push(Command::Highlight { selectors: split_selectors(&m[1]) });
        spans.push(m.get(0).unwrap().range());
    }

    ParsedReply { commands, display_text: remove_spans(raw, spans) }
}

fn split_selectors(payload: &str) -> Vec<String> {
    payload
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Rebuild the text with the given byte ranges cut out. Ranges may arrive
/// unordered; nested matches (a command bracketed inside another payload)
/// collapse into the outer cut.
fn remove_spans(raw: &str, mut spans: Vec<Range<usize>>) -> String {
    spans.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0;
    for span in spans {
        if span.start >= cursor {
            out.push_str(&raw[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    out.push_str(&raw[cursor..]);
    out.trim().to_string()
}

// ── Selector resolution ────────────────────────────────────────────────────

/// Resolve one candidate selector against the parsed document.
///
/// `tag:contains('text')` matches the first element of `tag` whose text
/// contains `text` case-insensitively; everything else goes through the CSS
/// engine and addresses the first match. An unparsable selector resolves to
/// nothing.
fn resolve_selector(html: &Html, selector: &str) -> Option<ElementTarget> {
    if let Some(caps) = CONTAINS_RE.captures(selector) {
        let tag = caps[1].trim().to_string();
        let needle = caps[2].to_lowercase();
        let tag_sel = Selector::parse(&tag).ok()?;
        let index = html
            .select(&tag_sel)
            .position(|el| element_text(&el).to_lowercase().contains(&needle))?;
        return Some(ElementTarget::new(tag, index));
    }

    match Selector::parse(selector) {
        Ok(sel) => html.select(&sel).next().map(|_| ElementTarget::new(selector, 0)),
        Err(_) => {
            warn!("[commands] unparsable selector '{}'", selector);
            None
        }
    }
}

/// First candidate that resolves wins; order is the model's preference.
fn resolve_first(html: &Html, selectors: &[String]) -> Option<ElementTarget> {
    selectors.iter().find_map(|s| resolve_selector(html, s))
}

// ── Execution ──────────────────────────────────────────────────────────────

/// Execute parsed commands against the page surface, in order.
pub async fn execute(surface: &Arc<dyn PageSurface>, commands: &[Command]) {
    for command in commands {
        match command {
            Command::Scroll { selectors } => {
                let html = Html::parse_document(&surface.document_html());
                match resolve_first(&html, selectors) {
                    Some(target) => {
                        debug!("[commands] scroll to {:?}", target);
                        surface.scroll_into_view(&target);
                        flash_highlight(surface, target, HIGHLIGHT_DEFAULT_MS);
                    }
                    None => debug!("[commands] no scroll target among {:?}", selectors),
                }
            }
            Command::Navigate { url } => navigate(surface, url),
            Command::Highlight { selectors } => {
                let html = Html::parse_document(&surface.document_html());
                match resolve_first(&html, selectors) {
                    Some(target) => flash_highlight(surface, target, HIGHLIGHT_COMMAND_MS),
                    None => debug!("[commands] no highlight target among {:?}", selectors),
                }
            }
        }
    }
}

fn navigate(surface: &Arc<dyn PageSurface>, url: &str) {
    debug!("[commands] navigate to {}", url);
    if let Some(anchor) = url.strip_prefix('#') {
        // In-page anchor: show it instead of leaving the page.
        let html = Html::parse_document(&surface.document_html());
        if let Some(target) = resolve_selector(&html, &format!("#{}", anchor)) {
            surface.scroll_into_view(&target);
            flash_highlight(surface, target, HIGHLIGHT_DEFAULT_MS);
        }
    } else if url.starts_with('/') || !url.contains("://") {
        surface.goto(url);
    } else {
        surface.open_external(url);
    }
}

/// Apply the temporary highlight style, then revert in two chained delayed
/// steps: the visual properties first, the transition property once the
/// revert animation has settled. The revert runs detached so a send turn
/// never waits on it.
fn flash_highlight(surface: &Arc<dyn PageSurface>, target: ElementTarget, duration_ms: u64) {
    let saved_outline = surface.read_inline_style(&target, "outline");
    let saved_background = surface.read_inline_style(&target, "background-color");
    let saved_transition = surface.read_inline_style(&target, "transition");

    surface.write_inline_style(&target, "transition", Some(HIGHLIGHT_TRANSITION));
    surface.write_inline_style(&target, "outline", Some(HIGHLIGHT_OUTLINE));
    surface.write_inline_style(&target, "background-color", Some(HIGHLIGHT_BACKGROUND));

    let surface = Arc::clone(surface);
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;
        surface.write_inline_style(&target, "transition", Some(HIGHLIGHT_TRANSITION));
        surface.write_inline_style(&target, "outline", saved_outline.as_deref());
        surface.write_inline_style(&target, "background-color", saved_background.as_deref());

        tokio::time::sleep(std::time::Duration::from_millis(HIGHLIGHT_REVERT_SETTLE_MS)).await;
        surface.write_inline_style(&target, "transition", saved_transition.as_deref());
    });
}
