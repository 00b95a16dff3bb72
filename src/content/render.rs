//! Markdown fragment rendering with math passthrough.
//!
//! `$..$` and `$$..$$` spans are lifted out before markdown rendering and put
//! back as `math` spans carrying the escaped TeX, so a client-side typesetter
//! can pick them up. Raw HTML inside a fragment is escaped.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};
use sha2::{Digest, Sha256};

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

pub const DEFAULT_RENDER_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MathSpan {
    Inline(String),
    Display(String),
}

/// Replaces math spans with placeholders, skipping code spans and `\$`.
fn lift_math(markdown: &str) -> (String, Vec<MathSpan>) {
    let mut out = String::with_capacity(markdown.len());
    let mut spans = Vec::new();
    let mut rest = markdown;

    while let Some(pos) = rest.find(['$', '`', '\\']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('\\') {
            let escaped = tail.chars().nth(1).map_or(1, |c| 1 + c.len_utf8());
            out.push_str(&tail[..escaped]);
            rest = &tail[escaped..];
            continue;
        }

        if tail.starts_with('`') {
            let ticks = tail.len() - tail.trim_start_matches('`').len();
            let fence = &tail[..ticks];
            match tail[ticks..].find(fence) {
                Some(end) => {
                    let stop = ticks + end + ticks;
                    out.push_str(&tail[..stop]);
                    rest = &tail[stop..];
                }
                None => {
                    out.push_str(fence);
                    rest = &tail[ticks..];
                }
            }
            continue;
        }

        let (delimiter, display) = if tail.starts_with("$$") {
            ("$$", true)
        } else {
            ("$", false)
        };
        let body = &tail[delimiter.len()..];
        match find_unescaped(body, delimiter) {
            Some(end) if !body[..end].trim().is_empty() => {
                let tex = body[..end].trim().to_string();
                out.push(PLACEHOLDER_OPEN);
                out.push_str(&spans.len().to_string());
                out.push(PLACEHOLDER_CLOSE);
                spans.push(if display {
                    MathSpan::Display(tex)
                } else {
                    MathSpan::Inline(tex)
                });
                rest = &body[end + delimiter.len()..];
            }
            _ => {
                out.push_str(delimiter);
                rest = body;
            }
        }
    }

    out.push_str(rest);
    (out, spans)
}

fn find_unescaped(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = haystack[from..].find(needle) {
        let at = from + found;
        let backslashes = haystack[..at]
            .chars()
            .rev()
            .take_while(|c| *c == '\\')
            .count();
        if backslashes % 2 == 0 {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

impl MathSpan {
    fn tex(&self) -> &str {
        match self {
            Self::Inline(tex) | Self::Display(tex) => tex,
        }
    }

    fn source(&self) -> String {
        match self {
            Self::Inline(tex) => format!("${}$", tex),
            Self::Display(tex) => format!("$${}$$", tex),
        }
    }
}

fn math_html(span: &MathSpan) -> String {
    match span {
        MathSpan::Inline(tex) => format!(
            "<span class=\"math math-inline\">{}</span>",
            html_escape::encode_text(tex)
        ),
        MathSpan::Display(tex) => format!(
            "<span class=\"math math-display\">{}</span>",
            html_escape::encode_text(tex)
        ),
    }
}

enum Piece<'a> {
    Text(&'a str),
    Math(&'a MathSpan),
}

/// Splits text at placeholder tokens. A token naming no span stays text.
fn split_placeholders<'a>(text: &'a str, spans: &'a [MathSpan]) -> Vec<Piece<'a>> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];
        let found = after.find(PLACEHOLDER_CLOSE).and_then(|close| {
            after[..close]
                .parse::<usize>()
                .ok()
                .and_then(|index| spans.get(index))
                .map(|span| (span, close))
        });

        match found {
            Some((span, close)) => {
                if open > 0 {
                    pieces.push(Piece::Text(&rest[..open]));
                }
                pieces.push(Piece::Math(span));
                rest = &after[close + PLACEHOLDER_CLOSE.len_utf8()..];
            }
            None => {
                pieces.push(Piece::Text(&rest[..open + PLACEHOLDER_OPEN.len_utf8()]));
                rest = after;
            }
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    pieces
}

/// Puts math back as plain text, for places where markup can't go.
fn with_raw_math<'a>(text: CowStr<'a>, spans: &[MathSpan], raw: fn(&MathSpan) -> String) -> CowStr<'a> {
    if !text.contains(PLACEHOLDER_OPEN) {
        return text;
    }
    let restored: String = split_placeholders(&text, spans)
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(text) => text.to_string(),
            Piece::Math(span) => raw(span),
        })
        .collect();
    CowStr::from(restored)
}

fn tex_text(span: &MathSpan) -> String {
    span.tex().to_string()
}

/// A paragraph holding nothing but one display span becomes a math block.
fn display_block(events: &[Event<'_>], spans: &[MathSpan]) -> Option<String> {
    let [Event::Start(Tag::Paragraph), Event::Text(text), Event::End(TagEnd::Paragraph), ..] = events else {
        return None;
    };
    match split_placeholders(text, spans).as_slice() {
        [Piece::Math(MathSpan::Display(tex))] => Some(format!(
            "<div class=\"math math-display\">{}</div>\n",
            html_escape::encode_text(tex)
        )),
        _ => None,
    }
}

/// Swaps placeholders back for math. Text becomes math markup. Image alt
/// text and titles get the bare TeX, while URLs and code get the source as
/// written.
fn restore_math<'a>(events: impl Iterator<Item = Event<'a>>, spans: &[MathSpan]) -> Vec<Event<'a>> {
    let events: Vec<Event<'a>> = events.collect();
    if spans.is_empty() {
        return events;
    }

    let mut out = Vec::with_capacity(events.len());
    let mut image_depth = 0usize;
    let mut in_code_block = false;
    let mut index = 0;

    while index < events.len() {
        if let Some(block) = display_block(&events[index..], spans) {
            out.push(Event::Html(CowStr::from(block)));
            index += 3;
            continue;
        }

        let event = events[index].clone();
        index += 1;
        match event {
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                image_depth += 1;
                out.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: with_raw_math(dest_url, spans, MathSpan::source),
                    title: with_raw_math(title, spans, tex_text),
                    id,
                }));
            }
            Event::End(TagEnd::Image) => {
                image_depth = image_depth.saturating_sub(1);
                out.push(Event::End(TagEnd::Image));
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => out.push(Event::Start(Tag::Link {
                link_type,
                dest_url: with_raw_math(dest_url, spans, MathSpan::source),
                title: with_raw_math(title, spans, tex_text),
                id,
            })),
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                out.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push(Event::End(TagEnd::CodeBlock));
            }
            Event::Text(text) if in_code_block => {
                out.push(Event::Text(with_raw_math(text, spans, MathSpan::source)))
            }
            Event::Text(text) if image_depth > 0 => out.push(Event::Text(with_raw_math(text, spans, tex_text))),
            Event::Text(text) => {
                for piece in split_placeholders(&text, spans) {
                    out.push(match piece {
                        Piece::Text(text) => Event::Text(CowStr::from(text.to_string())),
                        Piece::Math(span) => Event::InlineHtml(CowStr::from(math_html(span))),
                    });
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn is_safe_url(url: &str) -> bool {
    let lowered = url.trim().to_ascii_lowercase();
    !(lowered.starts_with("javascript:")
        || lowered.starts_with("vbscript:")
        || lowered.starts_with("data:text/html"))
}

fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    }
}

/// Renders a markdown fragment to sanitized HTML. A fragment consisting of a
/// single paragraph comes back without the `<p>` wrapper.
pub fn render_markdown(markdown: &str) -> String {
    let source = markdown.trim();
    if source.is_empty() {
        return String::new();
    }

    let (lifted, spans) = lift_math(source);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(&lifted, options).map(sanitize);
    let events = restore_math(TextMergeStream::new(parser), &spans);

    let mut rendered = String::with_capacity(lifted.len() * 2);
    html::push_html(&mut rendered, events.into_iter());

    unwrap_single_paragraph(rendered.trim()).trim().to_string()
}

fn unwrap_single_paragraph(rendered: &str) -> String {
    match rendered
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => rendered.to_string(),
    }
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Bounded render memo keyed by (content hash, locale). Owned by whoever
/// builds a snapshot; dropped with it.
pub struct RenderCache {
    entries: Mutex<LruCache<(String, String), String>>,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn render(&self, markdown: &str, locale: &str) -> String {
        let key = (content_hash(markdown), locale.to_string());

        if let Some(hit) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.clone();
        }

        let rendered = render_markdown(markdown);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, rendered.clone());
        rendered
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_markdown_without_paragraph() {
        assert_eq!(render_markdown("What is **force**?"), "What is <strong>force</strong>?");
    }

    #[test]
    fn keeps_multi_paragraph_wrappers() {
        assert_eq!(render_markdown("one\n\ntwo"), "<p>one</p>\n<p>two</p>");
    }

    #[test]
    fn preserves_inline_math() {
        assert_eq!(
            render_markdown("Let $a_1 < b*c*$ hold"),
            "Let <span class=\"math math-inline\">a_1 &lt; b*c*</span> hold"
        );
    }

    #[test]
    fn display_math_becomes_block() {
        assert_eq!(
            render_markdown("Energy:\n\n$$E = mc^2$$"),
            "<p>Energy:</p>\n<div class=\"math math-display\">E = mc^2</div>"
        );
    }

    #[test]
    fn math_in_attributes_stays_plain_text() {
        assert_eq!(render_markdown("![$x$](a.png)"), "<img src=\"a.png\" alt=\"x\" />");
        assert_eq!(
            render_markdown("[t](u \"$a<b$\")"),
            "<a href=\"u\" title=\"a&lt;b\">t</a>"
        );
        assert_eq!(
            render_markdown("![grafico di $f$](f.png \"$f(x)$\") e $y$"),
            "<img src=\"f.png\" alt=\"grafico di f\" title=\"f(x)\" /> e <span class=\"math math-inline\">y</span>"
        );
    }

    #[test]
    fn math_inside_indented_code_is_left_alone() {
        assert_eq!(
            render_markdown("prima\n\n    let x = $a$;\n\ndopo $b$"),
            "<p>prima</p>\n<pre><code>let x = $a$;\n</code></pre>\n<p>dopo <span class=\"math math-inline\">b</span></p>"
        );
    }

    #[test]
    fn escaped_dollars_and_code_are_not_math() {
        assert_eq!(render_markdown(r"costs \$5 and \$6"), "costs $5 and $6");
        assert_eq!(render_markdown("`$x$`"), "<code>$x$</code>");
        assert_eq!(render_markdown("a lone $ sign"), "a lone $ sign");
    }

    #[test]
    fn escapes_raw_html() {
        let out = render_markdown("hi <script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn neutralizes_script_links() {
        let out = render_markdown("[x](javascript:alert(1))");
        assert_eq!(out, "<a href=\"#\">x</a>");
    }

    #[test]
    fn empty_fragment_renders_empty() {
        assert_eq!(render_markdown("  \n "), "");
    }

    #[test]
    fn cache_is_bounded_and_reuses_entries() {
        let cache = RenderCache::new(2);
        assert_eq!(cache.render("*a*", "it"), "<em>a</em>");
        assert_eq!(cache.render("*a*", "it"), "<em>a</em>");
        assert_eq!(cache.len(), 1);
        cache.render("*a*", "en");
        cache.render("*b*", "en");
        assert_eq!(cache.len(), 2);
    }
}
