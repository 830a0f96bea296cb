//! HTML structure extraction.
//!
//! # Responsibilities
//! - Recover title, head and body from irregular HTML
//! - Capture extra properties (meta tags, html/body attributes,
//!   `<content tag>` blocks, `<!-- key: value -->` comments)
//! - Keep fragments as verbatim slices of the source
//!
//! # Design Decisions
//! - `tl` builds the node tree; fragments are sliced from the source by offset
//! - End tags are located in one linear regex pass, never by rescanning
//! - Only invalid UTF-8 or binary input is a parse failure
//! - Missing `<html>`, `<head>` or `<body>` tags are tolerated
//! - An unclosed head ends at the first element that cannot live in a head
//! - The first `<title>` before `<body>` is the page title and is cut out of
//!   the head (or out of a tagless body)

use std::collections::BTreeMap;
use std::sync::LazyLock;

use axum::body::Bytes;
use regex::Regex;

use crate::content::page::StructuredContent;
use crate::error::DecorationError;

static COMMENT_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([A-Za-z][A-Za-z0-9_.-]*)\s*:\s*(.*?)\s*$").expect("valid comment property regex")
});

static END_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(title|head|body|html|content)\s*>").expect("valid end tag regex"));

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<!doctype[^>]*>").expect("valid doctype regex"));

/// Elements allowed inside `<head>`.
const HEAD_ELEMENTS: &[&str] = &["title", "meta", "link", "style", "script", "base", "noscript", "template"];

/// Head elements whose children are never page content.
const OPAQUE_HEAD_ELEMENTS: &[&str] = &["title", "style", "script", "noscript", "template"];

/// Turns buffered response bytes into structured content.
pub trait ContentExtractor: Send + Sync {
    /// Never fails: on error the returned content is unparsed and carries the original bytes.
    fn extract(&self, raw: Bytes) -> StructuredContent;
}

/// Start of a tag and of its first child.
#[derive(Debug, Clone, Copy)]
struct TagSpan {
    start: usize,
    inner_start: Option<usize>,
}

impl TagSpan {
    /// End of the start tag.
    fn open_end(&self, text: &str) -> usize {
        self.inner_start.unwrap_or_else(|| {
            text.get(self.start..)
                .and_then(|rest| rest.find('>'))
                .map_or(text.len(), |gt| self.start + gt + 1)
        })
    }
}

/// Positions of interesting markup, in document order.
#[derive(Debug, Default)]
struct Landmarks {
    html: Option<TagSpan>,
    head: Option<TagSpan>,
    title: Option<TagSpan>,
    title_text: String,
    body: Option<TagSpan>,
    content_blocks: Vec<(String, TagSpan)>,
    /// First element or text, other than html/head wrappers.
    first_content: Option<usize>,
    /// First element or text after `<head>` that cannot be part of a head.
    head_breaker: Option<usize>,
}

impl Landmarks {
    fn content_at(&mut self, start: usize) {
        if self.first_content.is_none() {
            self.first_content = Some(start);
        }
        if self.head_breaker.is_none() && self.head.is_some_and(|head| start > head.start) {
            self.head_breaker = Some(start);
        }
    }
}

/// `(start, end)` of every end tag, per element name.
#[derive(Debug, Default)]
struct EndTags {
    title: Vec<(usize, usize)>,
    head: Vec<(usize, usize)>,
    body: Vec<(usize, usize)>,
    html: Vec<(usize, usize)>,
    content: Vec<(usize, usize)>,
}

impl EndTags {
    fn scan(text: &str) -> Self {
        let mut tags = Self::default();
        for caps in END_TAG.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let span = (whole.start(), whole.end());
            match name.as_str().to_ascii_lowercase().as_str() {
                "title" => tags.title.push(span),
                "head" => tags.head.push(span),
                "body" => tags.body.push(span),
                "html" => tags.html.push(span),
                _ => tags.content.push(span),
            }
        }
        tags
    }
}

fn first_from(tags: &[(usize, usize)], pos: usize) -> Option<(usize, usize)> {
    let i = tags.partition_point(|(start, _)| *start < pos);
    tags.get(i).copied()
}

fn last_from(tags: &[(usize, usize)], pos: usize) -> Option<(usize, usize)> {
    tags.last().copied().filter(|(start, _)| *start >= pos)
}

fn slice(text: &str, start: usize, end: usize) -> &str {
    text.get(start..end).unwrap_or_default()
}

/// Byte offset of a borrowed `tl` slice within the source.
fn offset_in(text: &str, bytes: &[u8]) -> Option<usize> {
    let base = text.as_ptr() as usize;
    let ptr = bytes.as_ptr() as usize;
    (ptr >= base && ptr + bytes.len() <= base + text.len()).then(|| ptr - base)
}

fn comment_start(text: &str, bytes: &[u8]) -> Option<usize> {
    let offset = offset_in(text, bytes)?;
    if text.get(offset..).is_some_and(|rest| rest.starts_with("<!--")) {
        Some(offset)
    } else if text.get(..offset).is_some_and(|before| before.ends_with("<!--")) {
        Some(offset - 4)
    } else {
        Some(offset)
    }
}

fn node_start(text: &str, handle: tl::NodeHandle, parser: &tl::Parser<'_>) -> Option<usize> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => Some(tag.boundaries(parser).0),
        tl::Node::Raw(bytes) => offset_in(text, bytes.as_bytes()),
        tl::Node::Comment(bytes) => comment_start(text, bytes.as_bytes()),
    }
}

/// Tolerant HTML extractor.
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract structure, reporting catastrophic input as an error.
    pub fn parse(&self, raw: Bytes) -> Result<StructuredContent, DecorationError> {
        let text = std::str::from_utf8(&raw)
            .map_err(|e| DecorationError::ParseFailure(format!("body is not valid UTF-8: {e}")))?;
        if text.contains('\0') {
            return Err(DecorationError::ParseFailure("body contains NUL bytes".to_string()));
        }

        let dom = tl::parse(text, tl::ParserOptions::default())
            .map_err(|e| DecorationError::ParseFailure(format!("{e:?}")))?;
        let mut properties = BTreeMap::new();
        let marks = walk(text, &dom, &mut properties);
        let end_tags = EndTags::scan(text);

        capture_content_blocks(text, &marks, &end_tags, &mut properties);

        let (title, title_range) = page_title(text, &marks, &end_tags);
        let (head, head_next) = head_fragment(text, &marks, &end_tags, title_range);
        let body = body_fragment(text, &marks, &end_tags, head_next, title_range);
        drop(dom);

        Ok(StructuredContent::new(title, head, body, properties, raw))
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, raw: Bytes) -> StructuredContent {
        match self.parse(raw.clone()) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(error = %e, "HTML extraction failed");
                StructuredContent::unparsed(raw)
            }
        }
    }
}

/// Depth-first walk in document order. Iterative, so deep nesting is safe.
fn walk(text: &str, dom: &tl::VDom<'_>, properties: &mut BTreeMap<String, String>) -> Landmarks {
    let parser = dom.parser();
    let mut marks = Landmarks::default();
    // (node, inside an element whose children are not page content)
    let mut stack: Vec<(tl::NodeHandle, bool)> = dom.children().iter().rev().map(|h| (*h, false)).collect();

    while let Some((handle, opaque)) = stack.pop() {
        let Some(node) = handle.get(parser) else {
            continue;
        };
        match node {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                let children: Vec<tl::NodeHandle> = tag.children().top().iter().copied().collect();
                let span = TagSpan {
                    start: tag.boundaries(parser).0,
                    inner_start: children.first().and_then(|c| node_start(text, *c, parser)),
                };

                match name.as_str() {
                    _ if name.starts_with('!') || name.starts_with('?') => {}
                    "html" => {
                        if marks.html.is_none() {
                            marks.html = Some(span);
                            capture_attributes("html", tag, properties);
                        }
                    }
                    "head" => {
                        if marks.head.is_none() && marks.body.is_none() {
                            marks.head = Some(span);
                        }
                    }
                    "body" => {
                        marks.content_at(span.start);
                        if marks.body.is_none() {
                            marks.body = Some(span);
                            capture_attributes("body", tag, properties);
                        }
                    }
                    other => {
                        if !opaque && !HEAD_ELEMENTS.contains(&other) {
                            marks.content_at(span.start);
                        } else if marks.first_content.is_none() && other != "title" {
                            marks.first_content = Some(span.start);
                        }
                        match other {
                            "title" if marks.title.is_none() && marks.body.is_none() => {
                                marks.title = Some(span);
                                marks.title_text = first_text(&children, parser);
                            }
                            "meta" => capture_meta(tag, properties),
                            "content" => {
                                let key = tag
                                    .attributes()
                                    .iter()
                                    .find(|(k, _)| k.eq_ignore_ascii_case("tag"))
                                    .and_then(|(_, v)| v.map(|v| v.to_string()));
                                if let Some(key) = key {
                                    marks.content_blocks.push((key, span));
                                }
                            }
                            _ => {}
                        }
                    }
                }

                let opaque = opaque || OPAQUE_HEAD_ELEMENTS.contains(&name.as_str());
                stack.extend(children.into_iter().rev().map(|c| (c, opaque)));
            }
            tl::Node::Raw(bytes) => {
                if !opaque && !bytes.as_utf8_str().trim().is_empty() {
                    if let Some(start) = offset_in(text, bytes.as_bytes()) {
                        marks.content_at(start);
                    }
                }
            }
            tl::Node::Comment(bytes) => capture_comment(&bytes.as_utf8_str(), properties),
        }
    }
    marks
}

fn first_text(children: &[tl::NodeHandle], parser: &tl::Parser<'_>) -> String {
    children
        .iter()
        .find_map(|c| match c.get(parser) {
            Some(tl::Node::Raw(bytes)) => Some(bytes.as_utf8_str().into_owned()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Title text and the byte range of the whole `<title>` element.
fn page_title(text: &str, marks: &Landmarks, end_tags: &EndTags) -> (String, Option<(usize, usize)>) {
    let Some(span) = marks.title else {
        return (String::new(), None);
    };
    let open_end = span.open_end(text);
    match first_from(&end_tags.title, open_end) {
        Some((close, after)) => (slice(text, open_end, close).trim().to_string(), Some((span.start, after))),
        None => (marks.title_text.trim().to_string(), None),
    }
}

/// Head markup without its title, and the offset where the head region ends.
fn head_fragment(
    text: &str,
    marks: &Landmarks,
    end_tags: &EndTags,
    title: Option<(usize, usize)>,
) -> (String, Option<usize>) {
    let Some(span) = marks.head else {
        return (String::new(), None);
    };
    let open_end = span.open_end(text);
    let end_tag = first_from(&end_tags.head, open_end);
    let html_end = first_from(&end_tags.html, open_end).map(|(start, _)| start);

    let limit = [
        end_tag.map(|(start, _)| start),
        marks.head_breaker,
        marks.body.map(|b| b.start),
        html_end,
    ]
    .into_iter()
    .flatten()
    .filter(|pos| *pos >= open_end)
    .min()
    .unwrap_or(text.len());
    let next = match end_tag {
        Some((start, after)) if start == limit => after,
        _ => limit,
    };

    let fragment = match title {
        Some((start, end)) if start >= open_end && end <= limit => {
            format!("{}{}", slice(text, open_end, start), slice(text, end, limit))
        }
        _ => slice(text, open_end, limit).to_string(),
    };
    (fragment.trim().to_string(), Some(next))
}

fn body_fragment(
    text: &str,
    marks: &Landmarks,
    end_tags: &EndTags,
    head_next: Option<usize>,
    title: Option<(usize, usize)>,
) -> String {
    if let Some(span) = marks.body {
        let open_end = span.open_end(text);
        let end = last_from(&end_tags.body, open_end)
            .or_else(|| last_from(&end_tags.html, open_end))
            .map_or(text.len(), |(start, _)| start);
        return slice(text, open_end, end).trim().to_string();
    }

    let preamble = DOCTYPE.find(text).map_or(0, |m| m.end());
    let html_open = marks
        .html
        .filter(|html| marks.first_content.map_or(true, |first| first > html.start))
        .map(|html| html.open_end(text));
    let start = head_next.or(html_open).unwrap_or(preamble).max(preamble);
    let end = last_from(&end_tags.html, start).map_or(text.len(), |(start, _)| start);

    let fragment = match title {
        Some((t_start, t_end)) if t_start >= start && t_end <= end => {
            format!("{}{}", slice(text, start, t_start), slice(text, t_end, end))
        }
        _ => slice(text, start, end).to_string(),
    };
    fragment.trim().to_string()
}

/// Pair `<content tag>` blocks with their end tags, innermost first.
fn capture_content_blocks(
    text: &str,
    marks: &Landmarks,
    end_tags: &EndTags,
    properties: &mut BTreeMap<String, String>,
) {
    enum Event<'m> {
        Open(&'m str, TagSpan),
        Close(usize),
    }

    let mut events: Vec<(usize, Event<'_>)> = marks
        .content_blocks
        .iter()
        .map(|(key, span)| (span.start, Event::Open(key.as_str(), *span)))
        .chain(end_tags.content.iter().map(|(start, _)| (*start, Event::Close(*start))))
        .collect();
    events.sort_by_key(|(pos, _)| *pos);

    let mut open: Vec<(&str, TagSpan)> = Vec::new();
    for (_, event) in events {
        match event {
            Event::Open(key, span) => open.push((key, span)),
            Event::Close(close) => {
                if let Some((key, span)) = open.pop() {
                    let inner = span.inner_start.filter(|s| *s <= close).unwrap_or(close);
                    properties.insert(format!("page.{key}"), slice(text, inner, close).to_string());
                }
            }
        }
    }
}

fn capture_attributes(prefix: &str, tag: &tl::HTMLTag<'_>, properties: &mut BTreeMap<String, String>) {
    for (name, value) in tag.attributes().iter() {
        properties.insert(
            format!("{prefix}.{}", name.to_ascii_lowercase()),
            value.map(|v| v.to_string()).unwrap_or_default(),
        );
    }
}

fn capture_meta(tag: &tl::HTMLTag<'_>, properties: &mut BTreeMap<String, String>) {
    let mut content = String::new();
    let mut name = None;
    let mut http_equiv = None;
    for (key, value) in tag.attributes().iter() {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        match key.to_ascii_lowercase().as_str() {
            "content" => content = value,
            "name" | "property" if name.is_none() => name = Some(value.to_ascii_lowercase()),
            "http-equiv" => http_equiv = Some(value.to_ascii_lowercase()),
            _ => {}
        }
    }
    if let Some(name) = name {
        properties.insert(format!("meta.{name}"), content);
    } else if let Some(name) = http_equiv {
        properties.insert(format!("meta.http-equiv.{name}"), content);
    }
}

fn capture_comment(raw: &str, properties: &mut BTreeMap<String, String>) {
    let inner = raw.strip_prefix("<!--").unwrap_or(raw);
    let inner = inner.strip_suffix("-->").unwrap_or(inner);
    if let Some(caps) = COMMENT_PROPERTY.captures(inner) {
        properties.insert(format!("page.{}", &caps[1]), caps[2].to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn parse(html: &str) -> StructuredContent {
        HtmlExtractor::new()
            .parse(Bytes::from(html.to_string()))
            .unwrap()
    }

    #[test]
    fn test_simple_page() {
        let content = parse("<html><head><title>Test1</title></head><body>Hello <b>World</b>!</body></html>");
        assert!(content.is_extracted());
        assert_eq!(content.title(), "Test1");
        assert_eq!(content.head(), "");
        assert_eq!(content.body(), "Hello <b>World</b>!");
    }

    #[test]
    fn test_head_keeps_markup_without_title() {
        let content = parse(
            "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <title> Spaced </title>\n  <link rel=\"stylesheet\" href=\"/a.css\">\n</head>\n<body class=\"home\" onload=\"init()\">\n<p>x</p>\n</body>\n</html>\n",
        );
        assert_eq!(content.title(), "Spaced");
        assert_eq!(
            content.head(),
            "<meta charset=\"utf-8\">\n  \n  <link rel=\"stylesheet\" href=\"/a.css\">"
        );
        assert_eq!(content.body(), "<p>x</p>");
        assert_eq!(content.property("body.class"), Some("home"));
        assert_eq!(content.property("body.onload"), Some("init()"));
    }

    #[test]
    fn test_missing_html_and_unclosed_body() {
        let content = parse("<head><title>T</title></head><body><p>open paragraph<div>more");
        assert_eq!(content.title(), "T");
        assert_eq!(content.body(), "<p>open paragraph<div>more");
    }

    #[test]
    fn test_no_body_tag() {
        let content = parse("<title>Bare</title><p>Just a fragment</p>");
        assert_eq!(content.title(), "Bare");
        assert_eq!(content.body(), "<p>Just a fragment</p>");

        let content = parse("plain text");
        assert_eq!(content.title(), "");
        assert_eq!(content.body(), "plain text");

        let content = parse("<html><head><title>X</title></head>\n<h1>Hi</h1></html>");
        assert_eq!(content.body(), "<h1>Hi</h1>");
    }

    #[test]
    fn test_unclosed_head_ends_at_first_body_element() {
        let content = parse("<html><head><title>X</title><h1>Hi</h1><p>content</p></html>");
        assert_eq!(content.title(), "X");
        assert_eq!(content.head(), "");
        assert_eq!(content.body(), "<h1>Hi</h1><p>content</p>");

        let content = parse("<head><meta name=\"author\" content=\"A\"><title>X</title>Loose text<p>more</p>");
        assert_eq!(content.head(), "<meta name=\"author\" content=\"A\">");
        assert_eq!(content.body(), "Loose text<p>more</p>");
        assert_eq!(content.property("meta.author"), Some("A"));
    }

    #[test]
    fn test_unclosed_head_before_body_tag() {
        let content = parse("<head><title>T</title><style>p{}</style><body><p>x</p></body>");
        assert_eq!(content.head(), "<style>p{}</style>");
        assert_eq!(content.body(), "<p>x</p>");
    }

    #[test]
    fn test_title_after_content_keeps_leading_content() {
        let content = parse("<p>Intro</p><title>T</title><p>rest</p>");
        assert_eq!(content.title(), "T");
        assert_eq!(content.body(), "<p>Intro</p><p>rest</p>");
    }

    #[test]
    fn test_script_with_body_end_tag() {
        let content = parse("<body><script>document.write('</body>');</script><p>after</p></body>");
        assert_eq!(content.body(), "<script>document.write('</body>');</script><p>after</p>");
    }

    #[test]
    fn test_title_inside_body_is_not_page_title() {
        let content = parse("<body><svg><title>icon</title></svg></body>");
        assert_eq!(content.title(), "");
    }

    #[test]
    fn test_extra_properties() {
        let content = parse(concat!(
            "<html lang=\"en\"><head>",
            "<meta name=\"Author\" content=\"Joe\">",
            "<meta http-equiv=\"Refresh\" content=\"30\">",
            "<meta name=\"decorator\" content=\"print\">",
            "<!-- section: news -->",
            "<!--[if IE]><p>old</p><![endif]-->",
            "</head><body>",
            "<content tag=\"sidebar\"><ul><li>a</li></ul></content>",
            "main</body></html>",
        ));
        assert_eq!(content.property("html.lang"), Some("en"));
        assert_eq!(content.property("meta.author"), Some("Joe"));
        assert_eq!(content.property("meta.http-equiv.refresh"), Some("30"));
        assert_eq!(content.property("meta.decorator"), Some("print"));
        assert_eq!(content.property("page.section"), Some("news"));
        assert_eq!(content.property("page.sidebar"), Some("<ul><li>a</li></ul>"));
        assert_eq!(content.body(), "<content tag=\"sidebar\"><ul><li>a</li></ul></content>main");
    }

    #[test]
    fn test_bindings_prefer_core_keys() {
        let content = parse("<html><head><title>T</title></head><body>B</body></html>");
        let bindings = content.to_bindings();
        assert_eq!(bindings.get("title").map(String::as_str), Some("T"));
        assert_eq!(bindings.get("head").map(String::as_str), Some(""));
        assert_eq!(bindings.get("body").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = parse("<html><head><title>A</title><style>p{}</style></head><body><p>b</p></body></html>");
        let second = HtmlExtractor::new()
            .parse(first.original_bytes().clone())
            .unwrap();
        assert_eq!(first.title(), second.title());
        assert_eq!(first.head(), second.head());
        assert_eq!(first.body(), second.body());
    }

    #[test]
    fn test_unclosed_tags_scale_linearly() {
        let inputs = [
            "<textarea>".repeat(50_000),
            format!("{}{}", "<script>".repeat(25_000), "</a>".repeat(25_000)),
            "<content tag=\"x\">".repeat(20_000),
        ];
        for input in inputs {
            let started = Instant::now();
            let content = parse(&input);
            assert!(content.is_extracted());
            assert!(
                started.elapsed() < Duration::from_secs(5),
                "took {:?} for {} bytes",
                started.elapsed(),
                input.len()
            );
        }
    }

    #[test]
    fn test_catastrophic_input_falls_back() {
        let raw = Bytes::from_static(&[0xff, 0xfe, 0x00, 0x41]);
        assert!(HtmlExtractor::new().parse(raw.clone()).is_err());

        let content = HtmlExtractor::new().extract(raw.clone());
        assert!(!content.is_extracted());
        assert_eq!(content.original_bytes(), &raw);
        assert_eq!(content.body(), "");

        let nul = Bytes::from_static(b"<html>\0</html>");
        assert!(matches!(
            HtmlExtractor::new().parse(nul),
            Err(DecorationError::ParseFailure(_))
        ));
    }
}
