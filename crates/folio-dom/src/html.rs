//! Lenient HTML loader.
//!
//! Built pages are read with `quick-xml` in a forgiving configuration:
//! unmatched or mismatched end tags are tolerated, attributes may be
//! unquoted or valueless, void elements close themselves and the content of
//! `<script>`/`<style>` is kept verbatim. A `&` that does not start a
//! reference and a `<` that cannot start markup are read as text.

use std::borrow::Cow;

use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::reader::Reader;

use crate::document::{Document, NodeId, RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

/// Errors that can occur while loading HTML.
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("Malformed HTML at byte {position}: {source}")]
    Syntax {
        position: u64,
        source: quick_xml::Error,
    },
}

/// Elements that belong in `<head>` when they appear before `<body>`.
const HEAD_ELEMENTS: &[&str] = &["base", "link", "meta", "script", "style", "title"];

/// Parse an HTML document or fragment.
///
/// Full documents populate the `<html>`, `<head>` and `<body>` of the
/// returned document; fragments are appended to `<body>`.
pub fn parse_html(source: &str) -> Result<Document, HtmlError> {
    let source = escape_stray_brackets(source);
    let mut reader = Reader::from_str(&source);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
        config.trim_text(false);
    }

    let mut doc = Document::new();
    let mut builder = TreeBuilder {
        doc: &mut doc,
        stack: Vec::new(),
        body_opened: false,
    };

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(HtmlError::Syntax {
                    position: reader.error_position(),
                    source,
                })
            }
        };

        match event {
            Event::Start(e) => {
                let tag = tag_name(e.name().as_ref());
                builder.open(&tag, &e);

                if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                    let text = match reader.read_text(e.name()) {
                        Ok(text) => text,
                        Err(source) => {
                            return Err(HtmlError::Syntax {
                                position: reader.error_position(),
                                source,
                            })
                        }
                    };
                    builder.text(&text);
                    builder.close(&tag);
                } else if VOID_ELEMENTS.contains(&tag.as_str()) {
                    builder.close(&tag);
                }
            }
            Event::Empty(e) => {
                let tag = tag_name(e.name().as_ref());
                builder.open(&tag, &e);
                builder.close(&tag);
            }
            Event::End(e) => {
                let tag = tag_name(e.name().as_ref());
                builder.close(&tag);
            }
            Event::Text(e) => {
                let text = e.decode().map_err(|err| HtmlError::Syntax {
                    position: reader.buffer_position(),
                    source: err.into(),
                })?;
                builder.text(&text);
            }
            Event::GeneralRef(e) => {
                builder.text(&resolve_reference(&e));
            }
            Event::CData(e) => {
                builder.text(&String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    Ok(doc)
}

struct TreeBuilder<'d> {
    doc: &'d mut Document,
    stack: Vec<(String, NodeId)>,
    body_opened: bool,
}

impl TreeBuilder<'_> {
    /// Node that new content is appended to.
    fn insertion_point(&self, tag: Option<&str>) -> NodeId {
        match self.stack.last() {
            Some((open, node)) if open != "html" => *node,
            _ => {
                let head_content = tag.is_some_and(|t| HEAD_ELEMENTS.contains(&t));
                if head_content && !self.body_opened {
                    self.doc.head()
                } else {
                    self.doc.body()
                }
            }
        }
    }

    fn open(&mut self, tag: &str, start: &BytesStart) {
        let node = match tag {
            "html" => self.doc.html(),
            "head" => self.doc.head(),
            "body" => {
                self.body_opened = true;
                self.doc.body()
            }
            _ => {
                self.close_implied(tag);
                let parent = self.insertion_point(Some(tag));
                let node = self.doc.create_element(tag);
                self.doc.append_child(parent, node);
                node
            }
        };

        for (name, value) in attributes(start) {
            self.doc.set_attribute(node, &name, &value);
        }

        self.stack.push((tag.to_string(), node));
    }

    /// Close elements whose end tag HTML lets authors omit.
    fn close_implied(&mut self, tag: &str) {
        match tag {
            "li" => {
                let list_boundary = self
                    .stack
                    .iter()
                    .rposition(|(open, _)| open == "ul" || open == "ol");
                let open_item = self.stack.iter().rposition(|(open, _)| open == "li");
                if let Some(item) = open_item {
                    if list_boundary.map_or(true, |boundary| item > boundary) {
                        self.stack.truncate(item);
                    }
                }
            }
            "p" | "div" | "ul" | "ol" | "section" | "header" | "footer" | "nav" => {
                if self.stack.last().is_some_and(|(open, _)| open == "p") {
                    self.stack.pop();
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: &str) {
        if let Some(index) = self.stack.iter().rposition(|(open, _)| open == tag) {
            self.stack.truncate(index);
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        // Formatting whitespace outside of any element
        let outside = self
            .stack
            .last()
            .map_or(true, |(open, _)| open == "html" || open == "head");
        if outside && text.trim().is_empty() {
            return;
        }

        let parent = self.insertion_point(None);
        self.doc.append_text(parent, text);
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn attributes(start: &BytesStart) -> Vec<(String, String)> {
    start
        .html_attributes()
        .flatten()
        .map(|attr| {
            let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            (name, value)
        })
        .collect()
}

/// Escape each `<` that cannot open a tag, comment or declaration.
///
/// The content of raw text elements is passed through untouched, since the
/// reader hands it back verbatim.
fn escape_stray_brackets(source: &str) -> Cow<'_, str> {
    let opens_markup = |b: u8| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?');
    let bytes = source.as_bytes();
    let stray = bytes
        .iter()
        .enumerate()
        .any(|(i, &b)| b == b'<' && !bytes.get(i + 1).copied().is_some_and(opens_markup));
    if !stray {
        return Cow::Borrowed(source);
    }

    let mut out = String::with_capacity(source.len() + 8);
    let mut rest = source;
    while let Some(index) = rest.find('<') {
        let (before, tail) = rest.split_at(index);
        out.push_str(before);

        if !tail.as_bytes().get(1).copied().is_some_and(opens_markup) {
            out.push_str("&lt;");
            rest = &tail[1..];
            continue;
        }

        if let Some(tag) = raw_text_start(tail) {
            let lower = tail.to_ascii_lowercase();
            let end = lower.find(&format!("</{}", tag)).unwrap_or(tail.len());
            out.push_str(&tail[..end]);
            rest = &tail[end..];
            continue;
        }

        out.push('<');
        rest = &tail[1..];
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Raw text element opened at the start of `tail`, if any.
fn raw_text_start(tail: &str) -> Option<&'static str> {
    let name = tail.get(1..)?;
    RAW_TEXT_ELEMENTS.iter().copied().find(|tag| {
        name.get(..tag.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tag))
            && name[tag.len()..]
                .bytes()
                .next()
                .map_or(true, |b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
    })
}

/// Decode an entity or character reference.
fn resolve_reference(reference: &BytesRef) -> String {
    if let Ok(Some(c)) = reference.resolve_char_ref() {
        return c.to_string();
    }

    let name = String::from_utf8_lossy(reference).into_owned();
    let resolved = match name.as_str() {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "middot" => "\u{b7}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "hellip" => "\u{2026}",
        _ => return format!("&{};", name),
    };
    resolved.to_string()
}
