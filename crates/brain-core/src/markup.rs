//! Host message markup.
//!
//! Outbound text is built as a stream of [`Segment`]s and rendered to the
//! host's element markup (`<at id="..."/>`, `<face id="..."/>`, ...). Inbound
//! content is scanned for the same self-closing elements with
//! [`find_elements`], which walks the text once from left to right.

use std::fmt;

/// One piece of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text.
    Text(String),
    /// Mention of a single member.
    Mention {
        /// Member id.
        id: String,
        /// Display name the mention was resolved from.
        name: String,
    },
    /// Mention of every member of the channel.
    MentionAll,
    /// Custom emoji.
    Emoji {
        /// Emoji id.
        id: String,
        /// Name the model asked for.
        name: String,
    },
    /// Quote of an earlier message.
    Quote {
        /// Quoted message id.
        id: String,
    },
}

impl Segment {
    /// Create a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Mention { id, name } => {
                write!(f, "<at id=\"{}\" name=\"{}\"/>", escape_attr(id), escape_attr(name))
            }
            Self::MentionAll => f.write_str("<at type=\"all\"/>"),
            Self::Emoji { id, name } => {
                write!(f, "<face id=\"{}\" name=\"{}\"/>", escape_attr(id), escape_attr(name))
            }
            Self::Quote { id } => write!(f, "<quote id=\"{}\"/>", escape_attr(id)),
        }
    }
}

/// Render segments to host markup.
pub fn render(segments: &[Segment]) -> String {
    segments.iter().map(ToString::to_string).collect()
}

/// Merge adjacent text segments and drop empty ones.
pub fn normalize(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Text(text) if text.is_empty() => {}
            Segment::Text(text) => {
                if let Some(Segment::Text(prev)) = out.last_mut() {
                    prev.push_str(&text);
                } else {
                    out.push(Segment::Text(text));
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape_attr(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}

/// A self-closing element found in inbound content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Byte offset of `<`.
    pub start: usize,
    /// Byte offset one past the closing `>`.
    pub end: usize,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
}

impl Element {
    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Find every `<tag .../>` (or `<tag ...>`) element in `content`.
pub fn find_elements(content: &str, tag: &str) -> Vec<Element> {
    let opener = format!("<{tag}");
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = content[cursor..].find(&opener) {
        let start = cursor + rel;
        let after_name = start + opener.len();
        // `<atom>` must not match `<at`.
        let boundary = content[after_name..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '/' || c == '>') {
            cursor = after_name;
            continue;
        }
        let Some(close_rel) = find_tag_end(&content[after_name..]) else {
            break;
        };
        let end = after_name + close_rel + 1;
        let body = content[after_name..end - 1].trim_end_matches('/');
        found.push(Element {
            start,
            end,
            attrs: parse_attributes(body),
        });
        cursor = end;
    }

    found
}

/// Offset of the `>` that closes a tag, skipping quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '>' if !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parse `key="value"` pairs. Bare keys get an empty value.
pub fn parse_attributes(body: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_whitespace() || ch == '/' {
            chars.next();
            continue;
        }

        let mut key = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() || c == '/' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut value = String::new();
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            if let Some(&(_, '"')) = chars.peek() {
                chars.next();
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    value.push(c);
                }
            } else {
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }

        if !key.is_empty() {
            attrs.push((key, unescape_attr(&value)));
        }
    }

    attrs
}
