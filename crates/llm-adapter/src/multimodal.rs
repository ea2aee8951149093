//! Splitting turn text into ordered text and image parts.
//!
//! Inline images are written as `<img src="URL" detail="low"/>` or
//! `<img base64="..." detail="high"/>`. Base64 payloads may be bare or a
//! full `data:` URI.

use brain_core::markup::find_elements;

const DEFAULT_MIME: &str = "image/jpeg";

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote URL.
    Url(String),
    /// Inline bytes.
    Base64 {
        /// Media type, e.g. `image/png`.
        mime_type: String,
        /// Base64 payload without the `data:` prefix.
        data: String,
    },
}

impl ImageSource {
    /// URL form accepted by OpenAI-style APIs (`data:` URI for inline bytes).
    pub fn to_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Base64 { mime_type, data } => format!("data:{mime_type};base64,{data}"),
        }
    }

    fn from_base64(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("data:") {
            if let Some((mime_type, data)) = rest.split_once(";base64,") {
                return Self::Base64 {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                };
            }
        }
        Self::Base64 {
            mime_type: DEFAULT_MIME.to_string(),
            data: raw.to_string(),
        }
    }
}

/// One piece of a multimodal turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// An image with its requested detail level.
    Image {
        /// Image source.
        source: ImageSource,
        /// Detail hint (`auto`, `low`, `high`).
        detail: Option<String>,
    },
}

impl ContentPart {
    /// Whether this part is an image.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// Split `content` at `<img>` markers, keeping order.
///
/// Markers with neither `src` nor `base64` are left in the text. Empty text
/// between adjacent markers is dropped.
pub fn split_content(content: &str) -> Vec<ContentPart> {
    let mut parts = Vec::new();
    let mut cursor = 0;

    for element in find_elements(content, "img") {
        let source = match (element.attr("src"), element.attr("base64")) {
            (Some(url), _) if !url.trim().is_empty() => ImageSource::Url(url.trim().to_string()),
            (_, Some(data)) if !data.trim().is_empty() => ImageSource::from_base64(data),
            _ => continue,
        };

        push_text(&mut parts, &content[cursor..element.start]);
        parts.push(ContentPart::Image {
            source,
            detail: element
                .attr("detail")
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        });
        cursor = element.end;
    }

    push_text(&mut parts, &content[cursor..]);
    parts
}

/// Whether the content carries at least one image marker.
pub fn has_images(content: &str) -> bool {
    split_content(content).iter().any(ContentPart::is_image)
}

fn push_text(parts: &mut Vec<ContentPart>, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    parts.push(ContentPart::Text(text.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_part() {
        assert_eq!(
            split_content("just words"),
            vec![ContentPart::Text("just words".into())]
        );
        assert!(!has_images("just words"));
    }

    #[test]
    fn test_images_split_in_order() {
        let parts = split_content(
            r#"look <img src="https://x/cat.png" detail="low"/> and <img base64="AAAA"/> done"#,
        );
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], ContentPart::Text("look ".into()));
        assert_eq!(
            parts[1],
            ContentPart::Image {
                source: ImageSource::Url("https://x/cat.png".into()),
                detail: Some("low".into()),
            }
        );
        assert_eq!(parts[2], ContentPart::Text(" and ".into()));
        assert_eq!(
            parts[3],
            ContentPart::Image {
                source: ImageSource::Base64 {
                    mime_type: "image/jpeg".into(),
                    data: "AAAA".into(),
                },
                detail: None,
            }
        );
        assert_eq!(parts[4], ContentPart::Text(" done".into()));
    }

    #[test]
    fn test_data_uri_keeps_mime() {
        let parts = split_content(r#"<img base64="data:image/png;base64,iVBO"/>"#);
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            ContentPart::Image { source, .. } => {
                assert_eq!(source.to_url(), "data:image/png;base64,iVBO");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn test_marker_without_source_stays_text() {
        let parts = split_content(r#"a <img detail="low"/> b"#);
        assert_eq!(parts, vec![ContentPart::Text(r#"a <img detail="low"/> b"#.into())]);
    }

    #[test]
    fn test_bare_base64_becomes_data_uri() {
        let source = ImageSource::from_base64("QUJD");
        assert_eq!(source.to_url(), "data:image/jpeg;base64,QUJD");
    }
}
