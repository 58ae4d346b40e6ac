//! Inline image extraction and Content-ID rewriting.
//!
//! Composed HTML carries images as data URIs tagged with the Content-ID they
//! should be attached under:
//!
//! ```text
//! <img cid="logo" src="data:image/png;base64,iVBORw0KGgo...">
//! ```
//!
//! Mail clients do not reliably render data URIs, so before sending every
//! such tag is rewritten to reference the attachment instead:
//!
//! ```text
//! <img src="cid:logo">
//! ```
//!
//! and the payload is collected for the MIME layer to attach.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Opening `<img` tag with a Content-ID and a base64 data URI.
///
/// Group 1 is the Content-ID, group 2 the image subtype, group 3 the payload.
/// The match ends on the closing quote of `src`.
#[allow(clippy::expect_used)]
static INLINE_IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img cid="([^"]+)" src="data:image/(png|jpeg);base64,([^"]*)""#)
        .expect("Invalid regex pattern for inline images")
});

/// Image formats that can be embedded inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

impl ImageFormat {
    /// Parses the subtype of an `image/*` MIME type.
    ///
    /// Matching is case-sensitive; only `png` and `jpeg` are accepted.
    #[must_use]
    pub fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype {
            "png" => Some(Self::Png),
            "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Returns the MIME subtype (`png` or `jpeg`).
    #[must_use]
    pub const fn subtype(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Returns the full MIME type.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Returns the conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An image pulled out of the HTML, ready to be attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// Content-ID the rewritten HTML refers to.
    pub content_id: String,
    /// Image format declared in the data URI.
    pub format: ImageFormat,
    /// Base64 payload, exactly as it appeared in the document.
    pub data: String,
}

impl InlineImage {
    /// Decodes the base64 payload.
    ///
    /// Whitespace inside the payload is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let cleaned: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).map_err(Into::into)
    }

    /// Returns the `Content-ID` header value (`<id>`).
    #[must_use]
    pub fn content_id_header(&self) -> String {
        format!("<{}>", self.content_id)
    }
}

/// Extracted images keyed by Content-ID, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineImages {
    images: IndexMap<String, InlineImage>,
}

impl InlineImages {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an image, replacing any earlier image with the same Content-ID.
    ///
    /// The replaced image is returned. Its position in the collection is kept.
    pub fn insert(&mut self, image: InlineImage) -> Option<InlineImage> {
        self.images.insert(image.content_id.clone(), image)
    }

    /// Returns the image for a Content-ID.
    #[must_use]
    pub fn get(&self, content_id: &str) -> Option<&InlineImage> {
        self.images.get(content_id)
    }

    /// Returns the number of distinct Content-IDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if no images were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterates over images in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = &InlineImage> {
        self.images.values()
    }

    /// Iterates over `(content_id, payload)` pairs.
    pub fn payloads(&self) -> impl Iterator<Item = (&str, &str)> {
        self.images
            .iter()
            .map(|(cid, image)| (cid.as_str(), image.data.as_str()))
    }
}

impl IntoIterator for InlineImages {
    type Item = InlineImage;
    type IntoIter = indexmap::map::IntoValues<String, InlineImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_values()
    }
}

impl<'a> IntoIterator for &'a InlineImages {
    type Item = &'a InlineImage;
    type IntoIter = indexmap::map::Values<'a, String, InlineImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.values()
    }
}

/// Returns true if the document contains at least one rewritable image tag.
#[must_use]
pub fn has_inline_images(html: &str) -> bool {
    INLINE_IMAGE_PATTERN.is_match(html)
}

/// Rewrites inline data-URI images to Content-ID references.
///
/// Each `<img cid="ID" src="data:image/png;base64,DATA"` (or `jpeg`) is
/// replaced by `<img src="cid:ID"`, left to right, in a single pass. The
/// `cid` attribute is dropped; anything after the `src` value is kept.
///
/// Returns the rewritten document and the extracted images. When nothing
/// matches the document is returned borrowed and the collection is `None`.
///
/// Two tags sharing a Content-ID are both rewritten; the collection keeps the
/// later payload.
#[must_use]
pub fn rewrite_inline_images(html: &str) -> (Cow<'_, str>, Option<InlineImages>) {
    let mut images = InlineImages::new();

    let rewritten = INLINE_IMAGE_PATTERN.replace_all(html, |caps: &Captures<'_>| {
        let content_id = &caps[1];
        let Some(format) = ImageFormat::from_subtype(&caps[2]) else {
            return caps[0].to_string();
        };

        let image = InlineImage {
            content_id: content_id.to_string(),
            format,
            data: caps[3].to_string(),
        };
        if images.insert(image).is_some() {
            warn!(content_id, "duplicate inline image content id, keeping the later image");
        }

        format!(r#"<img src="cid:{content_id}""#)
    });

    if images.is_empty() {
        return (rewritten, None);
    }

    debug!(count = images.len(), "rewrote inline images to content ids");
    (rewritten, Some(images))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn png(cid: &str, data: &str) -> String {
        format!(r#"<img cid="{cid}" src="data:image/png;base64,{data}">"#)
    }

    #[test]
    fn test_no_images_is_noop() {
        let html = "<html><body><p>Hello</p><img src=\"logo.png\"></body></html>";
        let (out, images) = rewrite_inline_images(html);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, html);
        assert!(images.is_none());
        assert!(!has_inline_images(html));
    }

    #[test]
    fn test_single_png() {
        let html = format!("<p>Hi</p>{}<p>Bye</p>", png("logo", "AAAA"));
        assert!(has_inline_images(&html));

        let (out, images) = rewrite_inline_images(&html);
        assert_eq!(out, r#"<p>Hi</p><img src="cid:logo"><p>Bye</p>"#);

        let images = images.unwrap();
        assert_eq!(images.len(), 1);
        let logo = images.get("logo").unwrap();
        assert_eq!(logo.data, "AAAA");
        assert_eq!(logo.format, ImageFormat::Png);
        assert_eq!(
            images.payloads().collect::<Vec<_>>(),
            vec![("logo", "AAAA")]
        );
    }

    #[test]
    fn test_jpeg() {
        let html = r#"<img cid="photo" src="data:image/jpeg;base64,/9j/4AAQ">"#;
        let (out, images) = rewrite_inline_images(html);
        assert_eq!(out, r#"<img src="cid:photo">"#);
        let photo = images.unwrap().get("photo").cloned().unwrap();
        assert_eq!(photo.format, ImageFormat::Jpeg);
        assert_eq!(photo.data, "/9j/4AAQ");
    }

    #[test]
    fn test_two_images_keep_order() {
        let html = format!("{}<br>{}", png("img1", "AAAA"), png("img2", "BBBB"));
        let (out, images) = rewrite_inline_images(&html);
        assert_eq!(out, r#"<img src="cid:img1"><br><img src="cid:img2">"#);

        let images = images.unwrap();
        assert_eq!(
            images.payloads().collect::<Vec<_>>(),
            vec![("img1", "AAAA"), ("img2", "BBBB")]
        );
    }

    #[test]
    fn test_duplicate_cid_last_wins() {
        let html = format!("{}{}", png("dup", "AAAA"), png("dup", "BBBB"));
        let (out, images) = rewrite_inline_images(&html);
        assert_eq!(out, r#"<img src="cid:dup"><img src="cid:dup">"#);

        let images = images.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images.get("dup").unwrap().data, "BBBB");
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        let html = format!(
            "{}{}{}",
            png("a", "AAAA"),
            png("b", "BBBB"),
            png("a", "CCCC")
        );
        let (_, images) = rewrite_inline_images(&html);
        assert_eq!(
            images.unwrap().payloads().collect::<Vec<_>>(),
            vec![("a", "CCCC"), ("b", "BBBB")]
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let html = format!("{}{}", png("img1", "AAAA"), png("img2", "BBBB"));
        let (once, _) = rewrite_inline_images(&html);
        let (twice, images) = rewrite_inline_images(&once);
        assert_eq!(once, twice);
        assert!(images.is_none());
    }

    #[test]
    fn test_unsupported_format_untouched() {
        let html = r#"<img cid="anim" src="data:image/gif;base64,R0lGOD">"#;
        let (out, images) = rewrite_inline_images(html);
        assert_eq!(out, html);
        assert!(images.is_none());
    }

    #[test]
    fn test_uppercase_subtype_untouched() {
        let html = r#"<img cid="x" src="data:image/PNG;base64,AAAA">"#;
        let (out, images) = rewrite_inline_images(html);
        assert_eq!(out, html);
        assert!(images.is_none());
    }

    #[test]
    fn test_format_taken_from_each_tag() {
        let html = concat!(
            r#"<img cid="a" src="data:image/jpeg;base64,/9j/">"#,
            r#"<img cid="b" src="data:image/png;base64,iVBO">"#,
        );
        let (_, images) = rewrite_inline_images(html);
        let images = images.unwrap();
        for (cid, subtype) in [("a", "jpeg"), ("b", "png")] {
            assert_eq!(
                Some(images.get(cid).unwrap().format),
                ImageFormat::from_subtype(subtype)
            );
        }
    }

    #[test]
    fn test_empty_content_id_untouched() {
        let html = r#"<img cid="" src="data:image/png;base64,AAAA">"#;
        assert!(!has_inline_images(html));
        let (out, images) = rewrite_inline_images(html);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, html);
        assert!(images.is_none());
    }

    #[test]
    fn test_malformed_tags_ignored() {
        let html = concat!(
            r#"<img src="data:image/png;base64,AAAA" cid="late">"#,
            r#"<img cid=bare src="data:image/png;base64,AAAA">"#,
            r#"<img cid="x" alt="" src="data:image/png;base64,AAAA">"#,
        );
        let (out, images) = rewrite_inline_images(html);
        assert_eq!(out, html);
        assert!(images.is_none());
    }

    #[test]
    fn test_mixed_valid_and_unsupported() {
        let html = format!(
            r#"{}<img cid="g" src="data:image/gif;base64,R0lG">{}"#,
            png("a", "AAAA"),
            png("b", "BBBB")
        );
        let (out, images) = rewrite_inline_images(&html);
        assert_eq!(
            out,
            r#"<img src="cid:a"><img cid="g" src="data:image/gif;base64,R0lG"><img src="cid:b">"#
        );
        assert_eq!(images.unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_attributes_kept() {
        let html = r#"<img cid="logo" src="data:image/png;base64,AAAA" alt="Logo" width="64">"#;
        let (out, _) = rewrite_inline_images(html);
        assert_eq!(out, r#"<img src="cid:logo" alt="Logo" width="64">"#);
    }

    #[test]
    fn test_payload_passes_through_unvalidated() {
        let html = png("bad", "not base64!");
        let (_, images) = rewrite_inline_images(&html);
        let image = images.unwrap().get("bad").cloned().unwrap();
        assert_eq!(image.data, "not base64!");
        assert!(image.decode().is_err());
    }

    #[test]
    fn test_decode() {
        let image = InlineImage {
            content_id: "hello".to_string(),
            format: ImageFormat::Png,
            data: "SGVs\nbG8=".to_string(),
        };
        assert_eq!(image.decode().unwrap(), b"Hello");
        assert_eq!(image.content_id_header(), "<hello>");
    }

    #[test]
    fn test_image_format() {
        assert_eq!(ImageFormat::from_subtype("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_subtype("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_subtype("gif"), None);
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.to_string(), "image/png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_images_serialize_as_map() {
        let (_, images) = rewrite_inline_images(&png("logo", "AAAA"));
        let json = serde_json::to_value(images.unwrap()).unwrap();
        assert_eq!(json["logo"]["data"], "AAAA");
        assert_eq!(json["logo"]["format"], "png");
    }

    proptest! {
        #[test]
        fn prop_documents_without_data_uris_unchanged(html in "[a-zA-Z0-9 <>/=\"]{0,200}") {
            let (out, images) = rewrite_inline_images(&html);
            prop_assert_eq!(&*out, html.as_str());
            prop_assert!(images.is_none());
        }

        #[test]
        fn prop_distinct_ids_collected_in_order(
            ids in proptest::collection::btree_set("[a-z][a-z0-9_-]{0,8}", 1..8),
            data in "[A-Za-z0-9+/]{0,16}",
        ) {
            let ids: Vec<String> = ids.into_iter().collect();
            let html: String = ids.iter().map(|id| png(id, &data)).collect::<Vec<_>>().join("\n");

            let (out, images) = rewrite_inline_images(&html);
            let images = images.unwrap();
            let collected: Vec<&str> = images.iter().map(|i| i.content_id.as_str()).collect();
            prop_assert_eq!(collected, ids.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert!(!out.contains("data:image"));

            let (again, none) = rewrite_inline_images(&out);
            prop_assert_eq!(&*again, &*out);
            prop_assert!(none.is_none());
        }
    }
}
