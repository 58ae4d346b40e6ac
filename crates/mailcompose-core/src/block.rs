//! Precomposed message blocks.
//!
//! A header, body or footer is either plain Markdown text or a sequence of
//! blocks. Image blocks render as data-URI `<img>` tags carrying their
//! Content-ID, which [`rewrite_inline_images`](crate::rewrite_inline_images)
//! later turns into `cid:` references.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::inline_image::ImageFormat;
use crate::markdown::{MarkdownOptions, render_markdown};

/// An image embedded in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    content_id: String,
    format: ImageFormat,
    data: Vec<u8>,
    alt: Option<String>,
}

impl ImageBlock {
    /// Creates an image block from raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the Content-ID is empty or contains quotes,
    /// angle brackets or whitespace.
    pub fn new(content_id: impl Into<String>, format: ImageFormat, data: Vec<u8>) -> Result<Self> {
        let content_id = content_id.into();
        if content_id.is_empty()
            || content_id
                .chars()
                .any(|c| c == '"' || c == '<' || c == '>' || c.is_whitespace())
        {
            return Err(Error::InvalidContentId(content_id));
        }

        Ok(Self {
            content_id,
            format,
            data,
            alt: None,
        })
    }

    /// Sets the alternative text.
    #[must_use]
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Returns the Content-ID.
    #[must_use]
    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Returns the image format.
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    fn render(&self) -> String {
        let mut html = format!(
            r#"<div class="block image"><img cid="{}" src="data:image/{};base64,{}""#,
            self.content_id,
            self.format.subtype(),
            STANDARD.encode(&self.data)
        );
        if let Some(alt) = &self.alt {
            let _ = write!(html, r#" alt="{}""#, escape_html(alt));
        }
        html.push_str("></div>");
        html
    }
}

/// A simple table; every cell is escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBlock {
    /// Header cells, rendered in `<thead>` when non-empty.
    pub header: Vec<String>,
    /// Body rows.
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    fn render(&self) -> String {
        let mut html = String::from("<table class=\"block table\">\n");

        if !self.header.is_empty() {
            html.push_str("<thead>\n<tr>");
            for cell in &self.header {
                let _ = write!(html, "<th>{}</th>", escape_html(cell));
            }
            html.push_str("</tr>\n</thead>\n");
        }

        html.push_str("<tbody>\n");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                let _ = write!(html, "<td>{}</td>", escape_html(cell));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>");
        html
    }
}

/// A fragment of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Markdown text.
    Text(String),
    /// HTML inserted as is.
    Html(String),
    /// Inline image.
    Image(ImageBlock),
    /// Table of escaped text cells.
    Table(TableBlock),
}

impl Block {
    /// Creates a Markdown text block.
    #[must_use]
    pub fn text(markdown: impl Into<String>) -> Self {
        Self::Text(markdown.into())
    }

    /// Creates a raw HTML block.
    #[must_use]
    pub fn html(fragment: impl Into<String>) -> Self {
        Self::Html(fragment.into())
    }

    /// Creates an image block.
    ///
    /// # Errors
    ///
    /// Returns an error if the Content-ID is not usable in an `<img>` tag.
    pub fn image(
        content_id: impl Into<String>,
        format: ImageFormat,
        data: Vec<u8>,
    ) -> Result<Self> {
        ImageBlock::new(content_id, format, data).map(Self::Image)
    }

    /// Creates a table block.
    #[must_use]
    pub fn table<H, R, C>(header: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::Table(TableBlock {
            header: header.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        })
    }

    /// Renders the block to HTML.
    #[must_use]
    pub fn render(&self, options: &MarkdownOptions) -> String {
        match self {
            Self::Text(markdown) => format!(
                "<div class=\"block text\">\n{}</div>",
                render_markdown(markdown, options)
            ),
            Self::Html(fragment) => fragment.clone(),
            Self::Image(image) => image.render(),
            Self::Table(table) => table.render(),
        }
    }
}

impl From<ImageBlock> for Block {
    fn from(image: ImageBlock) -> Self {
        Self::Image(image)
    }
}

impl From<TableBlock> for Block {
    fn from(table: TableBlock) -> Self {
        Self::Table(table)
    }
}

/// Header, body or footer content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain Markdown text.
    Text(String),
    /// Precomposed blocks, rendered in order.
    Blocks(Vec<Block>),
}

impl Content {
    /// Renders the content to an HTML fragment.
    #[must_use]
    pub fn render(&self, options: &MarkdownOptions) -> String {
        match self {
            Self::Text(markdown) => render_markdown(markdown, options),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(|block| block.render(options))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Block> for Content {
    fn from(block: Block) -> Self {
        Self::Blocks(vec![block])
    }
}

impl From<Vec<Block>> for Content {
    fn from(blocks: Vec<Block>) -> Self {
        Self::Blocks(blocks)
    }
}

/// Escapes text for use in HTML content and attribute values.
fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
