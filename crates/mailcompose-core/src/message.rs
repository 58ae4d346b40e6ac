//! Composed email message.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::block::Content;
use crate::error::Result;
use crate::inline_image::{InlineImages, rewrite_inline_images};
use crate::markdown::MarkdownOptions;
use crate::template::Template;

/// A composed HTML message, ready for MIME assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<InlineImages>,
}

impl EmailMessage {
    /// Starts building a message.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Wraps already composed HTML, extracting any inline images.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        let (html, images) = rewrite_inline_images(html);
        Self {
            subject: None,
            html: html.into_owned(),
            images,
        }
    }

    /// Returns the subject, if one was set.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the HTML body with `cid:` image references.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Returns the extracted images; `None` when the HTML had none.
    #[must_use]
    pub const fn images(&self) -> Option<&InlineImages> {
        self.images.as_ref()
    }

    /// Returns true if the message has images to attach.
    #[must_use]
    pub const fn has_images(&self) -> bool {
        self.images.is_some()
    }

    /// Splits the message into its HTML body and images.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<InlineImages>) {
        (self.html, self.images)
    }
}

/// Builder for [`EmailMessage`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    subject: Option<String>,
    header: Option<Content>,
    body: Option<Content>,
    footer: Option<Content>,
    template: Option<Template>,
    markdown: MarkdownOptions,
}

impl MessageBuilder {
    /// Creates an empty builder using the default layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the header content.
    #[must_use]
    pub fn header(mut self, header: impl Into<Content>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Sets the body content.
    #[must_use]
    pub fn body(mut self, body: impl Into<Content>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the footer content.
    #[must_use]
    pub fn footer(mut self, footer: impl Into<Content>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Replaces the layout template.
    #[must_use]
    pub fn template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    /// Sets Markdown rendering options.
    #[must_use]
    pub const fn markdown_options(mut self, options: MarkdownOptions) -> Self {
        self.markdown = options;
        self
    }

    /// Renders the parts into the layout and rewrites inline images.
    ///
    /// Missing parts render as empty strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout contains an unknown or malformed
    /// placeholder.
    pub fn build(self) -> Result<EmailMessage> {
        let render = |content: Option<&Content>| {
            content.map_or_else(String::new, |c| c.render(&self.markdown))
        };

        let mut values = HashMap::new();
        values.insert("header", render(self.header.as_ref()));
        values.insert("body", render(self.body.as_ref()));
        values.insert("footer", render(self.footer.as_ref()));

        let template = self.template.unwrap_or_default();
        let composed = template.substitute(&values)?;
        debug!(len = composed.len(), "composed message html");

        let (html, images) = rewrite_inline_images(&composed);
        Ok(EmailMessage {
            subject: self.subject,
            html: html.into_owned(),
            images,
        })
    }
}
