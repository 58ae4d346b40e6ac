//! Markdown rendering.
//!
//! Parsing is delegated to `comrak`; this module only maps our options onto
//! its extension and render flags.

use comrak::{Options, markdown_to_html};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Options controlling Markdown to HTML rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)] // Mirrors comrak's flag set
pub struct MarkdownOptions {
    /// GitHub-style tables.
    pub tables: bool,
    /// `~~strikethrough~~`.
    pub strikethrough: bool,
    /// Bare URLs become links.
    pub autolink: bool,
    /// `- [ ]` task list items.
    pub tasklist: bool,
    /// `^superscript^`.
    pub superscript: bool,
    /// Single newlines render as `<br />`.
    pub hard_breaks: bool,
    /// Raw HTML in the source is passed through instead of being omitted.
    pub allow_html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            superscript: true,
            hard_breaks: false,
            allow_html: true,
        }
    }
}

impl MarkdownOptions {
    fn to_comrak(self) -> Options<'static> {
        let mut options = Options::default();
        options.extension.table = self.tables;
        options.extension.strikethrough = self.strikethrough;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.superscript = self.superscript;
        options.render.hardbreaks = self.hard_breaks;
        options.render.unsafe_ = self.allow_html;
        options
    }
}

/// Renders Markdown text to an HTML fragment.
#[must_use]
pub fn render_markdown(text: &str, options: &MarkdownOptions) -> String {
    trace!(len = text.len(), "rendering markdown");
    markdown_to_html(text, &options.to_comrak())
}
