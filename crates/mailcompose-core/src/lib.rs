//! # mailcompose-core
//!
//! HTML email composition with inline image to Content-ID rewriting.
//!
//! ## Features
//!
//! - **Blocks**: Markdown text, raw HTML, inline images and tables
//! - **Markdown**: CommonMark + GFM extensions via `comrak`
//! - **Layout**: fixed HTML template with `header`, `body`, `footer` slots
//! - **Inline images**: data-URI `<img>` tags rewritten to `cid:` references,
//!   payloads collected for attachment
//!
//! ## Quick Start
//!
//! ### Composing a Message
//!
//! ```ignore
//! use mailcompose_core::{Block, EmailMessage, ImageFormat};
//!
//! let message = EmailMessage::builder()
//!     .subject("Weekly report")
//!     .header("# Weekly report")
//!     .body(vec![
//!         Block::text("Numbers are **up**."),
//!         Block::image("chart", ImageFormat::Png, chart_png)?,
//!     ])
//!     .footer("_Sent by the reporting job_")
//!     .build()?;
//!
//! assert!(message.html().contains(r#"<img src="cid:chart">"#));
//! for image in message.images().into_iter().flatten() {
//!     println!("attach {} as {}", image.content_id, image.format.mime_type());
//! }
//! ```
//!
//! ### Rewriting Existing HTML
//!
//! ```ignore
//! use mailcompose_core::rewrite_inline_images;
//!
//! let html = r#"<img cid="logo" src="data:image/png;base64,AAAA">"#;
//! let (html, images) = rewrite_inline_images(html);
//!
//! assert_eq!(html, r#"<img src="cid:logo">"#);
//! assert_eq!(images.unwrap().get("logo").unwrap().data, "AAAA");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod block;
mod error;
mod inline_image;
mod markdown;
mod message;
mod settings;
mod template;

pub use block::{Block, Content, ImageBlock, TableBlock};
pub use error::{Error, Result};
pub use inline_image::{
    ImageFormat, InlineImage, InlineImages, has_inline_images, rewrite_inline_images,
};
pub use markdown::{MarkdownOptions, render_markdown};
pub use message::{EmailMessage, MessageBuilder};
pub use settings::{CONFIG_ENV, ComposeSettings};
pub use template::Template;
