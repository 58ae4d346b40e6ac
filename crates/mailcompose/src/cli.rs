//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Compose an HTML email from Markdown or HTML parts.
///
/// Inline data-URI images are rewritten to `cid:` references and can be
/// written out for attachment with `--images-dir`.
#[derive(Debug, Parser)]
#[command(name = "mailcompose", version, about)]
pub struct Args {
    /// Header content file.
    #[arg(long, value_name = "FILE")]
    pub header: Option<PathBuf>,

    /// Body content file (`-` reads stdin).
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,

    /// Footer content file.
    #[arg(long, value_name = "FILE")]
    pub footer: Option<PathBuf>,

    /// Treat part files as precomposed HTML instead of Markdown.
    #[arg(long)]
    pub html: bool,

    /// Append an image to the body, as `CID=PATH` (png or jpeg).
    #[arg(long = "image", value_name = "CID=PATH")]
    pub images: Vec<String>,

    /// Message subject.
    #[arg(long)]
    pub subject: Option<String>,

    /// Layout template overriding the configured one.
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Settings file.
    #[arg(long, value_name = "FILE", env = "MAILCOMPOSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the HTML here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Decode extracted images into this directory as `<cid>.<ext>`.
    #[arg(long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// Print the message as JSON (html, subject, images).
    #[arg(long)]
    pub json: bool,
}
