//! `mailcompose` - compose HTML emails from the command line
//!
//! Reads header, body and footer parts, renders them into the layout and
//! writes the HTML with inline images turned into `cid:` references.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use mailcompose_core::{Block, ComposeSettings, EmailMessage, ImageFormat, InlineImage, Template};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => ComposeSettings::load_from(path),
        None => ComposeSettings::load(),
    }
    .context("Failed to load settings")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let message = compose(&args, &settings)?;
    info!(
        images = message.images().map_or(0, |images| images.len()),
        "Composed message"
    );

    if let Some(dir) = &args.images_dir {
        write_images(&message, dir)?;
    }

    let output = if args.json {
        serde_json::to_string_pretty(&message).context("Failed to serialize message")?
    } else {
        message.html().to_string()
    };

    match &args.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Builds the message described by the arguments.
fn compose(args: &Args, settings: &ComposeSettings) -> Result<EmailMessage> {
    let template = match &args.template {
        Some(path) => Template::load(path),
        None => settings.template(),
    }
    .context("Failed to load template")?;

    let mut builder = EmailMessage::builder()
        .template(template)
        .markdown_options(settings.markdown);

    if let Some(subject) = &args.subject {
        builder = builder.subject(subject);
    }
    if let Some(path) = &args.header {
        builder = builder.header(load_part(path, args.html)?);
    }

    let mut body = match &args.body {
        Some(path) => vec![load_part(path, args.html)?],
        None => Vec::new(),
    };
    for spec in &args.images {
        body.push(load_image(spec)?);
    }
    if !body.is_empty() {
        builder = builder.body(body);
    }

    if let Some(path) = &args.footer {
        builder = builder.footer(load_part(path, args.html)?);
    }

    builder.build().context("Failed to compose message")
}

/// Reads a part file as a Markdown or HTML block.
fn load_part(path: &Path, html: bool) -> Result<Block> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    Ok(if html {
        Block::html(text)
    } else {
        Block::text(text)
    })
}

/// Splits a `CID=PATH` image argument.
fn parse_image_spec(spec: &str) -> Result<(&str, PathBuf, ImageFormat)> {
    let Some((cid, path)) = spec.split_once('=') else {
        bail!("Image must be given as CID=PATH, got {spec:?}");
    };

    let path = PathBuf::from(path);
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .with_context(|| format!("Unsupported image type: {}", path.display()))?;

    Ok((cid, path, format))
}

/// Reads an image argument into an image block.
fn load_image(spec: &str) -> Result<Block> {
    let (cid, path, format) = parse_image_spec(spec)?;
    let data =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Block::image(cid, format, data).with_context(|| format!("Invalid image argument {spec:?}"))
}

/// Names the file an image is written to, `<cid>.<ext>`.
///
/// The Content-ID comes from the message HTML, so it must be a single plain
/// path component.
fn image_file_name(image: &InlineImage) -> Result<String> {
    let cid = image.content_id.as_str();
    if cid.contains(['/', '\\']) || Path::new(cid).file_name() != Some(OsStr::new(cid)) {
        bail!("Content id `{cid}` cannot be used as a file name");
    }
    Ok(format!("{cid}.{}", image.format.extension()))
}

/// Decodes every extracted image into `dir`.
fn write_images(message: &EmailMessage, dir: &Path) -> Result<()> {
    let Some(images) = message.images() else {
        return Ok(());
    };

    let names = images
        .iter()
        .map(image_file_name)
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (image, name) in images.iter().zip(names) {
        let bytes = image
            .decode()
            .with_context(|| format!("Image {} is not valid base64", image.content_id))?;
        let path = dir.join(name);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} ({})", path.display(), image.format);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["mailcompose"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_parse_image_spec() {
        let (cid, path, format) = parse_image_spec("logo=assets/logo.PNG").unwrap();
        assert_eq!(cid, "logo");
        assert_eq!(path, PathBuf::from("assets/logo.PNG"));
        assert_eq!(format, ImageFormat::Png);

        assert!(parse_image_spec("no-separator.png").is_err());
        assert!(parse_image_spec("anim=spinner.gif").is_err());
    }

    #[test]
    fn test_compose_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let body = dir.path().join("body.md");
        let footer = dir.path().join("footer.md");
        let image = dir.path().join("dot.png");
        std::fs::write(&body, "Hello **there**").unwrap();
        std::fs::write(&footer, "Bye").unwrap();
        std::fs::write(&image, b"PNG").unwrap();

        let body_arg = body.to_str().unwrap();
        let footer_arg = footer.to_str().unwrap();
        let image_arg = format!("dot={}", image.display());
        let args = args(&[
            "--body",
            body_arg,
            "--footer",
            footer_arg,
            "--image",
            &image_arg,
            "--subject",
            "Hi",
        ]);

        let message = compose(&args, &ComposeSettings::default()).unwrap();
        assert_eq!(message.subject(), Some("Hi"));
        assert!(message.html().contains("<strong>there</strong>"));
        assert!(message.html().contains(r#"<img src="cid:dot">"#));
        assert_eq!(
            message.images().unwrap().get("dot").unwrap().decode().unwrap(),
            b"PNG"
        );

        let out = dir.path().join("images");
        write_images(&message, &out).unwrap();
        assert_eq!(std::fs::read(out.join("dot.png")).unwrap(), b"PNG");
    }

    #[test]
    fn test_compose_html_parts() {
        let dir = tempfile::tempdir().unwrap();
        let body = dir.path().join("body.html");
        let template = dir.path().join("layout.html");
        std::fs::write(&body, "<p>*not markdown*</p>").unwrap();
        std::fs::write(&template, "{{ body }}").unwrap();

        let args = args(&[
            "--html",
            "--body",
            body.to_str().unwrap(),
            "--template",
            template.to_str().unwrap(),
        ]);

        let message = compose(&args, &ComposeSettings::default()).unwrap();
        assert_eq!(message.html(), "<p>*not markdown*</p>");
        assert!(message.images().is_none());
    }

    #[test]
    fn test_write_images_rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("images");

        for cid in ["../escaped", "/tmp/escaped", "nested/escaped", "..", "back\\slash"] {
            let html = format!(r#"<img cid="{cid}" src="data:image/png;base64,SGVsbG8=">"#);
            let message = EmailMessage::from_html(&html);
            assert!(message.has_images(), "{cid}");

            let err = write_images(&message, &out).unwrap_err();
            assert!(err.to_string().contains(cid), "{cid}: {err}");
        }

        assert!(!dir.path().join("escaped.png").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_write_images_without_images_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never-created");
        let message = EmailMessage::from_html("<p>text</p>");
        write_images(&message, &out).unwrap();
        assert!(!out.exists());
    }
}
