//! End-to-end composition tests.
//!
//! These build full messages through the public API and check the HTML and
//! extracted images a MIME layer would receive.

use mailcompose_core::{
    Block, ComposeSettings, EmailMessage, Error, ImageFormat, MarkdownOptions, Template,
    has_inline_images, rewrite_inline_images,
};

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const JPEG_HEADER: &[u8] = &[0xff, 0xd8, 0xff, 0xe0];

#[test]
fn test_full_message_with_images_in_every_part() {
    let message = EmailMessage::builder()
        .subject("Status")
        .header(vec![Block::image("logo", ImageFormat::Png, PNG_HEADER.to_vec()).unwrap()])
        .body(vec![
            Block::text("## Summary\n\nEverything is ~~broken~~ fixed."),
            Block::table(["Service", "State"], [["api", "up"], ["db", "up"]]),
            Block::image("graph", ImageFormat::Jpeg, JPEG_HEADER.to_vec()).unwrap(),
        ])
        .footer("Questions? Reply to this email.")
        .build()
        .unwrap();

    let html = message.html();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(!has_inline_images(html));
    assert!(!html.contains("data:image"));

    let logo = html.find(r#"<img src="cid:logo">"#).unwrap();
    let graph = html.find(r#"<img src="cid:graph">"#).unwrap();
    assert!(logo < graph);
    assert!(html.contains("<h2>Summary</h2>"));
    assert!(html.contains("<del>broken</del>"));
    assert!(html.contains("<td>api</td><td>up</td>"));
    assert!(html.contains("<p>Questions? Reply to this email.</p>"));

    let images = message.images().unwrap();
    let ids: Vec<&str> = images.iter().map(|i| i.content_id.as_str()).collect();
    assert_eq!(ids, vec!["logo", "graph"]);
    assert_eq!(images.get("logo").unwrap().decode().unwrap(), PNG_HEADER);
    assert_eq!(images.get("graph").unwrap().format.mime_type(), "image/jpeg");
}

#[test]
fn test_message_without_images_has_no_collection() {
    let message = EmailMessage::builder()
        .header("Hello")
        .body("No pictures here, just a [link](https://example.com).")
        .build()
        .unwrap();

    assert!(message.images().is_none());
    assert!(message.html().contains(r#"<a href="https://example.com">link</a>"#));
}

#[test]
fn test_image_in_markdown_text_survives_rendering() {
    let message = EmailMessage::builder()
        .template(Template::new("{{ body }}"))
        .body("Intro\n\n<img cid=\"inline\" src=\"data:image/png;base64,AAAA\">\n\nOutro")
        .build()
        .unwrap();

    assert!(message.html().contains(r#"<img src="cid:inline">"#));
    assert_eq!(message.images().unwrap().get("inline").unwrap().data, "AAAA");
}

#[test]
fn test_raw_html_disabled_drops_inline_images() {
    let message = EmailMessage::builder()
        .template(Template::new("{{ body }}"))
        .markdown_options(MarkdownOptions {
            allow_html: false,
            ..MarkdownOptions::default()
        })
        .body("<img cid=\"inline\" src=\"data:image/png;base64,AAAA\">")
        .build()
        .unwrap();

    assert!(message.images().is_none());
}

#[test]
fn test_duplicate_content_ids_across_parts() {
    let message = EmailMessage::builder()
        .template(Template::new("{{ header }}|{{ footer }}"))
        .header(vec![Block::image("dup", ImageFormat::Png, b"first".to_vec()).unwrap()])
        .footer(vec![Block::image("dup", ImageFormat::Png, b"second".to_vec()).unwrap()])
        .build()
        .unwrap();

    assert_eq!(message.html().matches(r#"<img src="cid:dup">"#).count(), 2);
    let images = message.images().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images.get("dup").unwrap().decode().unwrap(), b"second");
}

#[test]
fn test_custom_template_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let layout = dir.path().join("layout.html");
    std::fs::write(&layout, "<body>{{ body }}<hr>{{ footer }}</body>").unwrap();

    let settings_path = dir.path().join("settings.json");
    std::fs::write(
        &settings_path,
        serde_json::json!({ "template": layout }).to_string(),
    )
    .unwrap();

    let settings = ComposeSettings::load_from(&settings_path).unwrap();
    let message = EmailMessage::builder()
        .template(settings.template().unwrap())
        .markdown_options(settings.markdown)
        .body("Hi")
        .footer("Bye")
        .build()
        .unwrap();

    assert_eq!(message.html(), "<body><p>Hi</p>\n<hr><p>Bye</p>\n</body>");
}

#[test]
fn test_unknown_placeholder_reported() {
    let err = EmailMessage::builder()
        .template(Template::new("<p>{{ body }}</p><p>{{ unsubscribe }}</p>"))
        .body("Hello")
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::UnknownPlaceholder { .. }));
    assert!(err.to_string().contains("unsubscribe"));
}

#[test]
fn test_rewrite_output_is_stable() {
    let html = concat!(
        r#"<p><img cid="a" src="data:image/png;base64,AAAA"></p>"#,
        r#"<p><img cid="b" src="data:image/gif;base64,R0lG"></p>"#,
    );
    let (once, images) = rewrite_inline_images(html);
    assert_eq!(images.unwrap().len(), 1);

    let (twice, again) = rewrite_inline_images(&once);
    assert_eq!(once, twice);
    assert!(again.is_none());
    assert!(twice.contains("data:image/gif"));
}
