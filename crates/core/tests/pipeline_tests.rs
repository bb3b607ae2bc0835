//! End-to-end conversion of in-memory pages, no network.
use std::path::Path;

use broadsheet_core::render::writer::decode_text_string;
use broadsheet_core::*;
use lopdf::{Document as PdfDocument, Object};

const URL: &str = "https://www.economist.com/business/2024/05/01/example-slug?utm=1";
const THUMBNAIL: &str = "https://cdn.example.com/t.png";

const ARTICLE_JSON: &str = r#"{"headline":"Title","description":"Desc","articleBody":"line1\nline2■tail","author":{"name":"A"},"creator":{"name":"C"},"publisher":{"name":"P"},"datePublished":"2024-05-01T10:00:00Z","inLanguage":"en","keywords":"k1,k2","articleSection":"Business","url":"https://www.economist.com/business/2024/05/01/example-slug","thumbnailUrl":"https://cdn.example.com/t.png"}"#;

fn raw_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><script type="application/ld+json">{ARTICLE_JSON}</script></head>
<body><h1>Title</h1><h2><span>Business</span> | <!-- -->Why widgets matter</h2>
<audio src="/media/example-slug.mp3" title="Listen to this story"></audio></body></html>"#
    )
}

fn thumbnail_store() -> ImageStore {
    let img = image::RgbImage::from_pixel(16, 9, image::Rgb([30, 60, 90]));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();

    let mut store = ImageStore::new();
    store.insert(THUMBNAIL, LoadedImage::decode(THUMBNAIL, png.get_ref()).unwrap());
    store
}

fn converter(dir: &Path, text_only: bool) -> Converter {
    let config = Config::builder()
        .output_dir(dir)
        .text_only(text_only)
        .url_prefix("https://files.example.org/")
        .asset_dir(None)
        .build();
    Converter::new(config).unwrap()
}

fn info_string(doc: &PdfDocument, key: &[u8]) -> Option<String> {
    let id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    match doc.get_object(id).ok()?.as_dict().ok()?.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

#[test]
fn test_example_article_converts() {
    let tmp = tempfile::TempDir::new().unwrap();
    let outcome = converter(tmp.path(), false).convert_page(URL, &raw_page(), &thumbnail_store());

    let Outcome::Converted { path, display } = outcome else {
        panic!("expected conversion, got {outcome:?}");
    };
    assert_eq!(path, tmp.path().join("business").join("example-slug_2024-05-01.pdf"));
    assert_eq!(display, "https://files.example.org/business/example-slug_2024-05-01.pdf");

    let doc = PdfDocument::load(&path).unwrap();
    assert!(!doc.get_pages().is_empty());
    assert_eq!(info_string(&doc, b"Title").as_deref(), Some("Title"));
    assert_eq!(info_string(&doc, b"Author").as_deref(), Some("A"));
    assert_eq!(info_string(&doc, b"Creator").as_deref(), Some("C"));
    assert_eq!(info_string(&doc, b"Keywords").as_deref(), Some("k1, k2"));
    assert_eq!(info_string(&doc, b"Subject").as_deref(), Some("Business"));
    assert!(info_string(&doc, b"Producer").unwrap().starts_with("broadsheet "));
}

#[test]
fn test_rendered_text_stops_at_end_marker() {
    let page = extract_page(&raw_page()).unwrap();
    let article = normalize(&page.content, false).unwrap();
    let html = compose(&article, false);

    let job = RenderJob {
        output: std::env::temp_dir().join("unused.pdf"),
        html,
        info: render::DocumentInfo {
            title: article.ascii_title.clone(),
            author: article.author.clone(),
            creator: article.creator.clone(),
            producer: PRODUCER.to_string(),
            created: article.published,
            language: article.language.clone(),
            keywords: article.keywords.clone(),
            subject: article.section.clone(),
        },
        text_only: false,
        masthead: render::Masthead {
            section: article.section.clone(),
            subheadline: page.subheadline.clone(),
            article_url: article.webpage.clone(),
        },
        audio: page.audio.clone(),
        images: thumbnail_store(),
    };

    let renderer = Renderer::new(FontSet::standard(), ImageStore::new(), Publication::economist());
    let (header, footer) = renderer.decorations(&job);
    let pages = renderer.layout(&job, &header, &footer);
    let text: String = pages.iter().map(|p| p.text()).collect::<Vec<_>>().join("\n");

    assert!(text.contains("line1"));
    assert!(text.contains("line2"));
    assert!(!text.contains("tail"));
    assert!(text.contains("Business | Why widgets matter"));
    assert!(text.contains("May 01 2024, 10:00 AM"));
    assert_eq!(pages.iter().map(|p| p.image_count()).sum::<usize>(), 1);
}

#[test]
fn test_text_only_variant() {
    let tmp = tempfile::TempDir::new().unwrap();
    // no thumbnail is supplied: text-only mode must not ask for one
    let outcome = converter(tmp.path(), true).convert_page(URL, &raw_page(), &ImageStore::new());

    let Outcome::Converted { path, .. } = outcome else {
        panic!("expected conversion, got {outcome:?}");
    };
    let doc = PdfDocument::load(&path).unwrap();
    assert_eq!(info_string(&doc, b"Title").as_deref(), Some("Title (Text Only)"));
}

#[test]
fn test_missing_thumbnail_fails_only_that_url() {
    let tmp = tempfile::TempDir::new().unwrap();
    let outcome = converter(tmp.path(), false).convert_page(URL, &raw_page(), &ImageStore::new());

    let Outcome::Failed { error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.stage(), Stage::Render);
    assert!(!tmp.path().join("business").join("example-slug_2024-05-01.pdf").exists());
}

#[test]
fn test_rerun_overwrites() {
    let tmp = tempfile::TempDir::new().unwrap();
    let converter = converter(tmp.path(), false);

    for _ in 0..2 {
        let outcome = converter.convert_page(URL, &raw_page(), &thumbnail_store());
        assert!(matches!(outcome, Outcome::Converted { .. }), "{outcome:?}");
    }
    let entries: Vec<_> = std::fs::read_dir(tmp.path().join("business")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_non_article_lines_have_no_side_effects() {
    let tmp = tempfile::TempDir::new().unwrap();
    let converter = converter(tmp.path(), false);

    for url in [
        "http://www.economist.com/business/2024/05/01/example-slug",
        "https://example.com/business/2024/05/01/example-slug",
        "https://www.economist.com/business/example-slug",
        "not a url",
    ] {
        assert!(matches!(converter.convert_page(url, &raw_page(), &thumbnail_store()), Outcome::NotAnArticle));
    }
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_dot_segments_cannot_leave_base_dir() {
    let tmp = tempfile::TempDir::new().unwrap();
    let base = tmp.path().join("out");
    let converter = converter(&base, false);

    for url in [
        "https://www.economist.com/../2024/05/01/evil",
        "https://www.economist.com/business/../../2024/05/01/evil",
    ] {
        assert!(matches!(converter.convert_page(url, &raw_page(), &thumbnail_store()), Outcome::NotAnArticle), "{url}");
    }
    assert!(!base.exists());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_date_failure_is_normalize_stage() {
    let tmp = tempfile::TempDir::new().unwrap();
    let raw = raw_page().replace("2024-05-01T10:00:00Z", "yesterday");
    let outcome = converter(tmp.path(), true).convert_page(URL, &raw, &ImageStore::new());

    let Outcome::Failed { error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.stage(), Stage::Normalize);
}
