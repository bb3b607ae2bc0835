//! Markup composition.
//!
//! Builds the HTML fragment handed to the renderer. Only the small tag
//! vocabulary understood by [`crate::render::markup`] is emitted.

use crate::normalize::NormalizedArticle;
use crate::render::USABLE_WIDTH;

/// Face name the renderer maps to the italic font program.
pub const ITALIC_FACE: &str = "italic";

const DESCRIPTION_SIZE: u32 = 16;
const BODY_LINE_HEIGHT: &str = "1.5";
const LINK_COLOR: &str = "#0000ff";

/// Composes the article fragment.
///
/// Element order: headline, description, publish date, webpage link and
/// thumbnail (both skipped in text-only mode), then one paragraph per body line.
pub fn compose(article: &NormalizedArticle, text_only: bool) -> String {
    let mut html = String::new();

    html.push_str(&format!("<h1>{}</h1>", escape_html(&article.headline)));
    html.push_str(&format!(
        r#"<font face="{ITALIC_FACE}" size={DESCRIPTION_SIZE}><p line-height=2>{}</p></font>"#,
        escape_html(&article.description)
    ));
    html.push_str(&format!("<p align=R>{}</p>", escape_html(&article.display_date())));

    if !text_only {
        if let Some(webpage) = &article.webpage {
            html.push_str(&format!(
                r#"<p align=R><font color={LINK_COLOR}><u><a href="{}">Webpage</a></u></font></p>"#,
                escape_attr(webpage)
            ));
        }
        if let Some(thumbnail) = &article.thumbnail {
            html.push_str(&format!(
                r#"<img src="{}" width={}>"#,
                escape_attr(thumbnail),
                USABLE_WIDTH.floor() as u32
            ));
        }
    }

    for paragraph in &article.paragraphs {
        html.push_str(&format!(
            "<p line-height={BODY_LINE_HEIGHT}>{}</p>",
            escape_html(paragraph)
        ));
    }

    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_html(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_timestamp;

    fn article() -> NormalizedArticle {
        NormalizedArticle {
            headline: "Title".to_string(),
            ascii_title: "Title".to_string(),
            description: "Desc".to_string(),
            published: parse_timestamp("2024-05-01T22:05:00Z").unwrap(),
            paragraphs: vec!["line1".to_string(), String::new(), "line2".to_string()],
            author: "A".to_string(),
            creator: "C".to_string(),
            publisher: "P".to_string(),
            language: "en".to_string(),
            keywords: "k1, k2".to_string(),
            section: "Business".to_string(),
            webpage: Some("https://www.economist.com/business/2024/05/01/example-slug".to_string()),
            thumbnail: Some("https://cdn.example.com/t.png".to_string()),
        }
    }

    #[test]
    fn test_element_order() {
        let html = compose(&article(), false);

        let positions: Vec<usize> = ["<h1>Title", "Desc", "May 01 2024, 10:05 PM", "Webpage", "<img", "line1", "line2"]
            .iter()
            .map(|needle| html.find(needle).unwrap_or_else(|| panic!("{needle} missing from {html}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{html}");
    }

    #[test]
    fn test_one_image_unless_text_only() {
        assert_eq!(compose(&article(), false).matches("<img").count(), 1);

        let text_only = compose(&article(), true);
        assert_eq!(text_only.matches("<img").count(), 0);
        assert!(!text_only.contains("Webpage"));
    }

    #[test]
    fn test_no_image_without_thumbnail() {
        let mut article = article();
        article.thumbnail = None;
        assert_eq!(compose(&article, false).matches("<img").count(), 0);
    }

    #[test]
    fn test_paragraphs_are_independent_and_empty_ones_kept() {
        let html = compose(&article(), true);
        assert_eq!(html.matches("<p line-height=1.5>").count(), 3);
        assert!(html.contains("<p line-height=1.5></p>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut article = article();
        article.headline = "Bread & <butter>".to_string();
        let html = compose(&article, true);
        assert!(html.contains("<h1>Bread &amp; &lt;butter&gt;</h1>"));
    }
}
