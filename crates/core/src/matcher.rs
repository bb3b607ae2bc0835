//! Article URL recognition.
//!
//! Article pages live at `https://<host>/<category path>/YYYY/MM/DD/<slug>[?query]`.
//! Anything else is not an article: it is filtered out before any request is
//! made, which is not an error.

use std::path::PathBuf;

use regex::Regex;

/// Routing fields of a recognised article URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRoute {
    /// Category path with its trailing separator, e.g. `business/` or `united-states/briefing/`.
    pub category: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub slug: String,
}

impl ArticleRoute {
    /// `{slug}_{year}-{month}-{day}.pdf`
    pub fn filename(&self) -> String {
        format!("{}_{}.pdf", self.slug, self.date())
    }

    /// `YYYY-MM-DD`
    pub fn date(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }

    /// Output path relative to the base directory: category path plus file name.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.category.split('/').filter(|s| !s.is_empty()).collect();
        path.push(self.filename());
        path
    }

    /// Relative path with `/` separators, for display after a URL prefix.
    pub fn display_path(&self) -> String {
        format!("{}{}", self.category, self.filename())
    }
}

/// Matches article URLs of one publication host.
#[derive(Debug, Clone)]
pub struct ArticleMatcher {
    pattern: Regex,
}

impl ArticleMatcher {
    pub fn new(host: &str) -> Self {
        let pattern = format!(
            r"^https://{}/((?:[^/?#]+/)+?)(\d{{4}})/(\d{{2}})/(\d{{2}})/([^/?#]+)(?:\?[^#]*)?$",
            regex::escape(host)
        );
        // host is escaped, the pattern always compiles
        let pattern = Regex::new(&pattern).expect("article URL pattern");
        Self { pattern }
    }

    /// Returns the routing fields, or `None` when `url` is not an article.
    pub fn route(&self, url: &str) -> Option<ArticleRoute> {
        let caps = self.pattern.captures(url.trim())?;
        // dot segments would move the output outside the base directory
        if caps[1].split('/').any(|segment| segment == "." || segment == "..") {
            return None;
        }
        Some(ArticleRoute {
            category: caps[1].to_string(),
            year: caps[2].to_string(),
            month: caps[3].to_string(),
            day: caps[4].to_string(),
            slug: caps[5].to_string(),
        })
    }

    pub fn is_article(&self, url: &str) -> bool {
        self.route(url).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matcher() -> ArticleMatcher {
        ArticleMatcher::new("www.economist.com")
    }

    #[test]
    fn test_route_with_query() {
        let route = matcher()
            .route("https://www.economist.com/business/2024/05/01/example-slug?utm=1")
            .unwrap();

        assert_eq!(route.category, "business/");
        assert_eq!(route.year, "2024");
        assert_eq!(route.month, "05");
        assert_eq!(route.day, "01");
        assert_eq!(route.slug, "example-slug");
        assert_eq!(route.filename(), "example-slug_2024-05-01.pdf");
        assert_eq!(route.display_path(), "business/example-slug_2024-05-01.pdf");
        assert_eq!(route.relative_path(), PathBuf::from("business").join("example-slug_2024-05-01.pdf"));
    }

    #[test]
    fn test_nested_category() {
        let route = matcher()
            .route("https://www.economist.com/united-states/briefing/2023/11/30/the-long-read")
            .unwrap();
        assert_eq!(route.category, "united-states/briefing/");
        assert_eq!(route.slug, "the-long-read");
    }

    #[rstest]
    #[case("https://www.economist.com/business/2024/05/01/example-slug")]
    #[case("https://www.economist.com/leaders/1999/12/31/y2k?ref=home&x=1")]
    #[case("https://www.economist.com/a/b/c/2020/02/29/leap")]
    fn test_reassembly_preserves_date_and_slug(#[case] url: &str) {
        let route = matcher().route(url).unwrap();
        let rebuilt = format!(
            "https://www.economist.com/{}{}/{}/{}/{}",
            route.category, route.year, route.month, route.day, route.slug
        );
        assert!(url.starts_with(&rebuilt), "{rebuilt} is not a prefix of {url}");
    }

    #[rstest]
    #[case("http://www.economist.com/business/2024/05/01/example-slug")]
    #[case("https://economist.com/business/2024/05/01/example-slug")]
    #[case("https://www.economist.com.evil.net/business/2024/05/01/example-slug")]
    #[case("https://www.economist.com/business/2024/05/example-slug")]
    #[case("https://www.economist.com/2024/05/01/example-slug")]
    #[case("https://www.economist.com/business/24/05/01/example-slug")]
    #[case("https://www.economist.com/business/2024/05/01/")]
    #[case("https://www.economist.com/business/2024/05/01/slug/extra")]
    #[case("https://www.economist.com/../2024/05/01/evil")]
    #[case("https://www.economist.com/business/../../2024/05/01/evil")]
    #[case("https://www.economist.com/./2024/05/01/evil")]
    #[case("")]
    #[case("not a url")]
    fn test_not_an_article(#[case] url: &str) {
        assert!(!matcher().is_article(url));
    }
}
