use kb_core::ContentType;

pub mod help_center;

const TROUBLESHOOTING_WORDS: [&str; 4] = ["error", "trouble", "fail", "fix"];

/// Guesses the kind of article from its title alone.
pub fn classify(title: &str) -> ContentType {
    let lower = title.to_lowercase();
    if TROUBLESHOOTING_WORDS.iter().any(|w| lower.contains(w)) {
        ContentType::Troubleshooting
    } else if title.contains('?') {
        ContentType::Faq
    } else {
        ContentType::HowTo
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use kb_core::{Error, Result};
    use scraper::{ElementRef, Selector};
    use url::Url;

    pub fn selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| Error::Scraping(format!("Invalid selector {}: {}", selector, e)))
    }

    /// Resolves an `href` against the help-center root. Absolute links are kept.
    pub fn join_url(base: &Url, href: &str) -> Result<String> {
        Ok(base.join(href.trim())?.to_string())
    }

    /// All text below `element`, whitespace-collapsed.
    pub fn element_text(element: &ElementRef) -> String {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
        element
            .select(selector)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;
    use url::Url;

    #[test]
    fn test_classify() {
        assert_eq!(classify("Fixing sync errors"), ContentType::Troubleshooting);
        assert_eq!(classify("Upload FAILED"), ContentType::Troubleshooting);
        assert_eq!(classify("Can I export my data?"), ContentType::Faq);
        assert_eq!(classify("Why does login fail?"), ContentType::Troubleshooting);
        assert_eq!(classify("Create your first project"), ContentType::HowTo);
    }

    #[test]
    fn test_join_url() {
        let base = Url::parse("https://help.example.com").unwrap();
        assert_eq!(
            utils::join_url(&base, "/article/12-start").unwrap(),
            "https://help.example.com/article/12-start"
        );
        assert_eq!(
            utils::join_url(&base, "https://other.example.com/x").unwrap(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let document = Html::parse_fragment("<div class=\"t\">  Hello\n <b>world</b>  </div>");
        let div = utils::selector("div.t").unwrap();
        let element = document.select(&div).next().unwrap();
        assert_eq!(utils::element_text(&element), "Hello world");
        assert!(utils::selector("div[").is_err());
    }
}
