use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fallback topics for an article the model could not enrich.
pub const TOPICS_FALLBACK: &str = "N/A";
/// Fallback gap for an article the model could not enrich, and the model's own "no gap" answer.
pub const GAP_FALLBACK: &str = "None identified";
/// Freshness marker used when a page does not expose its update time.
pub const UNKNOWN_MARKER: &str = "Unknown";

/// One help-center article as scraped and, once enriched, as persisted.
///
/// `url` is the identity. `id` only drives display order and may differ between
/// two scrapes of the same page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(rename = "article id")]
    pub id: String,
    #[serde(rename = "article name")]
    pub title: String,
    pub category: String,
    pub url: String,
    #[serde(rename = "last updated")]
    pub last_updated: String,
    #[serde(rename = "topics covered", default)]
    pub topics_covered: String,
    #[serde(rename = "content type")]
    pub content_type: ContentType,
    #[serde(rename = "word count")]
    pub word_count: usize,
    #[serde(rename = "has screenshots", with = "yes_no")]
    pub has_screenshots: bool,
    #[serde(rename = "has video", with = "yes_no")]
    pub has_video: bool,
    #[serde(rename = "gaps identified", default)]
    pub gap_identified: String,
    /// Body text handed to the model. Never written to the store.
    #[serde(skip)]
    pub text: String,
}

impl ArticleRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: String::new(),
            url: url.into(),
            last_updated: UNKNOWN_MARKER.to_string(),
            topics_covered: String::new(),
            content_type: ContentType::default(),
            word_count: 0,
            has_screenshots: false,
            has_video: false,
            gap_identified: String::new(),
            text: String::new(),
        }
    }

    /// Integer part of the display id (`KB-12` -> 12). `None` when the id has
    /// no digits or the number does not fit in a `u64`.
    pub fn numeric_id(&self) -> Option<u64> {
        parse_numeric_id(&self.id)
    }

    /// Number of the id as written, without leading zeros (`KB-007` -> `7`).
    pub fn id_digits(&self) -> Option<&str> {
        id_digits(&self.id)
    }

    /// Text before the numeric part of the id, e.g. `KB-`.
    pub fn id_prefix(&self) -> &str {
        let end = self.id.find(|c: char| c.is_ascii_digit()).unwrap_or(self.id.len());
        &self.id[..end]
    }

    pub fn apply(&mut self, enrichment: Enrichment) {
        self.topics_covered = enrichment.topics;
        self.gap_identified = enrichment.gap;
    }

    pub fn is_enriched(&self) -> bool {
        !self.topics_covered.is_empty() && !self.gap_identified.is_empty()
    }
}

/// First run of ASCII digits in an id, leading zeros dropped. Any length.
pub fn id_digits(id: &str) -> Option<&str> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    let len = id[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(id.len() - start);
    let digits = &id[start..start + len];
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { &digits[len - 1..] } else { trimmed })
}

/// First run of ASCII digits in an id, parsed as an integer.
pub fn parse_numeric_id(id: &str) -> Option<u64> {
    id_digits(id)?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "How-to Guide")]
    HowTo,
    #[serde(rename = "Troubleshooting")]
    Troubleshooting,
    #[serde(rename = "FAQ")]
    Faq,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContentType::HowTo => "How-to Guide",
            ContentType::Troubleshooting => "Troubleshooting",
            ContentType::Faq => "FAQ",
        };
        f.write_str(label)
    }
}

/// Topics and gap for one article, as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub topics: String,
    pub gap: String,
}

impl Enrichment {
    pub fn new(topics: impl Into<String>, gap: impl Into<String>) -> Self {
        Self {
            topics: topics.into(),
            gap: gap.into(),
        }
    }

    pub fn fallback() -> Self {
        Self::new(TOPICS_FALLBACK, GAP_FALLBACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

/// A documentation gap spanning the whole help center rather than one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    #[serde(rename = "Gap ID", alias = "gap_id")]
    pub gap_id: String,
    #[serde(rename = "Category", alias = "category")]
    pub category: String,
    #[serde(rename = "Gap Description", alias = "description", alias = "gap_description")]
    pub description: String,
    #[serde(rename = "Priority", alias = "priority")]
    pub priority: Priority,
    #[serde(rename = "Suggested Article Title", alias = "suggested_title", alias = "suggested_article_title")]
    pub suggested_title: String,
    #[serde(rename = "Rationale", alias = "rationale")]
    pub rationale: String,
}

/// Outline for one of the gaps picked as most important.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepDive {
    #[serde(rename = "Gap ID", alias = "gap_id")]
    pub gap_id: String,
    #[serde(rename = "Selection Rationale", alias = "selection_rationale")]
    pub selection_rationale: String,
    #[serde(rename = "Article Outline", alias = "article_outline")]
    pub article_outline: String,
}

/// Spreadsheet-style `Yes`/`No` booleans. Plain JSON booleans are accepted on read.
pub mod yes_no {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Yes" } else { "No" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        struct YesNo;

        impl<'de> Visitor<'de> for YesNo {
            type Value = bool;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"Yes\", \"No\" or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
                Ok(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
                match v.trim().to_ascii_lowercase().as_str() {
                    "yes" | "true" => Ok(true),
                    "no" | "false" | "" => Ok(false),
                    other => Err(E::custom(format!("expected Yes/No, got {:?}", other))),
                }
            }
        }

        deserializer.deserialize_any(YesNo)
    }
}
