use async_trait::async_trait;
use kb_core::{
    ArticleRecord, ContentType, DeepDive, Enrichment, Gap, InferenceModel, Priority, Result,
    GAP_FALLBACK, TOPICS_FALLBACK,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const SHORT_ARTICLE_WORDS: usize = 150;

/// Offline stand-in for a real model. Answers are derived from the articles
/// themselves, so runs are repeatable.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn topics(article: &ArticleRecord) -> String {
        let words: Vec<&str> = article
            .title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 3)
            .take(4)
            .collect();
        if words.is_empty() {
            TOPICS_FALLBACK.to_string()
        } else {
            words.join(", ")
        }
    }

    fn gap(article: &ArticleRecord) -> String {
        if article.word_count < SHORT_ARTICLE_WORDS {
            "Too short to cover the topic in depth".to_string()
        } else if article.content_type == ContentType::HowTo && !article.has_screenshots {
            "Missing screenshots for the described steps".to_string()
        } else if article.content_type == ContentType::Troubleshooting && !article.text.contains("error") {
            "Missing concrete error messages".to_string()
        } else {
            GAP_FALLBACK.to_string()
        }
    }
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn enrich_batch(&self, batch: &[ArticleRecord]) -> Result<HashMap<String, Enrichment>> {
        Ok(batch
            .iter()
            .map(|article| {
                (
                    article.id.clone(),
                    Enrichment::new(Self::topics(article), Self::gap(article)),
                )
            })
            .collect())
    }

    async fn global_gaps(&self, catalog: &[ArticleRecord], count: usize) -> Result<Vec<Gap>> {
        // Categories with the most article-level gaps come first.
        let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
        for article in catalog {
            let entry = per_category.entry(article.category.as_str()).or_default();
            if article.gap_identified != GAP_FALLBACK && !article.gap_identified.is_empty() {
                *entry += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = per_category.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, (category, gaps))| Gap {
                gap_id: format!("G-{:03}", i + 1),
                category: category.to_string(),
                description: format!("{} article(s) in {} leave user questions open.", gaps, category),
                priority: match gaps {
                    0 => Priority::Low,
                    1..=2 => Priority::Medium,
                    _ => Priority::High,
                },
                suggested_title: format!("The complete guide to {}", category),
                rationale: format!("Consolidates the missing {} documentation in one place.", category),
            })
            .collect())
    }

    async fn deep_dive(&self, gaps: &[Gap], n: usize) -> Result<Vec<DeepDive>> {
        let mut ranked: Vec<&Gap> = gaps.iter().collect();
        ranked.sort_by_key(|gap| gap.priority);

        Ok(ranked
            .into_iter()
            .take(n)
            .map(|gap| DeepDive {
                gap_id: gap.gap_id.clone(),
                selection_rationale: format!("{} priority: {}", gap.priority, gap.rationale),
                article_outline: format!(
                    "Title: {}\nGoal: {}\nSections: Overview, Setup, Common problems\nIntroduction: {}",
                    gap.suggested_title, gap.description, gap.rationale
                ),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, category: &str, title: &str, words: usize) -> ArticleRecord {
        let mut article = ArticleRecord::new(id, format!("https://help.example.com/{}", id), title);
        article.category = category.to_string();
        article.word_count = words;
        article
    }

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        let batch = vec![
            article("KB-1", "Integrations", "Connect Jira Cloud", 40),
            article("KB-2", "Basics", "Why?", 900),
        ];

        let map = model.enrich_batch(&batch).await.unwrap();
        assert_eq!(map["KB-1"].topics, "Connect, Jira, Cloud");
        assert_eq!(map["KB-1"].gap, "Too short to cover the topic in depth");
        assert_eq!(map["KB-2"].topics, TOPICS_FALLBACK);
        assert_eq!(map["KB-2"].gap, "Missing screenshots for the described steps");
    }

    #[tokio::test]
    async fn test_dummy_gaps_are_ranked() {
        let model = DummyModel::new();
        let mut catalog = vec![
            article("KB-1", "Integrations", "Connect Jira", 40),
            article("KB-2", "Integrations", "Connect Slack", 40),
            article("KB-3", "Basics", "Create a project", 400),
        ];
        catalog[0].gap_identified = "Missing scopes".to_string();
        catalog[1].gap_identified = "Missing webhook list".to_string();
        catalog[2].gap_identified = GAP_FALLBACK.to_string();

        let gaps = model.global_gaps(&catalog, 10).await.unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].gap_id, "G-001");
        assert_eq!(gaps[0].category, "Integrations");
        assert_eq!(gaps[0].priority, Priority::Medium);
        assert_eq!(gaps[1].priority, Priority::Low);

        let dives = model.deep_dive(&gaps, 1).await.unwrap();
        assert_eq!(dives.len(), 1);
        assert_eq!(dives[0].gap_id, "G-001");
    }
}
