#![allow(dead_code)]

use async_trait::async_trait;
use kb_core::{
    ArticleRecord, ArticleSource, DeepDive, Enrichment, Error, Gap, InferenceModel, Priority, Result,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn article(n: u64, marker: &str) -> ArticleRecord {
    let mut record = ArticleRecord::new(
        format!("KB-{}", n),
        format!("https://help.example.com/article/{}", n),
        format!("Article {}", n),
    );
    record.category = "Basics".to_string();
    record.last_updated = marker.to_string();
    record.word_count = 100 + n as usize;
    record.text = format!("Body of article {}", n);
    record
}

pub fn urls(records: &[ArticleRecord]) -> Vec<String> {
    records.iter().map(|r| r.url.clone()).collect()
}

pub fn assert_unique_urls(records: &[ArticleRecord]) {
    let unique: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(unique.len(), records.len(), "duplicate url in {:?}", urls(records));
}

/// Source that returns whatever snapshot the test set last.
#[derive(Default)]
pub struct StaticSource {
    snapshot: Mutex<Vec<ArticleRecord>>,
    pub fail: Mutex<bool>,
}

impl StaticSource {
    pub fn new(snapshot: Vec<ArticleRecord>) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            fail: Mutex::new(false),
        }
    }

    pub fn set(&self, snapshot: Vec<ArticleRecord>) {
        *self.snapshot.lock().unwrap() = snapshot;
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    fn name(&self) -> &str {
        "help.example.com"
    }

    async fn fetch_all(&self) -> Result<Vec<ArticleRecord>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Scraping("help center unreachable".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

/// Model whose answers reveal what it was given. Batch calls listed in
/// `fail_batches` (0-based, counted over the model's lifetime) fail.
#[derive(Default)]
pub struct ScriptedModel {
    pub batch_calls: AtomicUsize,
    pub enriched_ids: Mutex<Vec<String>>,
    pub fail_batches: Vec<usize>,
    pub fail_gaps: bool,
    pub fail_deep_dive: bool,
}

impl ScriptedModel {
    pub fn failing(fail_batches: Vec<usize>) -> Self {
        Self {
            fail_batches,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

pub fn fresh_topics(record: &ArticleRecord) -> String {
    format!("fresh:{}:{}", record.title, record.last_updated)
}

#[async_trait]
impl InferenceModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn enrich_batch(&self, batch: &[ArticleRecord]) -> Result<HashMap<String, Enrichment>> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches.contains(&call) {
            return Err(Error::Inference("malformed JSON".to_string()));
        }
        self.enriched_ids
            .lock()
            .unwrap()
            .extend(batch.iter().map(|r| r.id.clone()));
        Ok(batch
            .iter()
            .map(|r| (r.id.clone(), Enrichment::new(fresh_topics(r), format!("gap in {}", r.title))))
            .collect())
    }

    async fn global_gaps(&self, catalog: &[ArticleRecord], count: usize) -> Result<Vec<Gap>> {
        if self.fail_gaps {
            return Err(Error::Inference("quota exceeded".to_string()));
        }
        Ok((1..=count)
            .map(|i| Gap {
                gap_id: format!("G-{:03}", i),
                category: "Onboarding".to_string(),
                description: format!("Gap {} across {} articles", i, catalog.len()),
                priority: if i <= 3 { Priority::High } else { Priority::Low },
                suggested_title: format!("Guide {}", i),
                rationale: "Users get stuck".to_string(),
            })
            .collect())
    }

    async fn deep_dive(&self, gaps: &[Gap], n: usize) -> Result<Vec<DeepDive>> {
        if self.fail_deep_dive {
            return Err(Error::Inference("timeout".to_string()));
        }
        Ok(gaps
            .iter()
            .take(n)
            .map(|gap| DeepDive {
                gap_id: gap.gap_id.clone(),
                selection_rationale: "Highest impact".to_string(),
                article_outline: format!("# {}", gap.suggested_title),
            })
            .collect())
    }
}
