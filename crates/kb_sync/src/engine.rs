//! Incremental synchronization of a fresh scrape against the stored catalog.
//!
//! Articles are matched by url. A stored article whose `last updated` marker
//! is unchanged keeps its enrichment; new and modified articles are re-enriched
//! and replace or join the stored rows. Stored articles missing from the scrape
//! are kept. The result is ordered by the number in the article id.

use kb_core::{ArticleRecord, Enrichment, InferenceModel};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Stored articles no longer in the scrape.
    pub retained: usize,
    pub enriched: usize,
    pub enrichment_fallbacks: usize,
    pub failed_batches: usize,
    pub id_reassignments: usize,
}

impl SyncStats {
    pub fn has_changes(&self) -> bool {
        self.added + self.modified > 0
    }
}

/// A scrape split against the stored catalog.
#[derive(Debug, Default)]
pub struct Partition {
    pub added: Vec<ArticleRecord>,
    pub modified: Vec<ArticleRecord>,
    pub unchanged: Vec<String>,
    pub retained: Vec<String>,
}

impl Partition {
    pub fn delta_len(&self) -> usize {
        self.added.len() + self.modified.len()
    }
}

/// Splits `current` by url into added, modified (marker differs) and unchanged
/// articles, and lists the stored urls the scrape no longer has.
pub fn partition(current: Vec<ArticleRecord>, persisted: &[ArticleRecord]) -> Partition {
    let markers: HashMap<&str, &str> = persisted
        .iter()
        .map(|r| (r.url.as_str(), r.last_updated.as_str()))
        .collect();

    let mut result = Partition::default();
    let mut seen = HashSet::with_capacity(current.len());
    for record in current {
        seen.insert(record.url.clone());
        match markers.get(record.url.as_str()) {
            None => result.added.push(record),
            Some(marker) if *marker != record.last_updated => result.modified.push(record),
            Some(_) => result.unchanged.push(record.url),
        }
    }
    result.retained = persisted
        .iter()
        .filter(|r| !seen.contains(&r.url))
        .map(|r| r.url.clone())
        .collect();
    result
}

pub struct SyncEngine {
    model: Arc<dyn InferenceModel>,
    batch_size: usize,
}

impl SyncEngine {
    pub fn new(model: Arc<dyn InferenceModel>, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
        }
    }

    /// Reconciles `current` with `persisted` (`None` on the very first run) and
    /// returns the dataset to store.
    pub async fn synchronize(
        &self,
        current: Vec<ArticleRecord>,
        persisted: Option<Vec<ArticleRecord>>,
    ) -> (Vec<ArticleRecord>, SyncStats) {
        let current = dedupe_by_url(current, "scrape");

        let Some(persisted) = persisted else {
            info!("No stored catalog, enriching all {} articles", current.len());
            let mut stats = SyncStats {
                added: current.len(),
                ..SyncStats::default()
            };
            let mut records = current;
            stats.id_reassignments = assign_unique_ids(&[], &mut records);
            self.enrich(&mut records, &mut stats).await;
            sort_by_id(&mut records);
            return (records, stats);
        };

        let persisted = dedupe_by_url(persisted, "stored catalog");
        let partition = partition(current, &persisted);
        let mut stats = SyncStats {
            added: partition.added.len(),
            modified: partition.modified.len(),
            unchanged: partition.unchanged.len(),
            retained: partition.retained.len(),
            ..SyncStats::default()
        };
        if !partition.retained.is_empty() {
            debug!("Keeping {} article(s) missing from the scrape", partition.retained.len());
        }

        if partition.delta_len() == 0 {
            debug!("No changes detected");
            let mut records = persisted;
            sort_by_id(&mut records);
            return (records, stats);
        }
        info!(
            "{} new articles were found and {} modified",
            stats.added, stats.modified
        );

        let modified_urls: HashSet<String> = partition.modified.iter().map(|r| r.url.clone()).collect();
        let mut merged: Vec<ArticleRecord> = persisted
            .into_iter()
            .filter(|r| !modified_urls.contains(&r.url))
            .collect();

        let mut delta = partition.added;
        delta.extend(partition.modified);
        // Ids must be unique before enrichment, the model answers by id.
        stats.id_reassignments = assign_unique_ids(&merged, &mut delta);
        self.enrich(&mut delta, &mut stats).await;

        merged.extend(delta);
        sort_by_id(&mut merged);
        (merged, stats)
    }

    /// Enriches `records` batch by batch. A failed batch, or an article the
    /// model skipped, gets the fallback topics and gap.
    async fn enrich(&self, records: &mut [ArticleRecord], stats: &mut SyncStats) {
        let batches = records.len().div_ceil(self.batch_size);
        for (i, batch) in records.chunks_mut(self.batch_size).enumerate() {
            debug!("Enriching batch {}/{} ({} articles)", i + 1, batches, batch.len());
            match self.model.enrich_batch(batch).await {
                Ok(mut answers) => {
                    for record in batch.iter_mut() {
                        match answers.remove(&record.id).or_else(|| answers.remove(&record.url)) {
                            Some(enrichment) => {
                                record.apply(enrichment);
                                stats.enriched += 1;
                            }
                            None => {
                                warn!("{} returned nothing for {} ({})", self.model.name(), record.id, record.url);
                                record.apply(Enrichment::fallback());
                                stats.enrichment_fallbacks += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Enrichment failed for batch {}/{} starting at {}: {}",
                        i + 1,
                        batches,
                        batch.first().map(|r| r.id.as_str()).unwrap_or("?"),
                        e
                    );
                    stats.failed_batches += 1;
                    stats.enrichment_fallbacks += batch.len();
                    for record in batch.iter_mut() {
                        record.apply(Enrichment::fallback());
                    }
                }
            }
            for record in batch.iter_mut() {
                record.text = String::new();
            }
        }
    }
}

fn dedupe_by_url(records: Vec<ArticleRecord>, origin: &str) -> Vec<ArticleRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| {
            let first = seen.insert(r.url.clone());
            if !first {
                warn!("Dropping duplicate url {} from the {}", r.url, origin);
            }
            first
        })
        .collect()
}

/// What ids collide on: the id number as written, or the whole id when it has
/// no digits.
fn id_key(record: &ArticleRecord) -> String {
    record.id_digits().unwrap_or(record.id.as_str()).to_string()
}

/// Gives every article of `incoming` whose id is already used (by `kept` or an
/// earlier incoming article) the next free number. Returns how many ids
/// changed.
fn assign_unique_ids(kept: &[ArticleRecord], incoming: &mut [ArticleRecord]) -> usize {
    let mut taken: HashSet<String> = kept.iter().map(id_key).collect();
    let max = kept
        .iter()
        .chain(incoming.iter())
        .filter_map(ArticleRecord::numeric_id)
        .max()
        .unwrap_or(0);
    let mut next = max.checked_add(1).unwrap_or(1);

    let mut reassigned = 0;
    for record in incoming.iter_mut() {
        if taken.insert(id_key(record)) {
            continue;
        }
        // Past u64::MAX the search starts over from 1; free numbers always remain.
        let n = loop {
            let candidate = next;
            next = next.checked_add(1).unwrap_or(1);
            if taken.insert(candidate.to_string()) {
                break candidate;
            }
        };
        let id = format!("{}{}", record.id_prefix(), n);
        warn!("Id {} of {} is already taken, using {}", record.id, record.url, id);
        record.id = id;
        reassigned += 1;
    }
    reassigned
}

/// Stable sort by id number, compared as digits so any length orders
/// correctly; ids without a number go last.
fn sort_by_id(records: &mut [ArticleRecord]) {
    records.sort_by(|a, b| match (a.id_digits(), b.id_digits()) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kb_core::{DeepDive, Error, Gap, Result, GAP_FALLBACK, TOPICS_FALLBACK};
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering::SeqCst;

    /// Tags every article with its title; fails the batches listed in `fail`.
    #[derive(Default)]
    struct TitleModel {
        calls: AtomicUsize,
        fail: Vec<usize>,
    }

    #[async_trait]
    impl InferenceModel for TitleModel {
        fn name(&self) -> &str {
            "title"
        }

        async fn enrich_batch(&self, batch: &[ArticleRecord]) -> Result<HashMap<String, Enrichment>> {
            let call = self.calls.fetch_add(1, SeqCst);
            if self.fail.contains(&call) {
                return Err(Error::Inference("model unavailable".to_string()));
            }
            Ok(batch
                .iter()
                .map(|r| (r.id.clone(), Enrichment::new(format!("topics:{}", r.title), "gap")))
                .collect())
        }

        async fn global_gaps(&self, _catalog: &[ArticleRecord], _count: usize) -> Result<Vec<Gap>> {
            Ok(Vec::new())
        }

        async fn deep_dive(&self, _gaps: &[Gap], _n: usize) -> Result<Vec<DeepDive>> {
            Ok(Vec::new())
        }
    }

    fn article(n: u64, marker: &str) -> ArticleRecord {
        let mut record = ArticleRecord::new(
            format!("KB-{}", n),
            format!("https://help.example.com/article/{}", n),
            format!("Article {}", n),
        );
        record.last_updated = marker.to_string();
        record.text = format!("body of article {}", n);
        record
    }

    fn stored(n: u64, marker: &str) -> ArticleRecord {
        let mut record = article(n, marker);
        record.text.clear();
        record.apply(Enrichment::new("old topics", "old gap"));
        record
    }

    #[test]
    fn test_partition() {
        let persisted = vec![stored(1, "a"), stored(2, "a"), stored(3, "a")];
        let current = vec![article(1, "a"), article(2, "b"), article(4, "a")];

        let partition = partition(current, &persisted);
        assert_eq!(partition.added.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["KB-4"]);
        assert_eq!(partition.modified.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["KB-2"]);
        assert_eq!(partition.unchanged, vec![article(1, "a").url]);
        assert_eq!(partition.retained, vec![article(3, "a").url]);
        assert_eq!(partition.delta_len(), 2);
    }

    #[test]
    fn test_marker_compared_as_text() {
        // Same instant, different text: still a modification.
        let persisted = vec![stored(1, "2024-01-01T00:00:00Z")];
        let current = vec![article(1, "2024-01-01T00:00:00+00:00")];
        assert_eq!(partition(current, &persisted).modified.len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_enriches_everything() {
        let model = Arc::new(TitleModel::default());
        let engine = SyncEngine::new(model.clone(), 40);

        let (records, stats) = engine
            .synchronize(vec![article(3, "x"), article(1, "x"), article(2, "x")], None)
            .await;

        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["KB-1", "KB-2", "KB-3"]);
        assert!(records.iter().all(|r| r.topics_covered.starts_with("topics:") && r.text.is_empty()));
        assert_eq!(stats.added, 3);
        assert_eq!(stats.enriched, 3);
        assert_eq!(model.calls.load(SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_changes_skips_enrichment() {
        let model = Arc::new(TitleModel::default());
        let engine = SyncEngine::new(model.clone(), 40);
        let persisted = vec![stored(1, "a"), stored(2, "a")];

        let (records, stats) = engine
            .synchronize(vec![article(2, "a"), article(1, "a")], Some(persisted.clone()))
            .await;

        assert_eq!(records, persisted);
        assert!(!stats.has_changes());
        assert_eq!(stats.unchanged, 2);
        assert_eq!(model.calls.load(SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_gets_fallback() {
        let model = Arc::new(TitleModel { fail: vec![0], ..TitleModel::default() });
        let engine = SyncEngine::new(model, 2);

        let (records, stats) = engine
            .synchronize(vec![article(1, "a"), article(2, "a"), article(3, "a")], Some(Vec::new()))
            .await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].topics_covered, TOPICS_FALLBACK);
        assert_eq!(records[1].gap_identified, GAP_FALLBACK);
        assert_eq!(records[2].topics_covered, "topics:Article 3");
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.enrichment_fallbacks, 2);
        assert_eq!(stats.enriched, 1);
    }

    #[tokio::test]
    async fn test_colliding_id_is_reassigned() {
        let engine = SyncEngine::new(Arc::new(TitleModel::default()), 40);
        // The source renumbered: a new page took KB-2, which a kept row still holds.
        let persisted = vec![stored(1, "a"), stored(2, "a")];
        let mut moved = article(2, "a");
        moved.id = "KB-3".to_string();
        let mut fresh = article(9, "a");
        fresh.id = "KB-2".to_string();

        let (records, stats) = engine
            .synchronize(vec![article(1, "a"), fresh.clone(), moved], Some(persisted))
            .await;

        assert_eq!(stats.added, 1);
        assert_eq!(stats.id_reassignments, 1);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["KB-1", "KB-2", "KB-3"]);
        assert_eq!(records[2].url, fresh.url);
        assert_eq!(records[2].topics_covered, "topics:Article 9");
    }

    #[tokio::test]
    async fn test_id_at_u64_max_does_not_overflow() {
        let engine = SyncEngine::new(Arc::new(TitleModel::default()), 40);
        let top = format!("KB-{}", u64::MAX);
        let mut kept = stored(1, "a");
        kept.id = top.clone();
        let mut fresh = article(2, "a");
        fresh.id = top.clone();

        let (records, stats) = engine.synchronize(vec![fresh.clone()], Some(vec![kept])).await;

        assert_eq!(stats.id_reassignments, 1);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["KB-1", top.as_str()]);
        assert_eq!(records[0].url, fresh.url);

        // No collision, the max alone must not overflow either.
        let mut kept = stored(1, "a");
        kept.id = top.clone();
        let (records, stats) = engine.synchronize(vec![article(3, "a")], Some(vec![kept])).await;
        assert_eq!(stats.id_reassignments, 0);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_id_collision_is_reassigned() {
        let engine = SyncEngine::new(Arc::new(TitleModel::default()), 40);
        let huge = "KB-99999999999999999999";
        let mut kept = stored(1, "a");
        kept.id = huge.to_string();
        let mut fresh = article(2, "a");
        fresh.id = huge.to_string();
        let mut padded = article(4, "a");
        padded.id = format!("KB-000{}", &huge[3..]);

        let (records, stats) = engine
            .synchronize(vec![fresh.clone(), padded.clone()], Some(vec![kept]))
            .await;

        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(stats.id_reassignments, 2);
        assert_eq!(records[0].id, "KB-1");
        assert_eq!(records[0].url, fresh.url);
        assert_eq!(records[1].id, "KB-2");
        assert_eq!(records[1].url, padded.url);
        assert_eq!(records[2].id, huge);
    }

    #[tokio::test]
    async fn test_duplicate_urls_in_scrape_are_dropped() {
        let engine = SyncEngine::new(Arc::new(TitleModel::default()), 40);
        let mut twin = article(1, "b");
        twin.id = "KB-5".to_string();

        let (records, stats) = engine.synchronize(vec![article(1, "a"), twin], None).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_updated, "a");
        assert_eq!(stats.added, 1);
    }

    #[test]
    fn test_ids_without_number_sort_last() {
        let mut records = vec![article(2, "a"), ArticleRecord::new("draft", "https://x/d", "D"), article(1, "a")];
        sort_by_id(&mut records);
        assert_eq!(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["KB-1", "KB-2", "draft"]);

        let mut records = vec![
            ArticleRecord::new("KB-99999999999999999999", "https://x/1", "A"),
            ArticleRecord::new("KB-010", "https://x/2", "B"),
            ArticleRecord::new(format!("KB-{}", u64::MAX), "https://x/3", "C"),
            ArticleRecord::new("KB-9", "https://x/4", "D"),
        ];
        sort_by_id(&mut records);
        let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/4", "https://x/2", "https://x/3", "https://x/1"]);
    }
}
