//! Phonetic search over Arabic documents.
//!
//! A [`Storage`] owns a persistent trigram index of vocalized Arabic
//! documents and answers Latin-transliteration queries against it:
//!
//! ```no_run
//! use lafz_core::{open_storage, Document};
//!
//! let mut storage = open_storage("verses.lafz")?;
//! storage.add_documents(&[Document {
//!     identifier: "1".into(),
//!     arabic: "بِسْمِ اللَّهِ الرَّحْمَـٰنِ الرَّحِيمِ".into(),
//! }])?;
//! for result in storage.search("bismillahirrahmanirrahim")? {
//!     println!("{} {:.2}", result.identifier, result.confidence);
//! }
//! # Ok::<(), lafz_core::StoreError>(())
//! ```
//!
//! Both sides of a search go through the same phonetic normalizer,
//! so idiosyncratic romanizations (missing long vowels, doubled
//! consonants, `kh`/`ch`, hamza as `'`) still collide with the
//! indexed text.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lafz_index::{DocumentRecord, IndexStore};
use lafz_phonetic::arabic;

pub use lafz_index::StoreError;

const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;

/// An Arabic document to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub identifier: String,
    pub arabic: String,
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub identifier: String,
    /// The stored Arabic text.
    pub text: String,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    /// Character spans into `text`, for highlighting.
    pub positions: Vec<(usize, usize)>,
}

/// A persistent, searchable collection of Arabic documents.
#[derive(Debug)]
pub struct Storage {
    store: IndexStore,
    min_confidence: f64,
}

/// Opens (or creates) a storage rooted at `path`.
pub fn open_storage(path: impl AsRef<Path>) -> Result<Storage, StoreError> {
    Ok(Storage {
        store: IndexStore::open(path)?,
        min_confidence: DEFAULT_MIN_CONFIDENCE,
    })
}

impl Storage {
    /// Indexes a batch of documents. Re-adding an identifier
    /// replaces the prior document atomically.
    pub fn add_documents(&mut self, documents: &[Document]) -> Result<(), StoreError> {
        let records: Vec<DocumentRecord> = documents
            .par_iter()
            .map(|doc| {
                let phones = arabic::phonemes(&doc.arabic);
                DocumentRecord {
                    identifier: doc.identifier.clone(),
                    arabic: doc.arabic.clone(),
                    trigrams: lafz_phonetic::trigrams(&phones),
                }
            })
            .collect();
        self.store.insert(records)
    }

    /// Removes documents from the index.
    pub fn delete_documents(&mut self, identifiers: &[String]) -> Result<(), StoreError> {
        self.store.delete(identifiers)
    }

    /// Sets the confidence floor for reported matches. Values above
    /// 1 clamp to 1; zero and below reset to the default of 0.4.
    pub fn set_min_confidence(&mut self, value: f64) {
        self.min_confidence = if value > 1.0 {
            1.0
        } else if value <= 0.0 {
            DEFAULT_MIN_CONFIDENCE
        } else {
            value
        };
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn document_count(&self) -> usize {
        self.store.document_count()
    }

    /// Releases the storage. All committed state is on disk.
    pub fn close(self) {
        self.store.close();
    }

    /// Searches by transliteration, scoring in-order token groups
    /// straight out of the inverted index. Results are sorted by
    /// confidence descending, identifier ascending. A query that
    /// yields no trigrams returns an empty list.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let normalized = lafz_phonetic::normalize(query);
        let query_tokens = lafz_phonetic::trigram_texts(&normalized);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let total_tokens = query_tokens.len();

        let unique = dedup_tokens(&query_tokens);
        let token_ids: HashMap<&str, usize> = unique
            .iter()
            .enumerate()
            .map(|(id, token)| (token.as_str(), id))
            .collect();

        debug!(
            normalized = %normalized,
            tokens = total_tokens,
            unique = unique.len(),
            "probing index"
        );

        let mut hits: Vec<ProbeHit> = self
            .store
            .probe(&unique)
            .into_iter()
            .map(|hit| ProbeHit {
                token_id: token_ids[hit.token.as_str()],
                document_id: hit.document_id,
                start: hit.start,
                end: hit.end,
            })
            .collect();

        hits.sort_by(|a, b| {
            (&a.document_id, a.start, a.token_id).cmp(&(&b.document_id, b.start, b.token_id))
        });
        hits.dedup_by(|a, b| {
            a.document_id == b.document_id && a.start == b.start && a.end == b.end
        });

        // A group grows while the document is unchanged and the
        // query-token index keeps increasing, so every group is an
        // in-order occurrence of a query subsequence.
        let mut groups: Vec<TokenGroup> = Vec::new();
        for hit in hits {
            if let Some(group) = groups.last_mut() {
                if group.document_id == hit.document_id && hit.token_id > group.last_token_id {
                    group.extend(hit);
                    continue;
                }
            }
            groups.push(TokenGroup::start(hit));
        }

        let mut scored: Vec<ScoredGroup> = groups
            .into_iter()
            .filter_map(|group| {
                let confidence = group.confidence(total_tokens);
                (confidence >= self.min_confidence).then_some(ScoredGroup {
                    document_id: group.document_id,
                    start: group.first_start,
                    end: group.max_end,
                    confidence,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            (&a.document_id, a.start)
                .cmp(&(&b.document_id, b.start))
                .then_with(|| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(Ordering::Equal)
                })
        });

        let mut merged: Vec<MergedMatch> = Vec::new();
        for group in scored {
            if let Some(last) = merged.last_mut() {
                if last.document_id == group.document_id {
                    if group.confidence > last.confidence {
                        last.confidence = group.confidence;
                    }
                    last.spans.push((group.start, group.end));
                    continue;
                }
            }
            merged.push(MergedMatch {
                document_id: group.document_id,
                confidence: group.confidence,
                spans: vec![(group.start, group.end)],
            });
        }

        merged.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });

        let ids: Vec<String> = merged.iter().map(|m| m.document_id.clone()).collect();
        let texts: HashMap<String, String> = self
            .store
            .fetch(&ids)
            .into_iter()
            .map(|doc| (doc.identifier, doc.arabic))
            .collect();

        Ok(merged
            .into_iter()
            .map(|m| SearchResult {
                text: texts.get(&m.document_id).cloned().unwrap_or_default(),
                identifier: m.document_id,
                confidence: m.confidence,
                positions: m.spans,
            })
            .collect())
    }

    /// Alternate scorer: ranks candidates by the longest common
    /// subsequence of their full trigram streams against the query,
    /// weighted by how compact the subsequence sits in the document.
    /// Slower than [`Storage::search`] since candidates are fetched
    /// in full, and reports a single boundary span per match.
    pub fn search_edit_script(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let normalized = lafz_phonetic::normalize(query);
        let query_tokens = lafz_phonetic::trigram_texts(&normalized);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let unique = dedup_tokens(&query_tokens);
        let mut candidates: Vec<String> = self
            .store
            .probe(&unique)
            .into_iter()
            .map(|hit| hit.document_id)
            .collect();
        candidates.sort();
        candidates.dedup();

        let query_refs: Vec<&str> = query_tokens.iter().map(String::as_str).collect();
        let mut results = Vec::new();
        for doc in self.store.fetch(&candidates) {
            let doc_tokens: Vec<&str> = doc.trigrams.iter().map(|g| g.text.as_str()).collect();
            let scored = lafz_diff::score(&doc_tokens, &query_refs);
            if scored.value < self.min_confidence || scored.kept_indices.is_empty() {
                continue;
            }
            let start = scored
                .kept_indices
                .iter()
                .map(|&i| doc.trigrams[i].start)
                .min()
                .unwrap_or(0);
            let end = scored
                .kept_indices
                .iter()
                .map(|&i| doc.trigrams[i].end)
                .max()
                .unwrap_or(0);
            results.push(SearchResult {
                identifier: doc.identifier,
                text: doc.arabic,
                confidence: scored.value,
                positions: vec![(start, end)],
            });
        }

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(results)
    }
}

fn dedup_tokens(tokens: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for token in tokens {
        if !unique.iter().any(|t| t == token) {
            unique.push(token.clone());
        }
    }
    unique
}

#[derive(Debug, Clone)]
struct ProbeHit {
    document_id: String,
    token_id: usize,
    start: usize,
    end: usize,
}

#[derive(Debug)]
struct TokenGroup {
    document_id: String,
    last_token_id: usize,
    first_start: usize,
    max_end: usize,
    starts: Vec<usize>,
}

impl TokenGroup {
    fn start(hit: ProbeHit) -> Self {
        Self {
            document_id: hit.document_id,
            last_token_id: hit.token_id,
            first_start: hit.start,
            max_end: hit.end,
            starts: vec![hit.start],
        }
    }

    fn extend(&mut self, hit: ProbeHit) {
        self.last_token_id = hit.token_id;
        self.max_end = self.max_end.max(hit.end);
        self.starts.push(hit.start);
    }

    /// Coverage of the query, damped for groups matching half the
    /// query or less, times how tightly the hits sit together.
    /// The 0.5 damping factor is an empirical knob, tuned against a
    /// Quran corpus.
    fn confidence(&self, total_tokens: usize) -> f64 {
        let mut completeness = self.starts.len() as f64 / total_tokens as f64;
        if completeness <= 0.5 {
            completeness *= 0.5;
        }

        let compactness = if self.starts.len() <= 1 {
            1.0
        } else {
            let gap_sum: usize = self
                .starts
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .sum();
            let mean_gap = gap_sum as f64 / (self.starts.len() - 1) as f64;
            if mean_gap == 0.0 {
                1.0
            } else {
                (3.0 / mean_gap).min(1.0)
            }
        };

        completeness * compactness
    }
}

#[derive(Debug)]
struct ScoredGroup {
    document_id: String,
    start: usize,
    end: usize,
    confidence: f64,
}

#[derive(Debug)]
struct MergedMatch {
    document_id: String,
    confidence: f64,
    spans: Vec<(usize, usize)>,
}
