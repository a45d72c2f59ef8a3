//! Persistent trigram inverted index.
//!
//! Two logical tables live here: the document table (identifier to
//! Arabic text plus its ordered trigram list) and the token posting
//! lists derived from it. Only the document table is persisted, as
//! a JSON snapshot replaced atomically on every committed batch;
//! posting lists are rebuilt wholesale after each write, which keeps
//! bulk loads cheap for the same reason dropping and recreating a
//! database index does.
//!
//! Writes are transactional: a batch is staged on a copy of the
//! document table and becomes visible in memory only after the new
//! snapshot reached disk. A failed persist leaves both memory and
//! disk at the previous state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lafz_phonetic::NGram;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SNAPSHOT_FILE: &str = "documents.json";
const SNAPSHOT_TMP_FILE: &str = "documents.json.tmp";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// A document together with its indexed trigram stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub identifier: String,
    pub arabic: String,
    pub trigrams: Vec<NGram>,
}

/// One occurrence of a probed trigram inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHit {
    pub document_id: String,
    pub token: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Snapshot {
    documents: BTreeMap<String, StoredDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredDocument {
    arabic: String,
    trigrams: Vec<NGram>,
}

#[derive(Debug, Clone)]
struct Posting {
    document_id: String,
    start: usize,
    end: usize,
}

#[derive(Debug)]
pub struct IndexStore {
    root: PathBuf,
    documents: BTreeMap<String, StoredDocument>,
    postings: HashMap<String, Vec<Posting>>,
}

impl IndexStore {
    /// Creates or loads the store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Open {
            path: root.clone(),
            source,
        })?;

        let snapshot_path = root.join(SNAPSHOT_FILE);
        let documents = if snapshot_path.exists() {
            let bytes = fs::read(&snapshot_path).map_err(|source| StoreError::Open {
                path: snapshot_path.clone(),
                source,
            })?;
            serde_json::from_slice::<Snapshot>(&bytes)?.documents
        } else {
            BTreeMap::new()
        };

        let postings = build_postings(&documents);
        debug!(
            documents = documents.len(),
            tokens = postings.len(),
            "opened index store"
        );

        Ok(Self {
            root,
            documents,
            postings,
        })
    }

    /// Releases the store. All committed state is already on disk.
    pub fn close(self) {}

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Batched upsert. A record whose identifier already exists
    /// replaces the stored text and every prior trigram row for that
    /// document.
    pub fn insert(&mut self, records: Vec<DocumentRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let count = records.len();
        let mut staged = self.documents.clone();
        for record in records {
            staged.insert(
                record.identifier,
                StoredDocument {
                    arabic: record.arabic,
                    trigrams: record.trigrams,
                },
            );
        }
        self.commit(staged)?;
        debug!(inserted = count, total = self.documents.len(), "indexed documents");
        Ok(())
    }

    /// Removes documents and every trigram row referencing them.
    /// Unknown identifiers are ignored.
    pub fn delete(&mut self, identifiers: &[String]) -> Result<(), StoreError> {
        if identifiers.is_empty() {
            return Ok(());
        }
        let mut staged = self.documents.clone();
        for id in identifiers {
            staged.remove(id);
        }
        self.commit(staged)?;
        debug!(remaining = self.documents.len(), "deleted documents");
        Ok(())
    }

    /// Returns every recorded occurrence of the given trigram keys,
    /// per key ordered by `(document_id, start)`. Duplicate keys in
    /// the input are collapsed.
    pub fn probe(&self, tokens: &[String]) -> Vec<TokenHit> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for token in tokens {
            if !seen.insert(token.as_str()) {
                continue;
            }
            if let Some(postings) = self.postings.get(token) {
                for posting in postings {
                    hits.push(TokenHit {
                        document_id: posting.document_id.clone(),
                        token: token.clone(),
                        start: posting.start,
                        end: posting.end,
                    });
                }
            }
        }
        hits
    }

    /// Returns the requested documents with their full trigram
    /// lists, in input order. Missing identifiers produce no row.
    pub fn fetch(&self, identifiers: &[String]) -> Vec<DocumentRecord> {
        identifiers
            .iter()
            .filter_map(|id| {
                self.documents.get(id).map(|doc| DocumentRecord {
                    identifier: id.clone(),
                    arabic: doc.arabic.clone(),
                    trigrams: doc.trigrams.clone(),
                })
            })
            .collect()
    }

    fn commit(&mut self, staged: BTreeMap<String, StoredDocument>) -> Result<(), StoreError> {
        let snapshot = Snapshot { documents: staged };
        self.write_snapshot(&snapshot)?;
        self.documents = snapshot.documents;
        self.postings = build_postings(&self.documents);
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let tmp = self.root.join(SNAPSHOT_TMP_FILE);
        let bytes = serde_json::to_vec(snapshot)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, self.root.join(SNAPSHOT_FILE))?;
        Ok(())
    }
}

fn build_postings(
    documents: &BTreeMap<String, StoredDocument>,
) -> HashMap<String, Vec<Posting>> {
    let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
    for (id, doc) in documents {
        for gram in &doc.trigrams {
            postings.entry(gram.text.clone()).or_default().push(Posting {
                document_id: id.clone(),
                start: gram.start,
                end: gram.end,
            });
        }
    }
    for hits in postings.values_mut() {
        hits.sort_by(|a, b| {
            (&a.document_id, a.start, a.end).cmp(&(&b.document_id, b.start, b.end))
        });
    }
    postings
}
