//! Document store sink.
//!
//! Each run replaces a destination wholesale. [`JsonLinesStore`] keeps one
//! `<collection>.jsonl` per destination under `<root>/<database>/` plus a
//! `manifest.json` with document counts and SHA-256 checksums. Writes go to a
//! temp file that is synced and renamed over the target, so a batch is either
//! fully visible or not at all.

use chrono::{SecondsFormat, Utc};
use copa_core::Document;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::validate_name;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const COLLECTION_EXTENSION: &str = "jsonl";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted document in '{collection}' at line {line}")]
    CorruptLine { collection: String, line: usize },

    #[error("Checksum mismatch for collection '{collection}'")]
    ChecksumMismatch { collection: String },

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),
}

/// Destination for finished document batches.
pub trait DocumentStore {
    /// Drop whatever `collection` held and store `documents` in its place.
    fn replace_collection(
        &mut self,
        collection: &str,
        documents: &[Document],
    ) -> Result<usize, StoreError>;

    /// All documents of `collection`; empty when it was never written.
    fn load_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    fn insert_many(&mut self, collection: &str, documents: &[Document]) -> Result<usize, StoreError> {
        let mut existing = self.load_collection(collection)?;
        existing.extend_from_slice(documents);
        self.replace_collection(collection, &existing)?;
        Ok(documents.len())
    }

    /// Remove matching documents, returning how many were removed.
    fn delete_where(
        &mut self,
        collection: &str,
        predicate: &dyn Fn(&Document) -> bool,
    ) -> Result<usize, StoreError> {
        let mut documents = self.load_collection(collection)?;
        let before = documents.len();
        documents.retain(|doc| !predicate(doc));
        let removed = before - documents.len();
        if removed > 0 {
            self.replace_collection(collection, &documents)?;
        }
        Ok(removed)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.load_collection(collection)?.len())
    }
}

/// In-process store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

impl DocumentStore for MemoryStore {
    fn replace_collection(
        &mut self,
        collection: &str,
        documents: &[Document],
    ) -> Result<usize, StoreError> {
        self.collections
            .insert(collection.to_string(), documents.to_vec());
        Ok(documents.len())
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collections.get(collection).map_or(0, Vec::len))
    }
}

/// Per-collection bookkeeping in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    pub document_count: usize,
    pub size_bytes: u64,
    /// SHA256 of the collection file (hex)
    pub checksum: String,
    /// RFC 3339, UTC
    pub written_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub collections: BTreeMap<String, CollectionManifest>,
}

/// JSON Lines directory store.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    dir: PathBuf,
}

impl JsonLinesStore {
    /// Store rooted at `<root>/<database>`. Nothing is created on disk until
    /// the first write.
    pub fn open(root: &Path, database: &str) -> Result<Self, StoreError> {
        validate_name("database", database)
            .map_err(|e| StoreError::InvalidCollectionName(e.to_string()))?;
        Ok(Self {
            dir: root.join(database),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection_path(&self, collection: &str) -> Result<PathBuf, StoreError> {
        validate_name("collection", collection)
            .map_err(|e| StoreError::InvalidCollectionName(e.to_string()))?;
        if collection == MANIFEST_FILE.trim_end_matches(".json") {
            return Err(StoreError::InvalidCollectionName(format!(
                "'{collection}' is reserved"
            )));
        }
        Ok(self
            .dir
            .join(format!("{collection}.{COLLECTION_EXTENSION}")))
    }

    pub fn manifest(&self) -> Result<Manifest, StoreError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Recompute a collection's checksum and compare it to the manifest.
    /// Collections missing from the manifest do not verify.
    pub fn verify(&self, collection: &str) -> Result<bool, StoreError> {
        let manifest = self.manifest()?;
        let Some(entry) = manifest.collections.get(collection) else {
            return Ok(false);
        };
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(&path)?;
        Ok(sha256_hex(&bytes) == entry.checksum)
    }

    /// Like [`JsonLinesStore::verify`] but fails with `ChecksumMismatch`.
    pub fn ensure_verified(&self, collection: &str) -> Result<(), StoreError> {
        if self.verify(collection)? {
            Ok(())
        } else {
            Err(StoreError::ChecksumMismatch {
                collection: collection.to_string(),
            })
        }
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        write_atomic(&self.dir.join(MANIFEST_FILE), &bytes)
    }
}

impl DocumentStore for JsonLinesStore {
    fn replace_collection(
        &mut self,
        collection: &str,
        documents: &[Document],
    ) -> Result<usize, StoreError> {
        let path = self.collection_path(collection)?;

        let mut bytes = Vec::new();
        for document in documents {
            serde_json::to_writer(&mut bytes, document)?;
            bytes.push(b'\n');
        }
        write_atomic(&path, &bytes)?;

        let mut manifest = self.manifest()?;
        manifest.collections.insert(
            collection.to_string(),
            CollectionManifest {
                document_count: documents.len(),
                size_bytes: bytes.len() as u64,
                checksum: sha256_hex(&bytes),
                written_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        );
        self.write_manifest(&manifest)?;

        log::debug!(
            "Wrote {} documents ({} bytes) to {}",
            documents.len(),
            bytes.len(),
            path.display()
        );
        Ok(documents.len())
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut documents = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let document: Document =
                serde_json::from_str(&line).map_err(|_| StoreError::CorruptLine {
                    collection: collection.to_string(),
                    line: idx + 1,
                })?;
            documents.push(document);
        }
        Ok(documents)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write to `<path>.tmp`, fsync, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
