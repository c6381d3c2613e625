//! File-backed archive store: one JSON document per resource.
//!
//! Files are named after the SHA-256 of the resource id, so any path or
//! URI maps to a safe file name. Every write goes to a temporary file in
//! the same directory which then replaces the old document, so a failed
//! write leaves the previous state intact.
//!
//! The documents on disk are the only state. Several stores, in one
//! process or several, may share a directory: each read-modify-write runs
//! under an exclusive lock on the resource's `.lock` file and starts from
//! the document as it is on disk at that moment.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::error::{ArchiveError, ArchiveResult};
use super::store::{ArchiveStore, ResourceHistory, ResourceSummary, VersionRecord};
use crate::types::ResourceId;

/// Archive store persisting each resource's history as JSON.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) the archive directory and check that
    /// every document in it is readable.
    pub fn open(dir: impl Into<PathBuf>) -> ArchiveResult<Self> {
        let store = Self { dir: dir.into() };
        fs::create_dir_all(&store.dir)?;

        let histories = store.load_all()?;
        crate::debug_event!(
            "archive",
            "opened",
            "{} resources in {}",
            histories.len(),
            store.dir.display()
        );

        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Document path for `resource`.
    pub fn document_path(&self, resource: &ResourceId) -> PathBuf {
        let digest = Sha256::digest(resource.as_str().as_bytes());
        let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.json"))
    }

    fn parse_document(path: &Path, content: &str) -> ArchiveResult<ResourceHistory> {
        serde_json::from_str(content).map_err(|e| ArchiveError::ReadFailed {
            reason: format!("{}: {e}", path.display()),
        })
    }

    /// Current document for `resource`, `None` if it was never archived.
    fn load(&self, resource: &ResourceId) -> ArchiveResult<Option<ResourceHistory>> {
        let path = self.document_path(resource);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse_document(&path, &content).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn load_all(&self) -> ArchiveResult<Vec<ResourceHistory>> {
        let mut histories = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            histories.push(Self::parse_document(&path, &content)?);
        }
        Ok(histories)
    }

    /// Take the exclusive lock for `resource`. Released when the returned
    /// file is dropped.
    fn lock(&self, resource: &ResourceId) -> ArchiveResult<File> {
        let path = self.document_path(resource).with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| ArchiveError::write_failed(resource, e))?;
        file.lock()
            .map_err(|e| ArchiveError::write_failed(resource, e))?;
        Ok(file)
    }

    fn write_document(&self, history: &ResourceHistory) -> ArchiveResult<()> {
        let resource = &history.resource_id;
        let fail = |e: &dyn std::fmt::Display| ArchiveError::write_failed(resource, e);

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| fail(&e))?;
        serde_json::to_writer_pretty(temp.as_file_mut(), history).map_err(|e| fail(&e))?;
        temp.flush().map_err(|e| fail(&e))?;
        temp.as_file().sync_all().map_err(|e| fail(&e))?;
        temp.persist(self.document_path(resource))
            .map_err(|e| fail(&e.error))?;
        Ok(())
    }
}

impl ArchiveStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn current_version(&self, resource: &ResourceId) -> ArchiveResult<u64> {
        Ok(self
            .load(resource)?
            .map_or(0, |history| history.current_version))
    }

    fn append(&self, record: &VersionRecord) -> ArchiveResult<()> {
        let resource = &record.resource_id;
        let _lock = self.lock(resource)?;

        let mut history = self
            .load(resource)?
            .unwrap_or_else(|| ResourceHistory::new(resource.clone(), record.created_at));

        // Fails if another store advanced the counter since it was read
        history
            .push(record.clone())
            .map_err(|reason| ArchiveError::write_failed(resource, reason))?;

        self.write_document(&history)
    }

    fn query(&self, resource: &ResourceId) -> ArchiveResult<Vec<VersionRecord>> {
        Ok(self
            .load(resource)?
            .map(|history| history.versions)
            .unwrap_or_default())
    }

    fn delete_versions(&self, resource: &ResourceId) -> ArchiveResult<usize> {
        let _lock = self.lock(resource)?;

        let Some(mut history) = self.load(resource)? else {
            return Ok(0);
        };

        let removed = std::mem::take(&mut history.versions).len();
        self.write_document(&history)?;
        Ok(removed)
    }

    fn resources(&self) -> ArchiveResult<Vec<ResourceSummary>> {
        let mut summaries: Vec<ResourceSummary> = self
            .load_all()?
            .iter()
            .map(ResourceSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(summaries)
    }
}
