//! Manifest store: loads manifests and caches them by modification time.
//!
//! The in-memory cache holds one entry `{path, modified, manifest}`. A load
//! whose source mtime matches the entry returns the same [`Arc`] without
//! reading the file. Otherwise the source is parsed, validated and swapped
//! in whole; a failed load leaves the previous entry in place.
//!
//! With a cache directory configured, parsed documents are also written to
//! `<cache_dir>/<sanitized path>.json` together with the source mtime, so a
//! later process can skip parsing while the source is unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{parse, Manifest, ManifestDocument};
use crate::context::ServiceContext;
use crate::error::ManifestError;

struct CacheEntry {
    path: PathBuf,
    modified: SystemTime,
    manifest: Arc<Manifest>,
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    source: PathBuf,
    modified: SystemTime,
    document: ManifestDocument,
}

/// Loads and caches manifests through `ctx.fs`.
pub struct ManifestStore<'a> {
    ctx: &'a ServiceContext,
    cache_dir: Option<PathBuf>,
    entry: RwLock<Option<CacheEntry>>,
}

impl<'a> ManifestStore<'a> {
    /// Creates a store with an in-memory cache only.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx, cache_dir: None, entry: RwLock::new(None) }
    }

    /// Also persists parsed manifests under `dir`.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Loads the manifest at `path`, reusing the cached one if its
    /// modification time is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the source cannot be stat'ed or read,
    /// [`ManifestError::Parse`] if it is malformed, or a structural error if
    /// validation fails.
    pub fn load(&self, path: &Path) -> Result<Arc<Manifest>, ManifestError> {
        let modified = self.ctx.fs.modified(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(manifest) = self.cached(path, modified) {
            debug!(path = %path.display(), "manifest cache hit");
            return Ok(manifest);
        }

        let manifest = Arc::new(match self.read_disk_cache(path, modified) {
            Some(document) => {
                debug!(path = %path.display(), "manifest loaded from disk cache");
                Manifest::from_document(document, Some(modified))?
            }
            None => {
                let source = self.ctx.fs.read_to_string(path).map_err(|e| ManifestError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                let document = parse(path, &source)?;
                let manifest = Manifest::from_document(document.clone(), Some(modified))?;
                self.write_disk_cache(path, modified, document);
                manifest
            }
        });

        debug!(
            path = %path.display(),
            tasks = manifest.graph().tasks().count(),
            "manifest loaded"
        );
        match self.entry.write() {
            Ok(mut guard) => {
                *guard = Some(CacheEntry {
                    path: path.to_path_buf(),
                    modified,
                    manifest: Arc::clone(&manifest),
                });
            }
            Err(_) => warn!("manifest cache lock poisoned; entry not stored"),
        }
        Ok(manifest)
    }

    fn cached(&self, path: &Path, modified: SystemTime) -> Option<Arc<Manifest>> {
        let guard = self.entry.read().ok()?;
        guard
            .as_ref()
            .filter(|entry| entry.path == path && entry.modified == modified)
            .map(|entry| Arc::clone(&entry.manifest))
    }

    fn disk_cache_path(&self, path: &Path) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let key: String = path
            .to_string_lossy()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        Some(dir.join(format!("{key}.json")))
    }

    fn read_disk_cache(&self, path: &Path, modified: SystemTime) -> Option<ManifestDocument> {
        let cache_path = self.disk_cache_path(path)?;
        if !self.ctx.fs.exists(&cache_path) {
            return None;
        }
        let raw = self.ctx.fs.read_to_string(&cache_path).ok()?;
        match serde_json::from_str::<DiskEntry>(&raw) {
            Ok(entry) if entry.source == path && entry.modified == modified => Some(entry.document),
            Ok(_) => None,
            Err(e) => {
                warn!(cache = %cache_path.display(), error = %e, "ignoring unreadable manifest cache");
                None
            }
        }
    }

    fn write_disk_cache(&self, path: &Path, modified: SystemTime, document: ManifestDocument) {
        let Some(cache_path) = self.disk_cache_path(path) else { return };
        let entry = DiskEntry { source: path.to_path_buf(), modified, document };
        let written = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|json| self.ctx.fs.write(&cache_path, &json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!(cache = %cache_path.display(), error = %e, "failed to write manifest cache");
        }
    }
}
