//! Image persistence and the in-process image cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier to bytes, populated on every save and on read-through loads.
///
/// Entries are never evicted; the cache lives as long as the process (or the
/// test that built it).
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: DashMap<String, Arc<[u8]>>,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under `id`, replacing any previous entry.
    pub fn insert(&self, id: impl Into<String>, bytes: Arc<[u8]>) {
        self.entries.insert(id.into(), bytes);
    }

    /// Cached bytes for `id`.
    pub fn get(&self, id: &str) -> Option<Arc<[u8]>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Cached identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a saved image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Fresh random identifier
    pub id: String,
    /// Absolute path of the written file
    pub path: PathBuf,
    /// `file://` locator for `path`
    pub uri: String,
}

/// Opens a saved image in the platform's default viewer.
///
/// Runs on a blocking thread; implementations may block.
pub trait Opener: Send + Sync {
    /// Open `path`.
    fn open(&self, path: &Path) -> std::io::Result<()>;
}

/// Opens images with the default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserOpener;

impl Opener for BrowserOpener {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        webbrowser::open(&file_uri(path))
    }
}

/// Never opens anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOpener;

impl Opener for NoopOpener {
    fn open(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// `file://` locator for an absolute path.
pub fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Saves generated images and looks them up again by identifier.
pub struct ImageStore {
    default_dir: PathBuf,
    cache: Arc<ImageCache>,
    opener: Arc<dyn Opener>,
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("default_dir", &self.default_dir)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ImageStore {
    /// Create a store writing unnamed images under `default_dir`.
    pub fn new(
        default_dir: impl Into<PathBuf>,
        cache: Arc<ImageCache>,
        opener: Arc<dyn Opener>,
    ) -> Self {
        Self {
            default_dir: default_dir.into(),
            cache,
            opener,
        }
    }

    /// The cache backing [`ImageStore::load`].
    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Write `bytes` and cache them under a fresh identifier.
    ///
    /// The image goes to `output_path` when given (overwriting any existing
    /// file), otherwise to `<default_dir>/<id>.png`. Missing parent
    /// directories are created. With `open_after_save` the opener is fired
    /// without waiting; its failure is logged and never fails the save.
    pub async fn save(
        &self,
        bytes: Vec<u8>,
        output_path: Option<&Path>,
        open_after_save: bool,
    ) -> Result<ImageRecord> {
        let id = Uuid::new_v4().to_string();
        let target = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.default_path(&id),
        };
        let path = std::path::absolute(&target).map_err(|source| Error::Persistence {
            path: target.clone(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::Persistence {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| Error::Persistence {
                path: path.clone(),
                source,
            })?;

        self.cache.insert(id.clone(), Arc::from(bytes));
        info!(%id, path = %path.display(), "image saved");

        if open_after_save {
            self.open_detached(path.clone());
        }

        Ok(ImageRecord {
            uri: file_uri(&path),
            id,
            path,
        })
    }

    /// Bytes for `id`, from the cache or `<default_dir>/<id>.png`.
    ///
    /// A file hit is cached before returning.
    pub async fn load(&self, id: &str) -> Result<Arc<[u8]>> {
        if let Some(bytes) = self.cache.get(id) {
            debug!(%id, "image cache hit");
            return Ok(bytes);
        }

        if !is_valid_id(id) {
            return Err(Error::ArtifactNotFound(id.to_string()));
        }

        let path = self.default_path(id);
        let bytes: Arc<[u8]> = match tokio::fs::read(&path).await {
            Ok(bytes) => Arc::from(bytes),
            Err(e) => {
                debug!(%id, path = %path.display(), "image not readable: {}", e);
                return Err(Error::ArtifactNotFound(id.to_string()));
            },
        };

        self.cache.insert(id, Arc::clone(&bytes));
        debug!(%id, "image loaded from disk");
        Ok(bytes)
    }

    fn default_path(&self, id: &str) -> PathBuf {
        self.default_dir.join(format!("{}.png", id))
    }

    fn open_detached(&self, path: PathBuf) {
        let opener = Arc::clone(&self.opener);
        // Detached: the handle is dropped and the result only logged.
        tokio::task::spawn_blocking(move || match opener.open(&path) {
            Ok(()) => debug!(path = %path.display(), "opened image in viewer"),
            Err(e) => warn!(path = %path.display(), "failed to open image in viewer: {}", e),
        });
    }
}

// Identifiers become file names, so only plain tokens are looked up.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
