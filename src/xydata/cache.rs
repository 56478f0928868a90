//! Bounded cache of decoded files.
//!
//! A [`Cache`] keeps the last few data sets it decoded, keyed by path,
//! format hint and options. Handles are shared [`Arc`]s, so evicting or
//! clearing an entry never invalidates a handle a caller still holds.
//! All methods take `&self`; the state sits behind a [`Mutex`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use log::{debug, info};

use super::reader::load_file;
use super::types::error::{Result, XyError};
use super::types::models::DataSet;

const DEFAULT_CAPACITY: usize = 1;

#[derive(Debug)]
struct CachedFile {
    path: PathBuf,
    format_name: String,
    options: Vec<String>,
    read_time: SystemTime,
    dataset: Arc<DataSet>,
}

impl CachedFile {
    fn matches(&self, path: &Path, format_name: &str, options: &[String]) -> bool {
        self.path == path && self.format_name == format_name && self.options == options
    }

    /// True if the file changed on disk after it was read.
    fn is_stale(&self) -> bool {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .is_ok_and(|modified| modified > self.read_time)
    }
}

#[derive(Debug)]
struct CacheState {
    capacity: usize,
    /// Oldest first.
    entries: Vec<CachedFile>,
}

/// Cache of decoded data sets.
///
/// Create one during setup and share it by reference.
#[derive(Debug)]
pub struct Cache {
    inner: Mutex<CacheState>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// A cache holding one file.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheState {
                capacity,
                entries: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>> {
        self.inner.lock().map_err(|_| XyError::LockPoisoned)
    }

    /// Returns the data set for `path`, decoding it if it is not cached or
    /// if the file was modified since it was read.
    ///
    /// Arguments are the same as for [`load_file`]. A failed decode is not
    /// cached and leaves the cache as it was, except that a stale entry for
    /// the same key is dropped.
    pub fn get(
        &self,
        path: impl AsRef<Path>,
        format_hint: Option<&str>,
        options: &[String],
    ) -> Result<Arc<DataSet>> {
        let path = path.as_ref();
        let format_name = format_hint.unwrap_or("");
        let mut state = self.lock()?;

        if let Some(i) = state
            .entries
            .iter()
            .position(|e| e.matches(path, format_name, options))
        {
            if !state.entries[i].is_stale() {
                debug!("Cache hit: {}", path.display());
                return Ok(Arc::clone(&state.entries[i].dataset));
            }
            info!("Cached file changed on disk, reloading: {}", path.display());
            state.entries.remove(i);
        }

        let read_time = SystemTime::now();
        let dataset = Arc::new(load_file(path, format_hint, options)?);
        state.entries.push(CachedFile {
            path: path.to_path_buf(),
            format_name: format_name.to_string(),
            options: options.to_vec(),
            read_time,
            dataset: Arc::clone(&dataset),
        });
        while state.entries.len() > state.capacity {
            let evicted = state.entries.remove(0);
            debug!("Evicting from cache: {}", evicted.path.display());
        }
        Ok(dataset)
    }

    /// Maximum number of cached files.
    pub fn capacity(&self) -> Result<usize> {
        Ok(self.lock()?.capacity)
    }

    /// Changes the maximum number of cached files. Extra entries are only
    /// evicted on the next insert.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        self.lock()?.capacity = capacity;
        Ok(())
    }

    /// Number of files currently cached.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drops every entry. Handles already returned stay valid.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.entries.clear();
        Ok(())
    }
}
