//! Hot-reloadable catalog handle.
//!
//! Readers clone an `Arc<CatalogSnapshot>` under a read lock held only for the
//! clone. A reload parses and compiles the new snapshot with no lock held and
//! takes the write lock only for the pointer swap, so in-flight extractions
//! keep using whichever snapshot they started with.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{CatalogError, CatalogSnapshot};
use crate::logging::event_names;

/// Source of catalog snapshots.
pub trait CatalogSource: Send + Sync {
    /// Current snapshot, loading it first if nothing is loaded yet.
    fn load(&self) -> Result<Arc<CatalogSnapshot>, CatalogError>;

    /// Check for changes and reload. `force` skips the rate limit and the
    /// modification-time comparison.
    fn reload(&self, force: bool) -> Result<Arc<CatalogSnapshot>, CatalogError>;

    /// Snapshot for one operation: reload if due, and fall back to the last
    /// good snapshot when the reload fails.
    fn acquire(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        match self.reload(false) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.load() {
                Ok(snapshot) => {
                    warn!(
                        target: event_names::CATALOG_FAILED,
                        error = %e,
                        catalog_version = %snapshot.version(),
                        "catalog reload failed; keeping last good snapshot"
                    );
                    Ok(snapshot)
                }
                Err(_) => Err(e),
            },
        }
    }
}

/// Catalog snapshot holder with modification-time based reload.
#[derive(Debug)]
pub struct CatalogHandle {
    path: Option<PathBuf>,
    reload_interval: Duration,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
    last_check: Mutex<Option<Instant>>,
}

impl CatalogHandle {
    /// Handle over the built-in catalog. Never reloads.
    pub fn builtin() -> Result<Self, CatalogError> {
        let snapshot = CatalogSnapshot::builtin()?;
        Ok(Self {
            path: None,
            reload_interval: Duration::ZERO,
            current: RwLock::new(Some(Arc::new(snapshot))),
            last_check: Mutex::new(None),
        })
    }

    /// Handle over a catalog file. The first load is attempted immediately;
    /// when it fails the handle starts empty and later loads retry.
    pub fn with_file(path: impl AsRef<Path>, reload_interval: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        let initial = match CatalogSnapshot::from_file(&path) {
            Ok(snapshot) => {
                info!(
                    target: event_names::CATALOG_LOADED,
                    path = %path.display(),
                    catalog_version = %snapshot.version(),
                    tags = snapshot.len(),
                    "tag catalog loaded"
                );
                Some(Arc::new(snapshot))
            }
            Err(e) => {
                warn!(
                    target: event_names::CATALOG_FAILED,
                    path = %path.display(),
                    error = %e,
                    "tag catalog failed to load"
                );
                None
            }
        };
        Self {
            path: Some(path),
            reload_interval,
            current: RwLock::new(initial),
            last_check: Mutex::new(Some(Instant::now())),
        }
    }

    /// Handle for the configured catalog settings.
    pub fn from_settings(settings: &mr_config::CatalogSettings) -> Result<Self, CatalogError> {
        match &settings.path {
            Some(path) => Ok(Self::with_file(
                path,
                Duration::from_secs(settings.reload_interval_secs),
            )),
            None => Self::builtin(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The active snapshot, without checking the file.
    pub fn current(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let guard = self
            .current
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        guard.clone().ok_or_else(|| {
            CatalogError::Unavailable(match &self.path {
                Some(path) => format!("{} has never loaded successfully", path.display()),
                None => "no catalog configured".to_string(),
            })
        })
    }

    fn reload_due(&self, force: bool) -> bool {
        let Ok(mut last) = self.last_check.lock() else {
            return true;
        };
        let now = Instant::now();
        let due = force
            || match *last {
                Some(at) => now.duration_since(at) >= self.reload_interval,
                None => true,
            };
        if due {
            *last = Some(now);
        }
        due
    }

    fn swap(&self, snapshot: CatalogSnapshot) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self
            .current
            .write()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        *guard = Some(snapshot.clone());
        Ok(snapshot)
    }
}

impl CatalogSource for CatalogHandle {
    fn load(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        match self.current() {
            Ok(snapshot) => Ok(snapshot),
            Err(_) => self.reload(true),
        }
    }

    fn reload(&self, force: bool) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let Some(path) = self.path.as_ref() else {
            return self.current();
        };

        if !self.reload_due(force) {
            return self.current();
        }

        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;

        if !force {
            if let Ok(current) = self.current() {
                if current.modified() == Some(modified) {
                    debug!(path = %path.display(), "catalog unchanged");
                    return Ok(current);
                }
            }
        }

        // Parse with no lock held
        let snapshot = CatalogSnapshot::from_file(path)?;
        let previous = self.current().ok().map(|s| s.version().to_string());
        let snapshot = self.swap(snapshot)?;

        info!(
            target: event_names::CATALOG_RELOADED,
            path = %path.display(),
            catalog_version = %snapshot.version(),
            previous_version = previous.as_deref().unwrap_or("none"),
            tags = snapshot.len(),
            "tag catalog reloaded"
        );

        Ok(snapshot)
    }
}
