//! Build session persistence between incremental builds.
//!
//! - [`FileSessionCache`] stores the session as JSON
//! - [`NullSessionCache`] never stores anything
//!
//! ```json
//! {
//!     "fragment_pages": ["changelog"],
//!     "fragment_paths": ["/project/newsfragments/123.feature.md"]
//! }
//! ```

use std::fs;
use std::path::PathBuf;

use crate::session::BuildSession;

/// Cache file name inside the cache directory.
const SESSION_FILENAME: &str = "towncrier-session.json";

/// Storage for the [`BuildSession`] of the previous build.
pub trait SessionCache: Send + Sync {
    /// Retrieve the stored session.
    ///
    /// Returns `None` when nothing is stored or the stored data is invalid.
    fn get(&self) -> Option<BuildSession>;

    /// Store the session.
    fn set(&self, session: &BuildSession);

    /// Remove the stored session.
    fn invalidate(&self);
}

/// Cache used when persistence is disabled.
pub struct NullSessionCache;

impl SessionCache for NullSessionCache {
    fn get(&self) -> Option<BuildSession> {
        None
    }

    fn set(&self, _session: &BuildSession) {}

    fn invalidate(&self) {}
}

/// Session stored as `{cache_dir}/towncrier-session.json`.
///
/// Write failures are logged at debug level and otherwise ignored; the next
/// build then starts from an empty session.
pub struct FileSessionCache {
    cache_dir: PathBuf,
}

impl FileSessionCache {
    /// Create a cache storing its file in `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILENAME)
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self) -> Option<BuildSession> {
        let content = fs::read_to_string(self.cache_path()).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unreadable towncrier session");
                None
            }
        }
    }

    fn set(&self, session: &BuildSession) {
        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            tracing::debug!(error = %e, "Failed to create cache directory");
            return;
        }

        let content = match serde_json::to_string(session) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to serialize towncrier session");
                return;
            }
        };

        if let Err(e) = fs::write(self.cache_path(), content) {
            tracing::debug!(error = %e, "Failed to write towncrier session");
        }
    }

    fn invalidate(&self) {
        let cache_path = self.cache_path();
        if cache_path.exists()
            && let Err(e) = fs::remove_file(&cache_path)
        {
            tracing::debug!(error = %e, "Failed to remove towncrier session");
        }
    }
}
