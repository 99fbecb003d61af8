//! ChannelRegistry - one shared channel per path.
//!
//! ```text
//! get_channel("core/")  ─┐
//! get_channel("/core")  ─┼──► normalize ──► "/core" ──► same Arc<dyn Channel>
//! get_channel(" /core ")─┘
//! ```
//!
//! Channels are opened on first lookup and kept for the registry's
//! lifetime. Lookup and creation share one lock, so concurrent first
//! lookups of a path open exactly one channel.

use super::{Channel, ChannelError, ChannelFactory, LocalChannelFactory};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Path → channel table.
pub struct ChannelRegistry {
    factory: Arc<dyn ChannelFactory>,
    channels: Mutex<HashMap<String, Arc<dyn Channel>>>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            factory,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Registry backed by in-process [`LocalChannel`](super::LocalChannel)s.
    #[must_use]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalChannelFactory::new()))
    }

    /// Returns the channel for `path`, opening it on first use.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidPath`] for malformed paths, or whatever the
    /// factory reports when opening fails. A failed open is not cached.
    pub fn get_channel(&self, path: &str) -> Result<Arc<dyn Channel>, ChannelError> {
        let path = normalize_path(path)?;
        let mut channels = self.channels.lock();
        if let Some(channel) = channels.get(&path) {
            return Ok(Arc::clone(channel));
        }

        let channel = self.factory.open(&path)?;
        tracing::debug!(%path, "channel opened");
        channels.insert(path, Arc::clone(&channel));
        Ok(channel)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        normalize_path(path).is_ok_and(|path| self.channels.lock().contains_key(&path))
    }

    /// Open channel paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.channels.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("paths", &self.paths())
            .finish_non_exhaustive()
    }
}

/// Canonical form of a channel path.
///
/// Surrounding whitespace and trailing slashes are removed and a leading
/// slash is added; the empty path is `/`.
///
/// # Errors
///
/// [`ChannelError::InvalidPath`] when the path contains whitespace or
/// control characters after trimming.
///
/// # Example
///
/// ```
/// use trellis_runtime::channel::normalize_path;
///
/// assert_eq!(normalize_path("core").expect("valid"), "/core");
/// assert_eq!(normalize_path("/core/").expect("valid"), "/core");
/// assert_eq!(normalize_path("").expect("valid"), "/");
/// assert!(normalize_path("/co re").is_err());
/// ```
pub fn normalize_path(path: &str) -> Result<String, ChannelError> {
    let trimmed = path.trim();
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ChannelError::InvalidPath {
            path: path.to_string(),
        });
    }
    let body = trimmed.trim_matches('/');
    Ok(format!("/{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LocalChannelFactory;

    fn registry() -> (ChannelRegistry, Arc<LocalChannelFactory>) {
        let factory = Arc::new(LocalChannelFactory::new());
        let registry = ChannelRegistry::new(Arc::clone(&factory) as Arc<dyn ChannelFactory>);
        (registry, factory)
    }

    #[test]
    fn same_path_same_instance() {
        let (registry, factory) = registry();
        let a = registry.get_channel("/core").expect("open");
        let b = registry.get_channel("/core").expect("open");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.opened(), 1);
    }

    #[test]
    fn spellings_share_a_channel() {
        let (registry, factory) = registry();
        let a = registry.get_channel("core").expect("open");
        let b = registry.get_channel(" /core/ ").expect("open");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.path(), "/core");
        assert_eq!(factory.opened(), 1);
        assert!(registry.contains("core/"));
    }

    #[test]
    fn distinct_paths_distinct_channels() {
        let (registry, _) = registry();
        let core = registry.get_channel("/core").expect("open");
        let admin = registry.get_channel("/admin").expect("open");
        assert!(!Arc::ptr_eq(&core, &admin));
        assert_eq!(registry.paths(), vec!["/admin", "/core"]);
    }

    #[test]
    fn nested_paths_keep_inner_slashes() {
        assert_eq!(normalize_path("/a/b/").expect("valid"), "/a/b");
        assert_eq!(normalize_path("///").expect("valid"), "/");
    }

    #[test]
    fn invalid_path_opens_nothing() {
        let (registry, factory) = registry();
        assert!(registry.get_channel("/bad path").is_err());
        assert_eq!(factory.opened(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_lookups_open_once() {
        let (registry, factory) = registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_channel("/core").expect("open"))
            })
            .collect();
        let channels: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        assert_eq!(factory.opened(), 1);
        assert!(channels.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
