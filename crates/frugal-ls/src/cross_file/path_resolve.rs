//
// cross_file/path_resolve.rs
//
// Include path resolution
//

use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use lru::LruCache;
use tower_lsp::lsp_types::Url;

/// Default number of cached (including URI, include text) resolutions
pub const DEFAULT_INCLUDE_CACHE_CAPACITY: usize = 1024;

/// Resolves include targets to document URIs.
///
/// Resolution is purely syntactic: the first candidate path that can be
/// built is accepted without checking that the file exists. Candidates are
/// the target joined to the including file's directory, then the target
/// joined to each workspace root in configured order.
pub struct IncludeResolver {
    roots: RwLock<Vec<PathBuf>>,
    /// (including URI, raw include text) -> resolved URI
    cache: Mutex<LruCache<(Url, String), Option<Url>>>,
}

// LruCache doesn't derive Debug
impl std::fmt::Debug for IncludeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeResolver")
            .field("roots", &self.workspace_roots())
            .finish_non_exhaustive()
    }
}

impl Default for IncludeResolver {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_INCLUDE_CACHE_CAPACITY)
    }
}

impl IncludeResolver {
    pub fn new(roots: Vec<PathBuf>, cache_capacity: usize) -> Self {
        Self {
            roots: RwLock::new(roots),
            cache: Mutex::new(LruCache::new(capacity_or_default(cache_capacity))),
        }
    }

    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the fallback roots. Cached resolutions are dropped.
    pub fn set_workspace_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.write().unwrap_or_else(PoisonError::into_inner) = roots;
        self.clear_cache();
    }

    pub fn set_cache_capacity(&self, capacity: usize) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resize(capacity_or_default(capacity));
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Resolve `target` as written in an include directive of `from`.
    ///
    /// Returns `None` when no candidate path can be built (for example when
    /// `from` is not a file URI or the target is empty).
    pub fn resolve(&self, from: &Url, target: &str) -> Option<Url> {
        let key = (from.clone(), target.to_string());
        if let Some(cached) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return cached.clone();
        }

        let resolved = self.resolve_uncached(from, target);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, from: &Url, target: &str) -> Option<Url> {
        if target.is_empty() {
            log::trace!("Include resolution: empty target in {}", from);
            return None;
        }

        let file_dir = from
            .to_file_path()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        if let Some(uri) = file_dir.and_then(|dir| candidate_uri(&dir, target)) {
            log::trace!("Resolved include '{}' in {} to {}", target, from, uri);
            return Some(uri);
        }

        for root in self.workspace_roots() {
            if let Some(uri) = candidate_uri(&root, target) {
                log::trace!(
                    "Resolved include '{}' in {} via workspace root '{}': {}",
                    target,
                    from,
                    root.display(),
                    uri
                );
                return Some(uri);
            }
        }

        log::trace!("Could not resolve include '{}' in {}", target, from);
        None
    }
}

fn capacity_or_default(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Build the candidate for `target` relative to `base` (absolute targets
/// ignore `base`)
fn candidate_uri(base: &Path, target: &str) -> Option<Url> {
    let joined = base.join(target);
    let normalized = normalize_path(&joined)?;
    path_to_uri(&normalized)
}

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop a Normal segment; RootDir and Prefix stay
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }

    let mut result = PathBuf::new();
    for c in components {
        result.push(c);
    }
    Some(result)
}

/// Convert an absolute path to a file URI
pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Convert a file URI to its path
pub fn uri_to_path(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_relative_include() {
        let resolver = IncludeResolver::default();
        let from = url("file:///project/idl/user.frugal");
        assert_eq!(
            resolver.resolve(&from, "base.frugal"),
            Some(url("file:///project/idl/base.frugal"))
        );
        assert_eq!(
            resolver.resolve(&from, "../shared/./common.thrift"),
            Some(url("file:///project/shared/common.thrift"))
        );
    }

    #[test]
    fn test_resolve_absolute_include() {
        let resolver = IncludeResolver::default();
        let from = url("file:///project/idl/user.frugal");
        assert_eq!(
            resolver.resolve(&from, "/opt/idl/base.frugal"),
            Some(url("file:///opt/idl/base.frugal"))
        );
    }

    #[test]
    fn test_file_relative_candidate_wins_over_roots() {
        // the first candidate is accepted without an existence check
        let resolver = IncludeResolver::new(vec![PathBuf::from("/shared")], 16);
        let from = url("file:///project/user.frugal");
        assert_eq!(
            resolver.resolve(&from, "base.frugal"),
            Some(url("file:///project/base.frugal"))
        );
    }

    #[test]
    fn test_roots_used_when_file_has_no_directory() {
        let resolver = IncludeResolver::new(
            vec![PathBuf::from("relative/root"), PathBuf::from("/shared")],
            16,
        );
        let from = url("file:///");
        assert_eq!(
            resolver.resolve(&from, "base.frugal"),
            Some(url("file:///shared/base.frugal"))
        );
    }

    #[test]
    fn test_unresolvable_includes() {
        let resolver = IncludeResolver::default();
        assert_eq!(resolver.resolve(&url("file:///project/a.frugal"), ""), None);
        assert_eq!(resolver.resolve(&url("untitled:Untitled-1"), "base.frugal"), None);
    }

    #[test]
    fn test_cache_and_root_change() {
        let resolver = IncludeResolver::new(Vec::new(), 16);
        let from = url("file:///");
        assert_eq!(resolver.resolve(&from, "base.frugal"), None);
        assert_eq!(resolver.cache_len(), 1);

        resolver.set_workspace_roots(vec![PathBuf::from("/shared")]);
        assert_eq!(resolver.cache_len(), 0);
        assert_eq!(
            resolver.resolve(&from, "base.frugal"),
            Some(url("file:///shared/base.frugal"))
        );
    }

    #[test]
    fn test_cache_is_bounded() {
        let resolver = IncludeResolver::new(Vec::new(), 2);
        let from = url("file:///project/a.frugal");
        for target in ["a.frugal", "b.frugal", "c.frugal"] {
            resolver.resolve(&from, target);
        }
        assert_eq!(resolver.cache_len(), 2);

        resolver.set_cache_capacity(0);
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            Some(PathBuf::from("/a/c/d"))
        );
        assert_eq!(normalize_path(Path::new("/../x")), Some(PathBuf::from("/x")));
        assert_eq!(normalize_path(Path::new("")), None);
    }

    #[test]
    fn test_uri_path_round_trip() {
        let path = PathBuf::from("/project/idl/user.frugal");
        let uri = path_to_uri(&path).unwrap();
        assert_eq!(uri.as_str(), "file:///project/idl/user.frugal");
        assert_eq!(uri_to_path(&uri), Some(path));
    }
}
