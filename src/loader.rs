//! Source lookup by path: the host supplies *something* that can turn an
//! `import`/`dialect` path into source text. Filesystem probing (relative
//! paths, extension inference, a module search path) is a host concern that
//! lives above this crate — see `lib.rs`'s module doc.

use std::collections::HashMap;

/// Turns a module path as written in source (`import "collections/list"`)
/// into source text, or `None` if the host has nothing for it.
pub trait ModuleLoader {
    fn load(&self, path: &str) -> Option<String>;
}

/// A loader that resolves nothing — useful for evaluating a single module
/// with no imports, or as a placeholder before a real loader is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoader;

impl ModuleLoader for NullLoader {
    fn load(&self, _path: &str) -> Option<String> {
        None
    }
}

/// A loader backed by an in-memory path-to-source table, built up with
/// [`MapLoader::with`] — what tests and embedders reach for when the source
/// isn't coming from a filesystem at all.
#[derive(Debug, Clone, Default)]
pub struct MapLoader {
    sources: HashMap<String, String>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self { sources: HashMap::new() }
    }

    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl ModuleLoader for MapLoader {
    fn load(&self, path: &str) -> Option<String> {
        self.sources.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_loader_resolves_nothing() {
        assert_eq!(NullLoader.load("anything"), None);
    }

    #[test]
    fn map_loader_returns_registered_source() {
        let loader = MapLoader::new().with("a", "def x = 1");
        assert_eq!(loader.load("a").as_deref(), Some("def x = 1"));
        assert_eq!(loader.load("b"), None);
    }
}
