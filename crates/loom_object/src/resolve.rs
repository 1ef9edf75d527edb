//! Locating the units a unit being read depends on.

use crate::error::CodecError;
use crate::ids::ArenaId;
use crate::store::Store;

/// Supplies the arena for a dependency key while a unit is read.
///
/// Implementations may return an arena that is already loaded or read the
/// unit on demand (recursively resolving its own dependencies). A key that
/// cannot be supplied is reported as [`CodecError::UnresolvedDependency`].
pub trait DependencyResolver {
    /// Returns the frozen arena for `key`.
    fn resolve(&mut self, store: &mut Store, key: &str) -> Result<ArenaId, CodecError>;
}

impl<F> DependencyResolver for F
where
    F: FnMut(&mut Store, &str) -> Result<ArenaId, CodecError>,
{
    fn resolve(&mut self, store: &mut Store, key: &str) -> Result<ArenaId, CodecError> {
        self(store, key)
    }
}

/// Resolves only against arenas already present in the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadedOnly;

impl DependencyResolver for LoadedOnly {
    fn resolve(&mut self, store: &mut Store, key: &str) -> Result<ArenaId, CodecError> {
        store
            .arena_by_key(key)
            .ok_or_else(|| CodecError::UnresolvedDependency {
                key: key.to_string(),
                reason: "unit is not loaded".to_string(),
            })
    }
}
