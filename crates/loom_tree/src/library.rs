//! On-disk unit library.
//!
//! Units are stored as `<dir>/<key>.<extension>`, one file per frozen arena,
//! in the framed format written by [`loom_object::write`]. A [`Library`] is
//! also the default [`DependencyResolver`]: reading a unit loads the units
//! it depends on from the same directory.

use crate::tree::Tree;
use loom_config::LibraryConfig;
use loom_object::{ArenaId, CodecError, DependencyResolver, ObjectId, Store};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

fn io_error(path: &Path, source: std::io::Error) -> CodecError {
    CodecError::Io {
        context: path.display().to_string(),
        source,
    }
}

/// A directory of persisted units.
#[derive(Debug)]
pub struct Library {
    dir: PathBuf,
    extension: String,
    /// Keys being read, innermost last.
    loading: Vec<String>,
}

impl Library {
    /// Creates a library rooted at `dir` storing files with `extension`.
    pub fn new(dir: &Path, extension: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
            loading: Vec::new(),
        }
    }

    /// Creates the library described by the `[library]` section of
    /// `loom.toml`, relative to `project_dir`.
    pub fn from_config(project_dir: &Path, config: &LibraryConfig) -> Self {
        Self::new(&project_dir.join(&config.path), &config.extension)
    }

    /// Returns the library directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file that holds unit `key`.
    pub fn unit_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.extension))
    }

    /// Returns `true` if unit `key` has been stored.
    pub fn contains(&self, key: &str) -> bool {
        self.unit_path(key).is_file()
    }

    fn ensure_dir(&self) -> Result<(), CodecError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))
    }

    /// Freezes the unit containing `unit` and writes it. Returns the path
    /// written.
    pub fn store(&self, store: &mut Store, unit: Tree) -> Result<PathBuf, CodecError> {
        self.ensure_dir()?;
        if let Some(current) = store.current_arena() {
            store.freeze(current);
        }
        store.freeze(unit.arena());
        self.write_unit(store, unit.id())
    }

    /// Writes the unit containing `unit` and every unit it depends on,
    /// dependencies first. Returns the paths written in order.
    pub fn store_recursive(&self, store: &mut Store, unit: Tree) -> Result<Vec<PathBuf>, CodecError> {
        self.ensure_dir()?;
        if let Some(current) = store.current_arena() {
            store.freeze(current);
        }
        store.freeze(unit.arena());

        let mut written = Vec::new();
        for arena in store.dependency_order(unit.arena()) {
            let root = if arena == unit.arena() {
                Some(unit.id())
            } else {
                store.unit_root(arena)
            };
            if let Some(root) = root {
                written.push(self.write_unit(store, root)?);
            }
        }
        Ok(written)
    }

    fn write_unit(&self, store: &mut Store, root: ObjectId) -> Result<PathBuf, CodecError> {
        let key = match store.arena(root.arena).key() {
            Some(key) => key.to_string(),
            None => store.fail(format_args!("arena {} has no key after freezing", root.arena)),
        };
        let path = self.unit_path(&key);
        let mut bytes = Vec::new();
        loom_object::write(store, root, &mut bytes)?;
        std::fs::write(&path, &bytes).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }

    /// Returns the root of unit `key`, reading it (and, transitively, its
    /// dependencies) unless a unit with that key is already in the store.
    pub fn load(&mut self, store: &mut Store, key: &str) -> Result<Tree, CodecError> {
        let root = self.load_unit(store, key)?;
        Tree::from_id(store, root).ok_or_else(|| CodecError::TagMismatch {
            expected: "tree".to_string(),
            actual: store.class(store.tag(root)).name.to_string(),
        })
    }

    fn load_unit(&mut self, store: &mut Store, key: &str) -> Result<ObjectId, CodecError> {
        if let Some(root) = store.arena_by_key(key).and_then(|arena| store.unit_root(arena)) {
            return Ok(root);
        }
        if self.loading.iter().any(|k| k == key) {
            return Err(CodecError::UnresolvedDependency {
                key: key.to_string(),
                reason: format!("circular dependency through {}", self.loading.join(" -> ")),
            });
        }

        let path = self.unit_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CodecError::UnresolvedDependency {
                    key: key.to_string(),
                    reason: format!("no unit file at {}", path.display()),
                })
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        self.loading.push(key.to_string());
        let result = loom_object::read(store, &mut bytes.as_slice(), self);
        self.loading.pop();
        result
    }
}

impl DependencyResolver for Library {
    fn resolve(&mut self, store: &mut Store, key: &str) -> Result<ArenaId, CodecError> {
        self.load_unit(store, key).map(|root| root.arena)
    }
}
