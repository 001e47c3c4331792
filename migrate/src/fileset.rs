//! Read-only filesystem capability and the migration file loader.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dedent::dedent;
use crate::error::Error;

/// A read-only view of a migration tree.
///
/// Production roots at an OS directory via [DirFs]; tests plug in
/// [MemoryFs]. Paths are relative to the root and use `/` separators.
pub trait FileSystem {
    /// Every regular file under the root as (relative path, raw contents),
    /// traversing nested directories. A missing root yields
    /// [Error::NoMigrations].
    fn files(&self) -> Result<BTreeMap<String, String>, Error>;
}

/// An OS directory rooted at the migrations directory.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileSystem for DirFs {
    fn files(&self) -> Result<BTreeMap<String, String>, Error> {
        if !self.root.is_dir() {
            return Err(Error::NoMigrations);
        }
        let mut files = BTreeMap::new();
        walk(&self.root, "", &mut files)?;
        Ok(files)
    }
}

fn walk(dir: &Path, prefix: &str, files: &mut BTreeMap<String, String>) -> Result<(), Error> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            walk(&entry.path(), &rel, files)?;
        } else {
            files.insert(rel, fs::read_to_string(entry.path())?);
        }
    }
    Ok(())
}

/// An in-memory file tree, for tests and embedded migration sets.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl<P: Into<String>, C: Into<String>, const N: usize> From<[(P, C); N]> for MemoryFs {
    fn from(entries: [(P, C); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for MemoryFs {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

impl FileSystem for MemoryFs {
    fn files(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(self.files.clone())
    }
}

/// Load every file from `fsys`, dedent and trim its contents, and normalize
/// its path by stripping leading and trailing separators.
pub(crate) fn load_files(fsys: &dyn FileSystem) -> Result<BTreeMap<String, String>, Error> {
    let mut files = BTreeMap::new();
    for (path, contents) in fsys.files()? {
        let normpath = path.trim_matches('/').to_string();
        files.insert(normpath, dedent(&contents).trim().to_string());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_maps_to_no_migrations() {
        let fsys = DirFs::new("does/not/exist");
        assert!(matches!(fsys.files(), Err(Error::NoMigrations)));
    }

    #[test]
    fn walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("001_teams.up.sql"), "CREATE TABLE teams;").unwrap();
        fs::write(dir.path().join("archive").join("notes.txt"), "n").unwrap();

        let files = DirFs::new(dir.path()).files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["001_teams.up.sql"], "CREATE TABLE teams;");
        assert_eq!(files["archive/notes.txt"], "n");
    }

    #[test]
    fn loader_dedents_and_trims() {
        let fsys = MemoryFs::from([(
            "/001_teams.up.sql/",
            "\n    CREATE TABLE teams (\n      id integer\n    );\n",
        )]);
        let files = load_files(&fsys).unwrap();
        assert_eq!(
            files["001_teams.up.sql"],
            "CREATE TABLE teams (\n  id integer\n);"
        );
    }

    #[test]
    fn empty_tree_loads_as_an_empty_map() {
        let files = load_files(&MemoryFs::new()).unwrap();
        assert!(files.is_empty());
    }
}
