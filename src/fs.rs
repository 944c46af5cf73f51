//! Filesystem abstraction
//!
//! Every file operation of the installer and the checker driver goes
//! through [`ReaderWriter`], so the whole suite can run against
//! [`MemoryFs`].

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

/// What `stat` reports about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

pub trait ReaderWriter: Send + Sync {
    /// Kind of the entry at `path`; `NotFound` if it does not exist
    fn stat(&self, path: &Path) -> io::Result<FileKind>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    /// Every file below `dir`, recursively and sorted; empty if `dir` is missing
    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// The real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl ReaderWriter for OsFs {
    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        let meta = std::fs::metadata(path)?;
        Ok(if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        })
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// An in-memory filesystem keyed by lexically normalized paths
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parent directories
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            let _ = self.mkdir_all(parent);
        }
        let _ = self.write_file(path, contents.as_ref());
        self
    }

    /// All file paths currently stored, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory filesystem lock poisoned")
}

impl ReaderWriter for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        let path = normalize_path(path);
        if self.files.lock().map_err(|_| poisoned())?.contains_key(&path) {
            return Ok(FileKind::File);
        }
        if path.as_os_str().is_empty()
            || self.dirs.lock().map_err(|_| poisoned())?.contains(&path)
        {
            return Ok(FileKind::Directory);
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: no such file or directory", path.display()),
        ))
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize_path(path);
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .get(&path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: no such file or directory", path.display()),
                )
            })
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let path = normalize_path(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty()
                && !self.dirs.lock().map_err(|_| poisoned())?.contains(parent)
            {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: parent directory does not exist", path.display()),
                ));
            }
        }
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .insert(path, data.to_vec());
        Ok(())
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize_path(path);
        let mut dirs = self.dirs.lock().map_err(|_| poisoned())?;
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            dirs.insert(current.clone());
        }
        Ok(())
    }

    fn walk_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let dir = normalize_path(dir);
        let files = self.files.lock().map_err(|_| poisoned())?;
        Ok(files
            .keys()
            .filter(|path| path.starts_with(&dir))
            .cloned()
            .collect())
    }
}

/// `path` made absolute against the working directory, then normalized
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(_) => normalize_path(path),
    }
}

/// Lexically normalize a path: drop `.` and resolve `..` without touching disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
