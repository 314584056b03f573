//! Read-only virtual filesystem the registry and manifest loader walk.
//!
//! Production code is backed by [`EmbeddedBlueprintFs`], an image
//! compiled into the binary via `rust-embed`. Tests back the same
//! trait with [`DirBlueprintFs`], a thin wrapper over an on-disk
//! directory, so fixtures never need the embed macro to run.

use rust_embed::RustEmbed;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Slash-separated path relative to the blueprint root.
    pub path: String,
    pub kind: EntryKind,
}

/// A read-only directory tree of blueprint content. Paths are
/// slash-separated and relative to the root, regardless of host OS.
pub trait BlueprintFs {
    fn open(&self, path: &str) -> std::io::Result<Vec<u8>>;
    fn read_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>>;
    fn stat(&self, path: &str) -> std::io::Result<EntryKind>;

    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }
}

/// The compiled-in blueprint catalog. The `folder` attribute points at
/// the workspace's bundled blueprint sources at compile time; nothing
/// under it is writable at runtime.
#[derive(RustEmbed)]
#[folder = "blueprints/"]
pub struct EmbeddedAssets;

pub struct EmbeddedBlueprintFs;

impl BlueprintFs for EmbeddedBlueprintFs {
    fn open(&self, path: &str) -> std::io::Result<Vec<u8>> {
        EmbeddedAssets::get(path)
            .map(|f| f.data.into_owned())
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
    }

    fn read_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let mut seen = std::collections::BTreeSet::new();
        let mut entries = Vec::new();
        for file in EmbeddedAssets::iter() {
            let file = file.as_ref();
            let Some(rest) = file.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.split_once('/') {
                Some((dir, _)) => {
                    if seen.insert(dir.to_string()) {
                        entries.push(DirEntry {
                            path: format!("{prefix}{dir}"),
                            kind: EntryKind::Directory,
                        });
                    }
                }
                None => entries.push(DirEntry {
                    path: format!("{prefix}{rest}"),
                    kind: EntryKind::File,
                }),
            }
        }
        Ok(entries)
    }

    fn stat(&self, path: &str) -> std::io::Result<EntryKind> {
        if EmbeddedAssets::get(path).is_some() {
            return Ok(EntryKind::File);
        }
        let dir_prefix = format!("{}/", path.trim_end_matches('/'));
        if EmbeddedAssets::iter().any(|f| f.as_ref().starts_with(dir_prefix.as_str())) {
            return Ok(EntryKind::Directory);
        }
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
    }
}

/// Backs the same [`BlueprintFs`] contract with a plain on-disk
/// directory, for registry/manifest-loader tests that construct
/// throwaway fixture trees under a `tempfile::TempDir`.
pub struct DirBlueprintFs {
    root: PathBuf,
}

impl DirBlueprintFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BlueprintFs for DirBlueprintFs {
    fn open(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn read_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>> {
        let dir = self.resolve(path);
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let name = entry.file_name();
            let rel = if path.is_empty() {
                name.to_string_lossy().to_string()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name.to_string_lossy())
            };
            entries.push(DirEntry {
                path: rel,
                kind: if file_type.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn stat(&self, path: &str) -> std::io::Result<EntryKind> {
        let meta = std::fs::symlink_metadata(self.resolve(path))?;
        if meta.is_symlink() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "symlinks are not permitted inside a blueprint tree",
            ));
        }
        Ok(if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }
}

/// Joins a blueprint-relative path to a directory id, normalizing to
/// `/`-separated form regardless of host path conventions.
pub fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rel)
    }
}

pub fn as_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
