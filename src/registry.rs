//! Indexes loaded blueprints by id, type, and (type, architecture).

use crate::blueprint_fs::{BlueprintFs, EntryKind};
use crate::error::{EngineError, EngineResult};
use crate::manifest::ManifestLoader;
use crate::model::{Blueprint, Stage, Warning};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<String, Blueprint>,
    by_type: HashMap<String, Vec<String>>,
    by_type_architecture: HashMap<(String, String), Vec<String>>,
    /// Maps blueprint id to the directory it was loaded from in the
    /// blueprint FS, so the Plan Builder can re-open template sources
    /// at generate time without the `Blueprint` record itself
    /// carrying file contents.
    dirs: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks the blueprint FS root, loading every subdirectory as a
    /// blueprint. A single malformed blueprint does not abort startup
    /// — it is recorded as a loader warning and excluded from the
    /// registry, so the rest remain available.
    pub fn load_all(fs: &dyn BlueprintFs) -> EngineResult<(Self, Vec<Warning>)> {
        let mut registry = Self::new();
        let mut warnings = Vec::new();

        let entries = fs.read_dir("")?;
        for entry in entries {
            if entry.kind != EntryKind::Directory {
                continue;
            }
            match ManifestLoader::load(fs, &entry.path) {
                Ok(bp) => {
                    let dir = entry.path.clone();
                    let id = bp.id.clone();
                    if let Err(err) = registry.register_with_dir(bp, dir) {
                        tracing::warn!(dir = %entry.path, error = %err, "failed to register blueprint");
                        warnings.push(Warning {
                            stage: Stage::Loader,
                            message: format!("{}: {}", entry.path, err),
                        });
                    } else {
                        tracing::debug!(blueprint = %id, dir = %entry.path, "loaded blueprint {}", id);
                    }
                }
                Err(err) => {
                    tracing::warn!(dir = %entry.path, error = %err, "failed to load blueprint manifest");
                    warnings.push(Warning {
                        stage: Stage::Loader,
                        message: format!("{}: {}", entry.path, err),
                    });
                }
            }
        }

        Ok((registry, warnings))
    }

    pub fn register(&mut self, bp: Blueprint) -> EngineResult<()> {
        let id = bp.id.clone();
        self.register_with_dir(bp, id)
    }

    /// Registers `bp`, remembering `dir` as the blueprint FS directory
    /// it was loaded from so the Plan Builder can later re-open its
    /// template sources. Tests that build synthetic blueprints with no
    /// FS backing can use [`Registry::register`], which defaults `dir`
    /// to the blueprint's own id.
    pub fn register_with_dir(&mut self, bp: Blueprint, dir: String) -> EngineResult<()> {
        if self.by_id.contains_key(&bp.id) {
            return Err(EngineError::DuplicateId { id: bp.id.clone() });
        }
        self.by_type
            .entry(bp.type_.clone())
            .or_default()
            .push(bp.id.clone());
        if let Some(arch) = &bp.architecture {
            self.by_type_architecture
                .entry((bp.type_.clone(), arch.clone()))
                .or_default()
                .push(bp.id.clone());
        }
        self.dirs.insert(bp.id.clone(), dir);
        self.by_id.insert(bp.id.clone(), bp);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Blueprint> {
        self.by_id.get(id)
    }

    /// The blueprint FS directory `id` was loaded from, for re-opening
    /// its template sources at generate time.
    pub fn get_dir(&self, id: &str) -> Option<&str> {
        self.dirs.get(id).map(|s| s.as_str())
    }

    pub fn list(&self) -> impl Iterator<Item = &Blueprint> {
        self.by_id.values()
    }

    pub fn get_by_type(&self, type_: &str) -> Vec<&Blueprint> {
        self.by_type
            .get(type_)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Resolves a `Config`'s `(type, architecture)` selector against the
    /// registry, matching `§4.3`/data-flow's `Registry.Lookup`.
    pub fn lookup(&self, type_: &str, architecture: Option<&str>) -> EngineResult<&Blueprint> {
        if let Some(arch) = architecture {
            if let Some(ids) = self.by_type_architecture.get(&(type_.to_string(), arch.to_string())) {
                if let Some(id) = ids.first() {
                    return Ok(self.by_id.get(id).expect("indexed id is registered"));
                }
            }
            return Err(EngineError::UnknownBlueprint {
                type_: type_.to_string(),
                architecture: Some(arch.to_string()),
            });
        }
        self.by_type
            .get(type_)
            .and_then(|ids| ids.first())
            .and_then(|id| self.by_id.get(id))
            .ok_or_else(|| EngineError::UnknownBlueprint {
                type_: type_.to_string(),
                architecture: None,
            })
    }
}
