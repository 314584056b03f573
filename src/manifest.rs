//! Parses `template.yaml` (plus any `include`d auxiliary files) into a
//! frozen [`Blueprint`].

use crate::blueprint_fs::{join, BlueprintFs};
use crate::error::{EngineError, EngineResult};
use crate::model::{Blueprint, BlueprintFile, Dependency, Hook, Variable};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// The raw shape of `template.yaml`, before include-resolution and
/// validation are applied.
#[derive(Debug, Deserialize)]
struct RawManifest {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    include: IncludeSection,
    #[serde(default)]
    variables: Vec<Variable>,
    files: Vec<BlueprintFile>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
    #[serde(default)]
    post_hooks: Vec<Hook>,
    #[serde(default)]
    metadata: IndexMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct IncludeSection {
    #[serde(default)]
    variables: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    /// Feature-toggle declarations; merged into `variables` (the data
    /// model has no separate "features" array on `Blueprint` — a
    /// feature include is just a convenient authoring split for
    /// variables that happen to gate `Config.features`).
    #[serde(default)]
    features: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IncludedVariables {
    #[serde(default)]
    variables: Vec<Variable>,
}

#[derive(Debug, Deserialize)]
struct IncludedDependencies {
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

pub struct ManifestLoader;

impl ManifestLoader {
    /// Loads and validates the blueprint rooted at `dir` inside `fs`.
    /// Returns a fully merged, validated, frozen [`Blueprint`].
    pub fn load(fs: &dyn BlueprintFs, dir: &str) -> EngineResult<Blueprint> {
        let manifest_path = join(dir, "template.yaml");
        let raw_bytes = fs.open(&manifest_path).map_err(|_| EngineError::ManifestNotFound {
            path: PathBuf::from(&manifest_path),
        })?;

        let mut raw: RawManifest =
            serde_yaml::from_slice(&raw_bytes).map_err(|e| EngineError::ManifestInvalid {
                path: PathBuf::from(&manifest_path),
                reason: e.to_string(),
            })?;

        for path in &raw.include.variables {
            let included = Self::load_section::<IncludedVariables>(fs, dir, path)?;
            raw.variables.extend(included.variables);
        }
        for path in &raw.include.features {
            let included = Self::load_section::<IncludedVariables>(fs, dir, path)?;
            raw.variables.extend(included.variables);
        }
        for path in &raw.include.dependencies {
            let included = Self::load_section::<IncludedDependencies>(fs, dir, path)?;
            raw.dependencies.extend(included.dependencies);
        }

        Self::validate(fs, dir, &raw)?;

        Ok(Blueprint {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            type_: raw.type_,
            architecture: raw.architecture,
            version: raw.version,
            variables: raw.variables,
            files: raw.files,
            dependencies: raw.dependencies,
            post_hooks: raw.post_hooks,
            metadata: raw.metadata,
        })
    }

    fn load_section<T: for<'de> Deserialize<'de>>(
        fs: &dyn BlueprintFs,
        dir: &str,
        rel_path: &str,
    ) -> EngineResult<T> {
        let path = join(dir, rel_path);
        let bytes = fs.open(&path).map_err(|_| EngineError::ManifestInvalid {
            path: PathBuf::from(&path),
            reason: "included file not found".to_string(),
        })?;
        serde_yaml::from_slice(&bytes).map_err(|e| EngineError::ManifestInvalid {
            path: PathBuf::from(&path),
            reason: e.to_string(),
        })
    }

    fn validate(fs: &dyn BlueprintFs, dir: &str, raw: &RawManifest) -> EngineResult<()> {
        let manifest_path = PathBuf::from(join(dir, "template.yaml"));
        if raw.id.trim().is_empty() {
            return Err(EngineError::ManifestInvalid {
                path: manifest_path,
                reason: "id must not be empty".to_string(),
            });
        }
        if raw.files.is_empty() {
            return Err(EngineError::ManifestInvalid {
                path: manifest_path,
                reason: "blueprint declares no files".to_string(),
            });
        }

        let mut seen_names = HashSet::new();
        for var in &raw.variables {
            if !seen_names.insert(var.name.clone()) {
                return Err(EngineError::ManifestInvalid {
                    path: manifest_path,
                    reason: format!(
                        "variable '{}' is declared more than once across the manifest and its includes",
                        var.name
                    ),
                });
            }
            if let Some(choices) = &var.choices {
                if choices.is_empty() {
                    return Err(EngineError::ManifestInvalid {
                        path: manifest_path,
                        reason: format!("variable '{}' declares an empty choices list", var.name),
                    });
                }
            }
        }

        for file in &raw.files {
            if !fs.exists(&join(dir, &file.source)) {
                return Err(EngineError::ManifestInvalid {
                    path: manifest_path,
                    reason: format!("source template not found: {}", file.source),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint_fs::DirBlueprintFs;
    use std::fs;

    fn write_minimal_blueprint(root: &std::path::Path) {
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(
            root.join("lib/template.yaml"),
            r#"
id: lib-standard
name: Standard library
type: library
variables:
  - name: ProjectName
    type: string
    required: true
files:
  - source: main.go.tmpl
    destination: "{{ProjectName}}.go"
"#,
        )
        .unwrap();
        fs::write(root.join("lib/main.go.tmpl"), "package {{ProjectName}}\n").unwrap();
    }

    #[test]
    fn loads_minimal_blueprint() {
        let dir = tempfile::tempdir().unwrap();
        write_minimal_blueprint(dir.path());
        let fs_ = DirBlueprintFs::new(dir.path());
        let bp = ManifestLoader::load(&fs_, "lib").unwrap();
        assert_eq!(bp.id, "lib-standard");
        assert_eq!(bp.files.len(), 1);
    }

    #[test]
    fn missing_manifest_is_manifest_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        let fs_ = DirBlueprintFs::new(dir.path());
        let err = ManifestLoader::load(&fs_, "empty").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ManifestNotFound);
    }

    #[test]
    fn dangling_source_is_manifest_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bad")).unwrap();
        fs::write(
            dir.path().join("bad/template.yaml"),
            r#"
id: bad
name: bad
type: library
files:
  - source: missing.tmpl
    destination: out.go
"#,
        )
        .unwrap();
        let fs_ = DirBlueprintFs::new(dir.path());
        let err = ManifestLoader::load(&fs_, "bad").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ManifestInvalid);
    }

    #[test]
    fn duplicate_variable_across_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dup/config")).unwrap();
        fs::write(
            dir.path().join("dup/template.yaml"),
            r#"
id: dup
name: dup
type: library
include:
  variables:
    - config/variables.yaml
variables:
  - name: ProjectName
    type: string
files:
  - source: main.go.tmpl
    destination: out.go
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("dup/config/variables.yaml"),
            "variables:\n  - name: ProjectName\n    type: string\n",
        )
        .unwrap();
        fs::write(dir.path().join("dup/main.go.tmpl"), "package dup\n").unwrap();
        let fs_ = DirBlueprintFs::new(dir.path());
        let err = ManifestLoader::load(&fs_, "dup").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ManifestInvalid);
    }
}
