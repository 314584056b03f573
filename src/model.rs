//! Data model shared by every stage of the synthesis pipeline.
//!
//! A `Blueprint` is loaded once at startup and frozen; a `Config` is
//! supplied per `Generate` call and never mutated; a `ResolvedVars` is
//! the flattened product the Predicate Evaluator and Template Renderer
//! consult. See `crate::generator` for how these flow through one call.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A named parameter a blueprint author exposes for the caller to
/// supply or default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub validation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Bool,
    Choice,
    List,
}

/// One potential emission: a template source paired with a
/// (possibly templated) destination and an optional guarding
/// condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintFile {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub executable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub module: String,
    pub version: String,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
}

/// An immutable record describing how to synthesize one project
/// variant. Constructed once by the Manifest Loader and never mutated
/// afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    pub files: Vec<BlueprintFile>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub post_hooks: Vec<Hook>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseFeature {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub orm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationFeature {
    #[serde(default, rename = "type")]
    pub auth_type: String,
    #[serde(default)]
    pub providers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFeature {
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingFeature {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub database: Option<DatabaseFeature>,
    #[serde(default)]
    pub authentication: Option<AuthenticationFeature>,
    #[serde(default)]
    pub deployment: Option<DeploymentFeature>,
    #[serde(default)]
    pub logging: Option<LoggingFeature>,
}

/// The caller-supplied input to one `Generate` call. Never mutated by
/// the engine; the validator consumes a defensively merged copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub module: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default = "default_go_version")]
    pub go_version: String,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub logger: Option<String>,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
}

fn default_go_version() -> String {
    "auto".to_string()
}

/// Options controlling one `Generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub output_path: std::path::PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub force_overwrite: bool,
    #[serde(default)]
    pub no_hooks: bool,
    #[serde(default)]
    pub ambient_go_version: Option<String>,
    #[serde(default = "default_deadline", with = "duration_millis")]
    pub deadline: Duration,
}

fn default_deadline() -> Duration {
    Duration::from_secs(30)
}

mod duration_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_path: std::path::PathBuf::new(),
            dry_run: false,
            force_overwrite: false,
            no_hooks: false,
            ambient_go_version: None,
            deadline: default_deadline(),
        }
    }
}

/// The flattened name→value mapping consulted by the Predicate
/// Evaluator and Template Renderer. Backed by an `IndexMap` so
/// iteration order (and therefore any serialized snapshot of it) is
/// deterministic: blueprint variables first in declaration order,
/// then the well-known `Config` fields that feed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVars(pub IndexMap<String, Value>);

impl ResolvedVars {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// A `serde_json::Value::Object` view, the shape `handlebars`
    /// expects as a render context.
    pub fn as_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// One entry in the generation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    MkDir(String),
    WriteFile {
        path: String,
        bytes: Vec<u8>,
        mode: u32,
    },
    Chmod {
        path: String,
        mode: u32,
    },
}

impl FileAction {
    pub fn path(&self) -> &str {
        match self {
            FileAction::MkDir(p) => p,
            FileAction::WriteFile { path, .. } => path,
            FileAction::Chmod { path, .. } => path,
        }
    }
}

/// The stage a `Warning` originated in, closed so downstream consumers
/// can filter/group without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Hook,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Loader => write!(f, "loader"),
            Stage::Hook => write!(f, "hook"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub files_created: Vec<String>,
    pub dirs_created: Vec<String>,
    pub warnings: Vec<Warning>,
    pub duration_ms: u64,
    pub blueprint_id: String,
}
