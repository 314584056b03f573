//! A blueprint-driven Go project scaffolding engine.
//!
//! Given a caller-supplied [`Config`] describing the project to
//! synthesize, [`Generator::generate`] resolves a matching
//! [`Blueprint`] from a [`Registry`], validates the config against the
//! blueprint's declared variables, builds an ordered file plan,
//! renders every template through the whitelisted function set, and
//! emits the result atomically to disk, running the blueprint's
//! post-generation hooks last.
//!
//! ```text
//! Registry::load_all -> ConfigValidator::validate -> PlanBuilder::build
//!     -> Emitter::apply -> HookRunner::run -> GenerationResult
//! ```

pub mod blueprint_fs;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod plan;
pub mod predicate;
pub mod registry;
pub mod template;
pub mod validator;

pub use blueprint_fs::{BlueprintFs, DirBlueprintFs, EmbeddedBlueprintFs};
pub use emitter::{EmitOutcome, Emitter};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use generator::Generator;
pub use hooks::HookRunner;
pub use manifest::ManifestLoader;
pub use model::{
    Blueprint, BlueprintFile, Config, Dependency, Features, FileAction, GenerationResult, Hook,
    Options, ResolvedVars, Stage, Variable, VariableType, Warning,
};
pub use plan::PlanBuilder;
pub use registry::Registry;
pub use template::Renderer;
pub use validator::ConfigValidator;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
