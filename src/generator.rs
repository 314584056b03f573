//! The facade: `Generate(config, options) -> GenerationResult`.
//!
//! Runs the pipeline `[Lookup] -> [Validate] -> [BuildPlan] -> [Emit]
//! -> [Hooks] -> [Done]`. A failure in any of the first four stages
//! aborts the whole call with no filesystem trace (the Emitter already
//! guarantees this for its own stage); a hook failure is recorded as a
//! warning only, since by the time hooks run the tree has already been
//! committed.

use crate::blueprint_fs::BlueprintFs;
use crate::emitter::Emitter;
use crate::error::EngineResult;
use crate::hooks::HookRunner;
use crate::model::{Config, GenerationResult, Options};
use crate::plan::PlanBuilder;
use crate::registry::Registry;
use crate::template::Renderer;
use crate::validator::ConfigValidator;
use std::time::Instant;

pub struct Generator<'a> {
    registry: &'a Registry,
    fs: &'a dyn BlueprintFs,
}

impl<'a> Generator<'a> {
    pub fn new(registry: &'a Registry, fs: &'a dyn BlueprintFs) -> Self {
        Self { registry, fs }
    }

    /// Loads the registry fresh from `fs` and wraps it with a
    /// `Generator`. Callers that already hold a `Registry` (e.g. to
    /// inspect its loader warnings before generating) should construct
    /// it themselves with [`Registry::load_all`] and call
    /// [`Generator::new`] directly.
    pub fn from_registry(registry: &'a Registry, fs: &'a dyn BlueprintFs) -> Self {
        Self::new(registry, fs)
    }

    pub fn generate(&self, config: &Config, options: &Options) -> EngineResult<GenerationResult> {
        let start = Instant::now();

        let blueprint = self.registry.lookup(&config.type_, config.architecture.as_deref())?;
        let blueprint_dir = self.registry.get_dir(&blueprint.id).unwrap_or(&blueprint.id);

        let resolved = ConfigValidator::validate(blueprint, config, options.ambient_go_version.as_deref())?;

        let renderer = Renderer::new();
        let plan = PlanBuilder::build(self.fs, blueprint_dir, blueprint, &resolved, &renderer, options.deadline)?;

        let outcome = Emitter::apply(&plan, options)?;

        let mut warnings = Vec::new();
        if !options.dry_run {
            warnings.extend(HookRunner::run(&blueprint.post_hooks, &options.output_path, options));
        }

        Ok(GenerationResult {
            files_created: outcome.files_created,
            dirs_created: outcome.dirs_created,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
            blueprint_id: blueprint.id.clone(),
        })
    }
}
