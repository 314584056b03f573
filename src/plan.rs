//! Builds the ordered [`FileAction`] list the Emitter applies.

use crate::blueprint_fs::{join, BlueprintFs};
use crate::error::{EngineError, EngineResult};
use crate::model::{Blueprint, FileAction, ResolvedVars};
use crate::predicate;
use crate::template::Renderer;
use indexmap::IndexSet;
use std::collections::HashSet;
use std::time::Duration;

pub struct PlanBuilder;

impl PlanBuilder {
    /// Walks `blueprint.files` in declared order, skipping files whose
    /// condition evaluates false, rendering the rest. Pure with
    /// respect to the output filesystem — it only reads the blueprint
    /// FS and returns a description for the Emitter to apply.
    pub fn build(
        fs: &dyn BlueprintFs,
        blueprint_dir: &str,
        blueprint: &Blueprint,
        resolved: &ResolvedVars,
        renderer: &Renderer,
        deadline: Duration,
    ) -> EngineResult<Vec<FileAction>> {
        let mut mkdirs: IndexSet<String> = IndexSet::new();
        let mut writes: Vec<FileAction> = Vec::new();
        let mut destinations: HashSet<String> = HashSet::new();

        for file in &blueprint.files {
            let condition = file.condition.as_deref().unwrap_or("");
            if !predicate::evaluate(renderer, condition, resolved)? {
                continue;
            }

            let destination = renderer.render_destination(&file.destination, resolved, deadline)?;

            if !destinations.insert(destination.clone()) {
                return Err(EngineError::DuplicateDestination { path: destination });
            }

            let source_path = join(blueprint_dir, &file.source);
            let source_bytes = fs.open(&source_path)?;
            let source_text = String::from_utf8(source_bytes).map_err(|e| EngineError::TemplateInvalid {
                path: file.source.clone(),
                reason: format!("template source is not valid UTF-8: {e}"),
            })?;

            let content = renderer.render_content(
                &file.source,
                &destination,
                &source_text,
                resolved,
                deadline,
            )?;

            if let Some(parent) = parent_dir(&destination) {
                mkdirs.insert(parent);
            }

            let mode = if file.executable { 0o755 } else { 0o644 };
            writes.push(FileAction::WriteFile {
                path: destination,
                bytes: content,
                mode,
            });
        }

        let mut plan: Vec<FileAction> = mkdirs.into_iter().map(FileAction::MkDir).collect();
        plan.extend(writes);
        Ok(plan)
    }
}

fn parent_dir(destination: &str) -> Option<String> {
    destination.rfind('/').map(|idx| destination[..idx].to_string())
}
