//! Evaluates a `BlueprintFile.condition` string to a boolean, reusing
//! the Template Renderer's function whitelist so blueprint authors
//! never encounter two dialects for "render this" vs "should this
//! file exist at all".

use crate::error::{EngineError, EngineResult};
use crate::model::ResolvedVars;
use crate::template::Renderer;
use std::time::Duration;

/// Predicates are expected to be cheap; a generous fixed budget avoids
/// threading a caller deadline through every file just for this check.
const PREDICATE_DEADLINE: Duration = Duration::from_secs(5);

/// Evaluates `condition` against `vars`. An empty condition is always
/// true. A condition that fails to render (unknown function, syntax
/// error) is a blueprint defect, surfaced as `PREDICATE_MALFORMED`
/// rather than `TEMPLATE_INVALID` — it aborts the whole generation,
/// distinct from a per-file render failure.
pub fn evaluate(renderer: &Renderer, condition: &str, vars: &ResolvedVars) -> EngineResult<bool> {
    if condition.trim().is_empty() {
        return Ok(true);
    }

    let rendered = renderer
        .render("<condition>", condition, vars, PREDICATE_DEADLINE)
        .map_err(|e| EngineError::PredicateMalformed {
            expression: condition.to_string(),
            reason: e.to_string(),
        })?;

    Ok(match rendered.trim() {
        "true" => true,
        "false" => false,
        other => !other.is_empty(),
    })
}
