//! Renders one template source (or one destination-path template)
//! against a [`ResolvedVars`] through the whitelisted function set.

pub mod govalidate;
mod helpers;

use crate::error::{EngineError, EngineResult};
use crate::model::ResolvedVars;
use handlebars::Handlebars;
use std::time::{Duration, Instant};

/// A parsed template larger than this, post-expansion, is rejected.
pub const MAX_RENDERED_BYTES: usize = 1024 * 1024;

pub struct Renderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> Default for Renderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Renderer<'a> {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        helpers::register_all(&mut handlebars);
        Self { handlebars }
    }

    /// Renders one template source string. Enforces the resource caps
    /// from the component design: size is checked post-expansion;
    /// timing is checked cooperatively after the (synchronous, pure)
    /// render completes, matching the engine's "completes its current
    /// critical section, then aborts" cancellation contract.
    pub fn render(
        &self,
        label: &str,
        template_source: &str,
        vars: &ResolvedVars,
        deadline: Duration,
    ) -> EngineResult<String> {
        let start = Instant::now();
        let normalized = normalize_dot_paths(template_source);
        let rendered = self
            .handlebars
            .render_template(&normalized, &vars.as_json())
            .map_err(|e| EngineError::TemplateInvalid {
                path: label.to_string(),
                reason: e.to_string(),
            })?;

        if start.elapsed() > deadline {
            return Err(EngineError::RenderTimeout {
                path: label.to_string(),
            });
        }
        if rendered.len() > MAX_RENDERED_BYTES {
            return Err(EngineError::TemplateInvalid {
                path: label.to_string(),
                reason: format!(
                    "rendered output is {} bytes, exceeding the {} byte cap",
                    rendered.len(),
                    MAX_RENDERED_BYTES
                ),
            });
        }
        Ok(rendered)
    }

    /// Renders a `BlueprintFile.destination` template, then normalizes
    /// and validates the result: it must be relative and must not
    /// escape its parent via `..`.
    pub fn render_destination(
        &self,
        destination_template: &str,
        vars: &ResolvedVars,
        deadline: Duration,
    ) -> EngineResult<String> {
        let rendered = self.render("<destination>", destination_template, vars, deadline)?;
        normalize_relative(&rendered)
    }

    /// Renders file content and, when the destination ends in `.go`,
    /// enforces the post-render Go-validity invariant.
    pub fn render_content(
        &self,
        source_label: &str,
        destination: &str,
        template_source: &str,
        vars: &ResolvedVars,
        deadline: Duration,
    ) -> EngineResult<Vec<u8>> {
        let rendered = self.render(source_label, template_source, vars, deadline)?;
        if destination.ends_with(".go") {
            govalidate::validate(&rendered).map_err(|e| EngineError::GeneratedInvalidGo {
                path: destination.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(rendered.into_bytes())
    }
}

/// Rewrites Go-template-style dot-prefixed variable references
/// (`.Name`, `.DatabaseDriver`) into the bare identifiers this crate's
/// handlebars-backed renderer resolves directly, so blueprint authors
/// who follow the dotted convention from the distilled specification
/// (`{{ne .DatabaseDriver ""}}`) render identically to those who write
/// `{{ne DatabaseDriver ""}}`. Only rewrites text inside `{{ ... }}`
/// expression spans — a literal ".gitignore" in a template body is
/// left untouched — and only a dot in path-start position immediately
/// followed by an identifier; `.`, `..`, `./`, `../` keep their
/// handlebars meaning (current/parent context navigation) and are
/// never touched, nor is anything inside a quoted string literal.
fn normalize_dot_paths(template_source: &str) -> String {
    let chars: Vec<char> = template_source.chars().collect();
    let mut out = String::with_capacity(template_source.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' && chars.get(i + 1) == Some(&'{') {
            out.push('{');
            out.push('{');
            let mut start = i + 2;
            if chars.get(start) == Some(&'{') {
                out.push('{');
                start += 1;
            }
            let mut j = start;
            while j < chars.len() && !(chars[j] == '}' && chars.get(j + 1) == Some(&'}')) {
                j += 1;
            }
            let expr: String = chars[start..j.min(chars.len())].iter().collect();
            out.push_str(&strip_leading_dots(&expr));
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Strips a path-start leading dot from each bare variable reference
/// inside one `{{ ... }}` expression's contents. See
/// [`normalize_dot_paths`] for the rules this enforces.
fn strip_leading_dots(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
            i += 1;
            continue;
        }
        if c == '.' {
            let prev_is_path_char = out
                .chars()
                .last()
                .map(|p| p.is_alphanumeric() || p == '_' || p == '.' || p == '/')
                .unwrap_or(false);
            let next_is_ident_start = matches!(chars.get(i + 1), Some(n) if n.is_alphabetic() || *n == '_');
            if !prev_is_path_char && next_is_ident_start {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Cleans a rendered path and rejects anything absolute or escaping
/// via `..`, matching the "no path escape" invariant.
pub fn normalize_relative(path: &str) -> EngineResult<String> {
    if path.is_empty() {
        return Err(EngineError::PathTraversal {
            path: path.to_string(),
        });
    }
    let p = std::path::Path::new(path);
    if p.is_absolute() {
        return Err(EngineError::PathTraversal {
            path: path.to_string(),
        });
    }

    let mut cleaned: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(EngineError::PathTraversal {
                    path: path.to_string(),
                })
            }
            other => cleaned.push(other),
        }
    }
    if cleaned.is_empty() {
        return Err(EngineError::PathTraversal {
            path: path.to_string(),
        });
    }
    Ok(cleaned.join("/"))
}
