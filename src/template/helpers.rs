//! The closed set of functions available to blueprint templates.
//!
//! Every helper here implements [`HelperDef::call_inner`], so it works
//! both as a standalone action (`{{upper .Name}}`) and nested inside
//! another helper's arguments (`{{#if (eq .Framework "gin")}}`) — the
//! same style the engine's author used for their own `camel_case`/
//! `snake_case` helpers, generalized to the closed whitelist this
//! renderer promises. Nothing beyond what is registered here is
//! reachable from a template: no `exec`, `env`, `include`, or `file`
//! helper exists in this module, by omission.

use handlebars::{Context, Handlebars, Helper, HelperDef, RenderContext, ScopedJson};
use serde_json::Value;

pub type RenderError = handlebars::RenderError;

fn param_str<'a>(h: &'a Helper, idx: usize) -> Result<&'a str, RenderError> {
    h.param(idx)
        .and_then(|v| v.value().as_str())
        .ok_or_else(|| RenderError::new(format!("expected a string parameter at index {idx}")))
}

fn param_value<'a>(h: &'a Helper, idx: usize) -> Result<&'a Value, RenderError> {
    h.param(idx)
        .map(|v| v.value())
        .ok_or_else(|| RenderError::new(format!("missing parameter at index {idx}")))
}

macro_rules! string_helper {
    ($name:ident, $body:expr) => {
        pub struct $name;
        impl HelperDef for $name {
            fn call_inner<'reg: 'rc, 'rc>(
                &self,
                h: &Helper<'rc>,
                _: &'reg Handlebars<'reg>,
                _: &'rc Context,
                _: &mut RenderContext<'reg, 'rc>,
            ) -> Result<ScopedJson<'rc>, RenderError> {
                let f: fn(&Helper) -> Result<String, RenderError> = $body;
                Ok(ScopedJson::Derived(Value::String(f(h)?)))
            }
        }
    };
}

string_helper!(UpperHelper, |h| Ok(param_str(h, 0)?.to_uppercase()));
string_helper!(LowerHelper, |h| Ok(param_str(h, 0)?.to_lowercase()));
string_helper!(TrimHelper, |h| Ok(param_str(h, 0)?.trim().to_string()));

string_helper!(TitleHelper, |h| {
    let s = param_str(h, 0)?;
    Ok(s.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" "))
});

string_helper!(ReplaceHelper, |h| {
    let s = param_str(h, 0)?;
    let from = param_str(h, 1)?;
    let to = param_str(h, 2)?;
    Ok(s.replace(from, to))
});

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

macro_rules! bool_helper {
    ($name:ident, $body:expr) => {
        pub struct $name;
        impl HelperDef for $name {
            fn call_inner<'reg: 'rc, 'rc>(
                &self,
                h: &Helper<'rc>,
                _: &'reg Handlebars<'reg>,
                _: &'rc Context,
                _: &mut RenderContext<'reg, 'rc>,
            ) -> Result<ScopedJson<'rc>, RenderError> {
                let f: fn(&Helper) -> Result<bool, RenderError> = $body;
                Ok(ScopedJson::Derived(Value::Bool(f(h)?)))
            }
        }
    };
}

bool_helper!(ContainsHelper, |h| Ok(param_str(h, 0)?.contains(param_str(h, 1)?)));
bool_helper!(HasPrefixHelper, |h| Ok(param_str(h, 0)?.starts_with(param_str(h, 1)?)));
bool_helper!(HasSuffixHelper, |h| Ok(param_str(h, 0)?.ends_with(param_str(h, 1)?)));

bool_helper!(EqHelper, |h| Ok(param_value(h, 0)? == param_value(h, 1)?));
bool_helper!(NeHelper, |h| Ok(param_value(h, 0)? != param_value(h, 1)?));
bool_helper!(LtHelper, |h| Ok(compare(param_value(h, 0)?, param_value(h, 1)?)? == std::cmp::Ordering::Less));
bool_helper!(LeHelper, |h| Ok(compare(param_value(h, 0)?, param_value(h, 1)?)? != std::cmp::Ordering::Greater));
bool_helper!(GtHelper, |h| Ok(compare(param_value(h, 0)?, param_value(h, 1)?)? == std::cmp::Ordering::Greater));
bool_helper!(GeHelper, |h| Ok(compare(param_value(h, 0)?, param_value(h, 1)?)? != std::cmp::Ordering::Less));

fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, RenderError> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .ok_or_else(|| RenderError::new("cannot compare numbers")),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(RenderError::new("lt/le/gt/ge require two strings or two numbers")),
    }
}

pub struct AndHelper;
impl HelperDef for AndHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let result = h.params().iter().all(|p| is_truthy(p.value()));
        Ok(ScopedJson::Derived(Value::Bool(result)))
    }
}

pub struct OrHelper;
impl HelperDef for OrHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let result = h.params().iter().any(|p| is_truthy(p.value()));
        Ok(ScopedJson::Derived(Value::Bool(result)))
    }
}

pub struct NotHelper;
impl HelperDef for NotHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let value = param_value(h, 0)?;
        Ok(ScopedJson::Derived(Value::Bool(!is_truthy(value))))
    }
}

pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
    }
}

pub struct SplitHelper;
impl HelperDef for SplitHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let s = param_str(h, 0)?;
        let sep = param_str(h, 1)?;
        let parts: Vec<Value> = s.split(sep).map(|p| Value::String(p.to_string())).collect();
        Ok(ScopedJson::Derived(Value::Array(parts)))
    }
}

pub struct JoinHelper;
impl HelperDef for JoinHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let list = param_value(h, 0)?;
        let sep = param_str(h, 1)?;
        let items: Vec<String> = list
            .as_array()
            .ok_or_else(|| RenderError::new("join expects an array"))?
            .iter()
            .map(value_to_plain_string)
            .collect();
        Ok(ScopedJson::Derived(Value::String(items.join(sep))))
    }
}

fn value_to_plain_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Minimal `printf`: supports `%s` (string) and `%d` (integer)
/// verbs, positionally consumed — the subset blueprint authors need
/// for formatting messages and comments, not a full format-string
/// implementation.
pub struct PrintfHelper;
impl HelperDef for PrintfHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let format = param_str(h, 0)?;
        let mut args = h.params().iter().skip(1).map(|p| p.value());
        let mut out = String::new();
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' {
                match chars.next() {
                    Some('s') | Some('d') | Some('v') => {
                        if let Some(arg) = args.next() {
                            out.push_str(&value_to_plain_string(arg));
                        }
                    }
                    Some('%') => out.push('%'),
                    Some(other) => {
                        out.push('%');
                        out.push(other);
                    }
                    None => out.push('%'),
                }
            } else {
                out.push(c);
            }
        }
        Ok(ScopedJson::Derived(Value::String(out)))
    }
}

/// Registers exactly the whitelisted function set on a fresh
/// `Handlebars` instance. Anything not registered here is, by
/// construction, unreachable from a template.
pub fn register_all(hb: &mut Handlebars) {
    hb.register_helper("upper", Box::new(UpperHelper));
    hb.register_helper("lower", Box::new(LowerHelper));
    hb.register_helper("title", Box::new(TitleHelper));
    hb.register_helper("replace", Box::new(ReplaceHelper));
    hb.register_helper("contains", Box::new(ContainsHelper));
    hb.register_helper("hasPrefix", Box::new(HasPrefixHelper));
    hb.register_helper("hasSuffix", Box::new(HasSuffixHelper));
    hb.register_helper("trim", Box::new(TrimHelper));
    hb.register_helper("split", Box::new(SplitHelper));
    hb.register_helper("join", Box::new(JoinHelper));
    hb.register_helper("eq", Box::new(EqHelper));
    hb.register_helper("ne", Box::new(NeHelper));
    hb.register_helper("lt", Box::new(LtHelper));
    hb.register_helper("le", Box::new(LeHelper));
    hb.register_helper("gt", Box::new(GtHelper));
    hb.register_helper("ge", Box::new(GeHelper));
    hb.register_helper("and", Box::new(AndHelper));
    hb.register_helper("or", Box::new(OrHelper));
    hb.register_helper("not", Box::new(NotHelper));
    hb.register_helper("printf", Box::new(PrintfHelper));
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlebars::Handlebars;
    use serde_json::json;

    fn renderer() -> Handlebars<'static> {
        let mut hb = Handlebars::new();
        register_all(&mut hb);
        hb
    }

    #[test]
    fn upper_and_replace_compose() {
        let hb = renderer();
        let out = hb
            .render_template("{{upper (replace Name \"-\" \"_\")}}", &json!({"Name": "go-starter"}))
            .unwrap();
        assert_eq!(out, "GO_STARTER");
    }

    #[test]
    fn eq_drives_a_conditional_block() {
        let hb = renderer();
        let out = hb
            .render_template(
                "{{#if (eq Framework \"gin\")}}github.com/gin-gonic/gin{{else}}net/http{{/if}}",
                &json!({"Framework": "gin"}),
            )
            .unwrap();
        assert_eq!(out, "github.com/gin-gonic/gin");
    }

    #[test]
    fn standalone_eq_prints_go_style_boolean() {
        let hb = renderer();
        let out = hb
            .render_template("{{eq DatabaseDriver \"\"}}", &json!({"DatabaseDriver": ""}))
            .unwrap();
        assert_eq!(out, "true");
    }

    #[test]
    fn unknown_function_fails_to_render() {
        let hb = renderer();
        let err = hb.render_template("{{exec \"rm -rf /\"}}", &json!({}));
        assert!(err.is_err());
    }
}
