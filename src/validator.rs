//! Resolves a [`Blueprint`]'s declared variables against a caller's
//! [`Config`], producing [`ResolvedVars`]. Pure — no I/O, no
//! subprocesses, no filesystem access — ordered checks mirroring the
//! engine's own application-config validator, generalized from a
//! fixed settings shape to an author-declared variable schema.

use crate::error::{EngineError, EngineResult};
use crate::model::{Blueprint, Config, ResolvedVars, Variable, VariableType};
use once_cell_regexes::{MODULE_PATH, PROJECT_NAME};
use serde_json::Value;

const RESERVED_PROJECT_NAMES: &[&str] = &["con", "nul", "aux", "prn", "com1", "lpt1"];

mod once_cell_regexes {
    use regex::Regex;
    use std::sync::OnceLock;

    pub struct LazyRegex {
        pattern: &'static str,
        cell: OnceLock<Regex>,
    }

    impl LazyRegex {
        const fn new(pattern: &'static str) -> Self {
            Self {
                pattern,
                cell: OnceLock::new(),
            }
        }

        pub fn get(&self) -> &Regex {
            self.cell
                .get_or_init(|| Regex::new(self.pattern).expect("static regex is valid"))
        }
    }

    pub static PROJECT_NAME: LazyRegex = LazyRegex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$");
    pub static MODULE_PATH: LazyRegex =
        LazyRegex::new(r"^[A-Za-z0-9.\-]+(\.[A-Za-z0-9\-]+)+(/[A-Za-z0-9_\-.]+)*$");
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Rules are applied in the declared order: explicit override,
    /// well-known `Config` field, blueprint default, then
    /// `MISSING_REQUIRED`. `ambient_go_version` is substituted for a
    /// `Config.go_version` of `"auto"`.
    pub fn validate(
        blueprint: &Blueprint,
        config: &Config,
        ambient_go_version: Option<&str>,
    ) -> EngineResult<ResolvedVars> {
        let mut resolved = ResolvedVars::new();

        let project_name = sanitize_project_name(&config.name)?;
        let module_path = sanitize_module_path(&config.module)?;
        let go_version = if config.go_version == "auto" {
            ambient_go_version.unwrap_or("auto").to_string()
        } else {
            config.go_version.clone()
        };

        resolved.insert("ProjectName", Value::String(project_name));
        resolved.insert("ModulePath", Value::String(module_path));
        resolved.insert("GoVersion", Value::String(go_version));
        resolved.insert(
            "Framework",
            Value::String(config.framework.clone().unwrap_or_default()),
        );
        let logger = config.logger.clone().unwrap_or_default();
        resolved.insert("Logger", Value::String(logger.clone()));
        resolved.insert("LoggerType", Value::String(logger));
        resolved.insert(
            "Architecture",
            Value::String(config.architecture.clone().unwrap_or_default()),
        );

        let (driver, orm) = config
            .features
            .database
            .as_ref()
            .map(|d| (d.driver.clone(), d.orm.clone()))
            .unwrap_or_default();
        resolved.insert("DatabaseDriver", Value::String(driver));
        resolved.insert("DatabaseORM", Value::String(orm));

        let (auth_type, auth_providers) = config
            .features
            .authentication
            .as_ref()
            .map(|a| (a.auth_type.clone(), a.providers.join(",")))
            .unwrap_or_default();
        resolved.insert("AuthType", Value::String(auth_type));
        resolved.insert("AuthProviders", Value::String(auth_providers));

        for variable in &blueprint.variables {
            let raw = Self::resolve_raw_value(variable, config)?;
            let cast = cast_to_declared_type(variable, raw)?;
            if variable.var_type == VariableType::Choice {
                Self::check_choice(variable, &cast)?;
            }
            if let Some(pattern) = &variable.validation {
                Self::check_pattern(variable, &cast, pattern)?;
            }
            resolved.insert(variable.name.clone(), cast);
        }

        Ok(resolved)
    }

    fn resolve_raw_value(variable: &Variable, config: &Config) -> EngineResult<Value> {
        if let Some(explicit) = config.variables.get(&variable.name) {
            return Ok(explicit.clone());
        }
        if let Some(well_known) = well_known_config_value(&variable.name, config) {
            return Ok(well_known);
        }
        if let Some(default) = &variable.default {
            return Ok(default.clone());
        }
        if variable.required {
            return Err(EngineError::MissingRequired {
                name: variable.name.clone(),
            });
        }
        Ok(Value::Null)
    }

    fn check_choice(variable: &Variable, value: &Value) -> EngineResult<()> {
        let choices = variable.choices.as_deref().unwrap_or(&[]);
        let as_str = value.as_str().unwrap_or_default();
        if !choices.iter().any(|c| c == as_str) {
            return Err(EngineError::InvalidChoice {
                name: variable.name.clone(),
                value: as_str.to_string(),
                choices: choices.to_vec(),
            });
        }
        Ok(())
    }

    fn check_pattern(variable: &Variable, value: &Value, pattern: &str) -> EngineResult<()> {
        let re = regex::Regex::new(pattern)?;
        let as_str = value.as_str().unwrap_or_default();
        if !re.is_match(as_str) {
            return Err(EngineError::ValidationFailed {
                field: variable.name.clone(),
                message: format!("value '{as_str}' does not match pattern '{pattern}'"),
            });
        }
        Ok(())
    }
}

fn well_known_config_value(name: &str, config: &Config) -> Option<Value> {
    match name {
        "ProjectName" => Some(Value::String(config.name.clone())),
        "ModulePath" => Some(Value::String(config.module.clone())),
        "GoVersion" => Some(Value::String(config.go_version.clone())),
        "Framework" => config.framework.clone().map(Value::String),
        "Logger" | "LoggerType" => config.logger.clone().map(Value::String),
        "Architecture" => config.architecture.clone().map(Value::String),
        "DatabaseDriver" => config
            .features
            .database
            .as_ref()
            .map(|d| Value::String(d.driver.clone())),
        "DatabaseORM" => config
            .features
            .database
            .as_ref()
            .map(|d| Value::String(d.orm.clone())),
        "AuthType" => config
            .features
            .authentication
            .as_ref()
            .map(|a| Value::String(a.auth_type.clone())),
        "AuthProviders" => config
            .features
            .authentication
            .as_ref()
            .map(|a| Value::String(a.providers.join(","))),
        _ => None,
    }
}

fn cast_to_declared_type(variable: &Variable, raw: Value) -> EngineResult<Value> {
    match variable.var_type {
        VariableType::String | VariableType::Choice => match raw {
            Value::String(_) => Ok(raw),
            Value::Null => Ok(Value::String(String::new())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(EngineError::InvalidType {
                name: variable.name.clone(),
                expected: "string".to_string(),
                value: other.to_string(),
            }),
        },
        VariableType::Bool => match raw {
            Value::Bool(_) => Ok(raw),
            Value::String(ref s) => match s.to_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(EngineError::InvalidType {
                    name: variable.name.clone(),
                    expected: "bool".to_string(),
                    value: s.clone(),
                }),
            },
            other => Err(EngineError::InvalidType {
                name: variable.name.clone(),
                expected: "bool".to_string(),
                value: other.to_string(),
            }),
        },
        VariableType::List => match raw {
            Value::Array(_) => Ok(raw),
            Value::String(ref s) if s.is_empty() => Ok(Value::Array(vec![])),
            Value::String(ref s) => Ok(Value::Array(
                s.split(',').map(|p| Value::String(p.trim().to_string())).collect(),
            )),
            other => Err(EngineError::InvalidType {
                name: variable.name.clone(),
                expected: "list".to_string(),
                value: other.to_string(),
            }),
        },
    }
}

fn sanitize_project_name(name: &str) -> EngineResult<String> {
    if name.is_empty() || name.len() > 64 {
        return Err(EngineError::ValidationFailed {
            field: "ProjectName".to_string(),
            message: "must be 1-64 characters".to_string(),
        });
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(EngineError::ValidationFailed {
            field: "ProjectName".to_string(),
            message: "must not contain path separators or null bytes".to_string(),
        });
    }
    if RESERVED_PROJECT_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(EngineError::ValidationFailed {
            field: "ProjectName".to_string(),
            message: format!("'{name}' is a reserved name"),
        });
    }
    if !PROJECT_NAME.get().is_match(name) {
        return Err(EngineError::ValidationFailed {
            field: "ProjectName".to_string(),
            message: "must match [A-Za-z_][A-Za-z0-9_-]*".to_string(),
        });
    }
    Ok(name.to_string())
}

fn sanitize_module_path(module: &str) -> EngineResult<String> {
    if module.trim().is_empty() || module.chars().any(|c| c.is_whitespace()) {
        return Err(EngineError::ValidationFailed {
            field: "ModulePath".to_string(),
            message: "must be non-empty and contain no whitespace".to_string(),
        });
    }
    if module.contains("..") {
        return Err(EngineError::ValidationFailed {
            field: "ModulePath".to_string(),
            message: "must not contain '..'".to_string(),
        });
    }
    const SHELL_METACHARACTERS: &[char] = &['$', '`', ';', '|', '&', '>', '<', '\n', '\0'];
    if module.contains(SHELL_METACHARACTERS) {
        return Err(EngineError::ValidationFailed {
            field: "ModulePath".to_string(),
            message: "must not contain shell metacharacters".to_string(),
        });
    }
    if !MODULE_PATH.get().is_match(module) {
        return Err(EngineError::ValidationFailed {
            field: "ModulePath".to_string(),
            message: "must be a dot-separated host plus slash-separated path segments".to_string(),
        });
    }
    Ok(module.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlueprintFile, DatabaseFeature, Features};

    fn minimal_blueprint(variables: Vec<Variable>) -> Blueprint {
        Blueprint {
            id: "lib".into(),
            name: "lib".into(),
            description: String::new(),
            type_: "library".into(),
            architecture: None,
            version: None,
            variables,
            files: vec![BlueprintFile {
                source: "main.go.tmpl".into(),
                destination: "{{ProjectName}}.go".into(),
                condition: None,
                executable: false,
            }],
            dependencies: vec![],
            post_hooks: vec![],
            metadata: Default::default(),
        }
    }

    fn minimal_config() -> Config {
        Config {
            name: "tidy".into(),
            module: "example.com/tidy".into(),
            type_: "library".into(),
            architecture: None,
            go_version: "1.23".into(),
            framework: None,
            logger: Some("slog".into()),
            features: Features::default(),
            variables: Default::default(),
        }
    }

    #[test]
    fn resolves_baseline_keys_without_any_declared_variables() {
        let bp = minimal_blueprint(vec![]);
        let cfg = minimal_config();
        let resolved = ConfigValidator::validate(&bp, &cfg, None).unwrap();
        assert_eq!(resolved.get("ProjectName").unwrap(), "tidy");
        assert_eq!(resolved.get("ModulePath").unwrap(), "example.com/tidy");
    }

    #[test]
    fn missing_required_variable_fails() {
        let bp = minimal_blueprint(vec![Variable {
            name: "DomainName".into(),
            var_type: VariableType::String,
            description: None,
            default: None,
            required: true,
            choices: None,
            validation: None,
        }]);
        let cfg = minimal_config();
        let err = ConfigValidator::validate(&bp, &cfg, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MissingRequired);
    }

    #[test]
    fn choice_variable_rejects_value_outside_declared_set() {
        let bp = minimal_blueprint(vec![Variable {
            name: "Framework".into(),
            var_type: VariableType::Choice,
            description: None,
            default: None,
            required: true,
            choices: Some(vec!["gin".into(), "echo".into()]),
            validation: None,
        }]);
        let mut cfg = minimal_config();
        cfg.framework = Some("flask".into());
        let err = ConfigValidator::validate(&bp, &cfg, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidChoice);
    }

    #[test]
    fn database_driver_flows_from_nested_config_features() {
        let bp = minimal_blueprint(vec![]);
        let mut cfg = minimal_config();
        cfg.features.database = Some(DatabaseFeature {
            driver: "postgres".into(),
            orm: "gorm".into(),
        });
        let resolved = ConfigValidator::validate(&bp, &cfg, None).unwrap();
        assert_eq!(resolved.get("DatabaseDriver").unwrap(), "postgres");
    }

    #[test]
    fn rejects_project_name_with_path_separator() {
        let bp = minimal_blueprint(vec![]);
        let mut cfg = minimal_config();
        cfg.name = "../evil".into();
        let err = ConfigValidator::validate(&bp, &cfg, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationFailed);
    }

    #[test]
    fn go_version_auto_is_replaced_by_ambient_version() {
        let bp = minimal_blueprint(vec![]);
        let mut cfg = minimal_config();
        cfg.go_version = "auto".into();
        let resolved = ConfigValidator::validate(&bp, &cfg, Some("1.22")).unwrap();
        assert_eq!(resolved.get("GoVersion").unwrap(), "1.22");
    }
}
