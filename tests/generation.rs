//! Black-box end-to-end tests against on-disk fixture blueprint trees,
//! loaded through `DirBlueprintFs` exactly as a unit test would, but
//! exercised only through the public `Generator` facade.

use goforge_engine::model::DatabaseFeature;
use goforge_engine::{
    Blueprint, BlueprintFile, Config, DirBlueprintFs, Generator, Options, Registry, Variable,
    VariableType,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;

fn config(type_: &str) -> Config {
    Config {
        name: "tidy".into(),
        module: "example.com/tidy".into(),
        type_: type_.into(),
        go_version: "1.22".into(),
        ..Config::default()
    }
}

/// Scenario 2: a web API blueprint with a file conditionally included
/// on whether a database driver was configured.
#[test]
fn web_api_emits_database_file_only_when_driver_is_set() {
    let dir = tempfile::tempdir().unwrap();
    let bp_root = dir.path().join("web-api-standard");
    fs::create_dir_all(bp_root.join("internal/database")).unwrap();
    fs::write(
        bp_root.join("template.yaml"),
        concat!(
            "id: web-api-standard\n",
            "name: Web API\n",
            "type: web-api\n",
            "architecture: standard\n",
            "files:\n",
            "  - source: main.go.tmpl\n",
            "    destination: main.go\n",
            "  - source: internal/database/database.go.tmpl\n",
            "    destination: internal/database/database.go\n",
            "    condition: '{{ne .DatabaseDriver \"\"}}'\n",
        ),
    )
    .unwrap();
    fs::write(bp_root.join("main.go.tmpl"), "package main\n\nfunc main() {}\n").unwrap();
    fs::write(
        bp_root.join("internal/database/database.go.tmpl"),
        "package database\n\nimport _ \"github.com/lib/pq\"\n",
    )
    .unwrap();

    let fs_ = DirBlueprintFs::new(dir.path());
    let (registry, warnings) = Registry::load_all(&fs_).unwrap();
    assert!(warnings.is_empty());
    let generator = Generator::new(&registry, &fs_);

    // With a configured driver, the conditional file is present and
    // imports the postgres driver.
    let mut cfg_with_db = config("web-api");
    cfg_with_db.architecture = Some("standard".into());
    cfg_with_db.features.database = Some(DatabaseFeature {
        driver: "postgres".into(),
        orm: "gorm".into(),
    });
    let with_db_out = tempfile::tempdir().unwrap();
    let options = Options {
        output_path: with_db_out.path().join("tidy"),
        no_hooks: true,
        ..Options::default()
    };
    let result = generator.generate(&cfg_with_db, &options).unwrap();
    assert_eq!(result.files_created.len(), 2);
    let database_go = fs::read_to_string(with_db_out.path().join("tidy/internal/database/database.go")).unwrap();
    assert!(database_go.contains("lib/pq"));

    // With no driver configured, the file is absent entirely.
    let mut cfg_without_db = config("web-api");
    cfg_without_db.architecture = Some("standard".into());
    let without_db_out = tempfile::tempdir().unwrap();
    let options = Options {
        output_path: without_db_out.path().join("tidy"),
        no_hooks: true,
        ..Options::default()
    };
    let result = generator.generate(&cfg_without_db, &options).unwrap();
    assert_eq!(result.files_created.len(), 1);
    assert!(!without_db_out.path().join("tidy/internal/database/database.go").exists());
}

/// Scenario 3: framework disambiguation. A single blueprint file
/// branches on `.Framework`, producing four distinct, each importing
/// only its own router library, all parsing as valid Go.
#[test]
fn framework_disambiguation_produces_distinct_router_files() {
    let dir = tempfile::tempdir().unwrap();
    let bp_root = dir.path().join("web-api-standard");
    fs::create_dir_all(bp_root.join("internal/router")).unwrap();
    fs::write(
        bp_root.join("template.yaml"),
        concat!(
            "id: web-api-standard\n",
            "name: Web API\n",
            "type: web-api\n",
            "files:\n",
            "  - source: internal/router/router.go.tmpl\n",
            "    destination: internal/router/router.go\n",
        ),
    )
    .unwrap();
    fs::write(
        bp_root.join("internal/router/router.go.tmpl"),
        concat!(
            "package router\n\n",
            "{{#if (eq .Framework \"gin\")}}\n",
            "import \"github.com/gin-gonic/gin\"\n",
            "{{else if (eq .Framework \"echo\")}}\n",
            "import \"github.com/labstack/echo/v4\"\n",
            "{{else if (eq .Framework \"chi\")}}\n",
            "import \"github.com/go-chi/chi/v5\"\n",
            "{{else}}\n",
            "import \"github.com/gofiber/fiber/v2\"\n",
            "{{/if}}\n",
        ),
    )
    .unwrap();

    let fs_ = DirBlueprintFs::new(dir.path());
    let (registry, _) = Registry::load_all(&fs_).unwrap();
    let generator = Generator::new(&registry, &fs_);

    let expectations = [
        ("gin", "github.com/gin-gonic/gin"),
        ("echo", "github.com/labstack/echo/v4"),
        ("chi", "github.com/go-chi/chi/v5"),
        ("fiber", "github.com/gofiber/fiber/v2"),
    ];

    let mut contents = Vec::new();
    for (framework, expected_import) in expectations {
        let out = tempfile::tempdir().unwrap();
        let mut cfg = config("web-api");
        cfg.framework = Some(framework.into());
        let options = Options {
            output_path: out.path().join("tidy"),
            no_hooks: true,
            ..Options::default()
        };
        let result = generator.generate(&cfg, &options).unwrap();
        assert_eq!(result.files_created.len(), 1);
        let router_go = fs::read_to_string(out.path().join("tidy/internal/router/router.go")).unwrap();
        assert!(
            router_go.contains(expected_import),
            "{framework} output missing {expected_import}: {router_go}"
        );
        for (_, other_import) in expectations.iter().filter(|(f, _)| *f != framework) {
            assert!(!router_go.contains(other_import), "{framework} output unexpectedly imports {other_import}");
        }
        contents.push(router_go);
    }

    let unique: std::collections::HashSet<_> = contents.iter().collect();
    assert_eq!(unique.len(), contents.len(), "each framework must produce distinct content");
}

/// Manifest round-trip: serializing a loaded `Blueprint` back to YAML
/// and reloading it yields an equal value.
#[test]
fn manifest_round_trips_through_yaml() {
    let blueprint = Blueprint {
        id: "library-standard".into(),
        name: "Library".into(),
        description: "A minimal Go library".into(),
        type_: "library".into(),
        architecture: Some("standard".into()),
        version: Some("1.0.0".into()),
        variables: vec![Variable {
            name: "DomainName".into(),
            var_type: VariableType::String,
            description: None,
            default: Some(serde_json::json!("core")),
            required: false,
            choices: None,
            validation: None,
        }],
        files: vec![BlueprintFile {
            source: "main.go.tmpl".into(),
            destination: "{{ProjectName}}.go".into(),
            condition: None,
            executable: false,
        }],
        dependencies: vec![],
        post_hooks: vec![],
        metadata: Default::default(),
    };

    let yaml = serde_yaml::to_string(&blueprint).unwrap();
    let reloaded: Blueprint = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(blueprint, reloaded);
}

proptest! {
    /// Universal invariant (§8): whatever a destination template
    /// renders to, `normalize_relative` either rejects it or returns a
    /// path with no `..` component and no leading `/` — it never lets
    /// a path escape the output root.
    #[test]
    fn normalize_relative_never_escapes_the_root(segments in prop::collection::vec("[A-Za-z0-9_]{1,8}", 0..6), leading_dotdot in 0..3usize) {
        let mut parts: Vec<String> = (0..leading_dotdot).map(|_| "..".to_string()).collect();
        parts.extend(segments);
        let path = parts.join("/");

        match goforge_engine::template::normalize_relative(&path) {
            Err(_) => {}
            Ok(normalized) => {
                prop_assert!(!normalized.starts_with('/'));
                prop_assert!(!normalized.split('/').any(|c| c == ".."));
            }
        }
    }
}
