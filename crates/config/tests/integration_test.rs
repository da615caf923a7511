//! End-to-end tests for settings resolution, the parameter tree and persistence.
//!
//! These tests drive the public API against the in-memory store, checking the
//! full precedence chain, lazy listing and tags, and value round-trips
//! through the store.

use std::fs;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serial_test::serial;
use ssm_client::MemoryStore;
use ssm_config::{
    ConfigLoader, Document, ExportFormat, ExportOptions, Parameter, ParameterTree,
    SchemaRegistry, Settings, SettingsOptions, SettingsSchema, WriteTarget,
    constants::{LOCAL_SETTINGS_PATH_ENV, SSM_SETTINGS_PATH_ENV},
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Layered {
    #[serde(default)]
    a: String,
    #[serde(default)]
    b: String,
    #[serde(default)]
    c: String,
    #[serde(default)]
    d: String,
    #[serde(default)]
    e: String,
}

impl SettingsSchema for Layered {
    fn options() -> SettingsOptions {
        SettingsOptions::default().with_env_prefix("LAYERED_")
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Mailer {
    email_text: String,
    #[serde(default)]
    retries: u32,
}

impl SettingsSchema for Mailer {}

fn without_path_overrides<R>(f: impl FnOnce() -> R) -> R {
    temp_env::with_vars(
        [
            (LOCAL_SETTINGS_PATH_ENV, None::<&str>),
            (SSM_SETTINGS_PATH_ENV, None),
        ],
        f,
    )
}

/// Each source carries its own key plus every key of the sources above it,
/// so each key shows which source won it.
#[test]
#[serial]
fn test_full_precedence_chain() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("settings.yaml");
    fs::write(&local, "a: local\nb: local\n").unwrap();

    let secrets = dir.path().join("secrets");
    fs::create_dir(&secrets).unwrap();
    for key in ["A", "B", "C", "D", "E"] {
        fs::write(secrets.join(format!("LAYERED_{key}")), "secret\n").unwrap();
    }

    let store = Arc::new(MemoryStore::new());
    store.insert(
        "/app/layered",
        "{\"a\": \"remote\", \"b\": \"remote\", \"c\": \"remote\"}",
    );

    without_path_overrides(|| {
        temp_env::with_vars(
            [
                ("LAYERED_A", Some("env")),
                ("LAYERED_B", Some("env")),
                ("LAYERED_C", Some("env")),
                ("LAYERED_D", Some("env")),
            ],
            || {
                let settings = ConfigLoader::<Layered>::new()
                    .with_options(Layered::options().with_secrets_dir(&secrets))
                    .with_store(store.clone())
                    .with_local_path(&local)
                    .with_ssm_path("/app/layered")
                    .set("a", "explicit")
                    .load()
                    .unwrap();

                assert_eq!(settings.a, "explicit");
                assert_eq!(settings.b, "local");
                assert_eq!(settings.c, "remote");
                assert_eq!(settings.d, "env");
                assert_eq!(settings.e, "secret");
                assert_eq!(settings.origin().unwrap().name(), "/app/layered");
            },
        );
    });
}

#[test]
#[serial]
fn test_lower_sources_fill_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let secrets = dir.path().join("secrets");
    fs::create_dir(&secrets).unwrap();
    fs::write(secrets.join("LAYERED_A"), "secret").unwrap();
    fs::write(secrets.join("LAYERED_B"), "secret").unwrap();

    let store = Arc::new(MemoryStore::new());
    store.insert("/app/layered", "c: remote\n");

    without_path_overrides(|| {
        temp_env::with_vars([("LAYERED_B", Some("env")), ("LAYERED_C", Some("env"))], || {
            let settings = ConfigLoader::<Layered>::new()
                .with_options(Layered::options().with_secrets_dir(&secrets))
                .with_store(store.clone())
                .with_ssm_path("/app/layered")
                .load()
                .unwrap();
            assert_eq!(settings.a, "secret");
            assert_eq!(settings.b, "env");
            assert_eq!(settings.c, "remote");
            assert_eq!(settings.d, "");
        });
    });
}

#[test]
#[serial]
fn test_local_path_from_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("from-env.json");
    fs::write(&local, r#"{"a": "file"}"#).unwrap();
    let local_str = local.to_string_lossy().to_string();

    temp_env::with_vars(
        [
            (LOCAL_SETTINGS_PATH_ENV, Some(local_str.as_str())),
            (SSM_SETTINGS_PATH_ENV, None),
        ],
        || {
            let settings = ConfigLoader::<Layered>::new().load().unwrap();
            assert_eq!(settings.a, "file");
        },
    );
}

#[test]
#[serial]
fn test_empty_remote_parameter_contributes_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.insert("/app/empty", "");

    without_path_overrides(|| {
        let settings = ConfigLoader::<Layered>::new()
            .with_store(store.clone())
            .with_ssm_path("/app/empty")
            .set("a", "explicit")
            .load()
            .unwrap();
        assert_eq!(settings.a, "explicit");
        assert!(settings.origin().is_none());
    });
}

#[test]
#[serial]
fn test_yaml_file_round_trips_braces() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("mailer.yaml");
    fs::write(&local, "email_text: \"line1\\n{{brackets}}\"\n").unwrap();

    without_path_overrides(|| {
        let settings = ConfigLoader::<Mailer>::new()
            .with_local_path(&local)
            .load()
            .unwrap();
        assert_eq!(settings.email_text, "line1\n{{brackets}}");

        let wire = settings
            .export(ExportFormat::Yaml, ExportOptions::wire_safe())
            .unwrap();
        assert!(wire.contains("ʃbracketsʅ"));
        assert!(wire.contains("email_text: |"));

        let plain = settings
            .export(ExportFormat::Yaml, ExportOptions::default())
            .unwrap();
        assert!(plain.contains("{{brackets}}"));
        assert!(plain.contains("email_text: |"));
        let reparsed: Mailer = serde_yaml::from_str(&plain).unwrap();
        assert_eq!(reparsed, *settings);
    });
}

#[test]
fn test_large_value_round_trips_through_store() {
    let store = MemoryStore::new();
    let text: String = "0123456789{{x}}".chars().cycle().take(5000).collect();

    let mut parameter = Parameter::new("/app/large", "");
    parameter.write(&store, Some(&text)).unwrap();
    assert!(!store.raw_value("/app/large").unwrap().contains("{{"));

    let fetched = Parameter::fetch(&store, "/app/large", "").unwrap();
    assert_eq!(fetched.decoded_value(), text);
}

#[test]
fn test_missing_parameter_is_empty() {
    let store = MemoryStore::new();
    let fetched = Parameter::fetch(&store, "/does/not/exist", "").unwrap();
    assert_eq!(fetched.value(), "");
    assert!(fetched.lazy_dict().is_empty());
}

#[test]
fn test_tags_are_fetched_once_on_demand() {
    let store = Arc::new(MemoryStore::new());
    store.insert("/app/a", "1");
    store.insert("/app/b", "2");

    let tree = ParameterTree::new(store.clone());
    let node = tree.at("/app").child("a").unwrap();
    let parameter = node.parameter().unwrap();
    assert_eq!(store.calls().list_tags(), 0);

    parameter.tags(store.as_ref()).unwrap();
    parameter.tags(store.as_ref()).unwrap();
    assert_eq!(store.calls().list_tags(), 1);
}

#[test]
fn test_listing_happens_once() {
    let store = Arc::new(MemoryStore::new());
    store.insert("/app/db/host", "h");
    store.insert("/app/db/port", "5432");
    store.insert("/other/x", "y");

    let tree = ParameterTree::new(store.clone());
    let app = tree.at("/app");
    app.ensure_listed().unwrap();
    app.ensure_listed().unwrap();
    let db = app.child("db").unwrap();
    let names: Vec<_> = db.children().unwrap().iter().map(|n| n.name().to_string()).collect();
    assert_eq!(names, ["/app/db/host", "/app/db/port"]);

    let calls = store.calls();
    assert_eq!(calls.describe(), 1);
    assert_eq!(calls.get_by_path(), 1);
}

#[test]
fn test_write_back_to_origin() {
    let store = Arc::new(MemoryStore::new());
    store.insert("/app/mailer", "email_text: hi\n");

    let registry = SchemaRegistry::new()
        .register::<Document>()
        .register::<Mailer>()
        .with_store(store.clone());
    let settings = registry.fetch("/app/mailer").unwrap();
    assert_eq!(settings.schema_name(), "Mailer");

    let mailer = settings.downcast_ref::<Mailer>().unwrap();
    let updated = Settings::new(Mailer {
        email_text: "bye {{name}}".into(),
        retries: 3,
    })
    .with_store(store.clone())
    .with_origin(mailer.origin().unwrap().clone());
    updated
        .write_config(ExportFormat::Json, WriteTarget::default())
        .unwrap();

    let fetched = Parameter::fetch(store.as_ref(), "/app/mailer", "").unwrap();
    assert_eq!(
        serde_json::Value::Object(fetched.lazy_dict()),
        json!({"email_text": "bye {{name}}", "retries": 3})
    );
    assert_eq!(fetched.version, Some(2));
    assert_eq!(store.calls().put(), 1);
}
