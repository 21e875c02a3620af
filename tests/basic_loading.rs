//! Integration tests for bootstrap loading of declared sources.

use hotswap_props::prelude::*;
use hotswap_props::sources::MemoryStore;
use std::fs;
use tempfile::TempDir;

fn store_with(entries: &[(&str, &str)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (path, payload) in entries {
        store.put(path, *payload);
    }
    store
}

#[test]
fn test_load_single_path() {
    let store = store_with(&[(
        "/app/service.properties",
        "# service settings\nport=8080\nhost = localhost\nenabled: true\n",
    )]);

    let engine = ReloadEngine::builder()
        .with_connector(store)
        .with_source(ReloadSource::new("zk1:2181").with_path("/app/service.properties"))
        .build()
        .unwrap();

    assert_eq!(*engine.bind::<u16>("${port}").unwrap().get(), 8080);
    assert_eq!(*engine.bind::<String>("${host}").unwrap().get(), "localhost");
    assert!(*engine.bind::<bool>("${enabled}").unwrap().get());
    assert_eq!(engine.watches().active_count(), 1);
}

#[test]
fn test_multiple_paths_last_wins() {
    let store = store_with(&[
        ("/app/common", "timeout=10\nregion=eu"),
        ("/app/service", "timeout=30"),
    ]);

    let engine = ReloadEngine::builder()
        .with_connector(store)
        .with_source(
            ReloadSource::new("zk1:2181")
                .with_path("/app/common")
                .with_path("/app/service"),
        )
        .build()
        .unwrap();

    assert_eq!(engine.property("timeout").as_deref(), Some("30"));
    assert_eq!(engine.property("region").as_deref(), Some("eu"));
    assert_eq!(engine.watches().active_count(), 2);
}

#[test]
fn test_missing_path_is_fatal() {
    let store = store_with(&[]);

    let result = ReloadEngine::builder()
        .with_connector(store)
        .with_source(ReloadSource::new("zk1:2181").with_path("/app/missing"))
        .build();

    match result {
        Err(err @ ReloadError::Resource { .. }) => {
            assert!(err.is_not_found());
            assert!(err.to_string().contains("/app/missing"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a resource error"),
    }
}

#[test]
fn test_missing_path_ignored() {
    let store = store_with(&[("/app/present", "a=1")]);

    let engine = ReloadEngine::builder()
        .with_connector(store.clone())
        .with_source(
            ReloadSource::new("zk1:2181")
                .with_path("/app/missing")
                .with_path("/app/present")
                .ignore_resource_not_found(true),
        )
        .build()
        .unwrap();

    assert_eq!(engine.property("a").as_deref(), Some("1"));
    assert_eq!(store.watch_count("/app/missing"), 0);
    assert_eq!(store.watch_count("/app/present"), 1);
}

#[test]
fn test_unresolvable_binding() {
    let store = store_with(&[("/app", "a=1")]);
    let engine = ReloadEngine::builder()
        .with_connector(store)
        .with_source(ReloadSource::new("zk1:2181").with_path("/app"))
        .build()
        .unwrap();

    let err = engine.bind::<String>("${a}-${b}").unwrap_err();
    assert!(matches!(err, ReloadError::Resolution { ref placeholder, .. } if placeholder == "b"));

    let with_default = engine.bind::<String>("${a}-${b:none}").unwrap();
    assert_eq!(*with_default.get(), "1-none");
}

#[test]
fn test_initial_conversion_failure_names_target() {
    let store = store_with(&[("/app", "port=eighty")]);
    let engine = ReloadEngine::builder()
        .with_connector(store)
        .with_source(ReloadSource::new("zk1:2181").with_path("/app"))
        .build()
        .unwrap();

    let err = engine.bind::<u16>("${port}").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("${port}"));
    assert!(text.contains("eighty"));
}

#[test]
fn test_load_sources_from_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("reload.yaml");
    fs::write(
        &settings,
        r#"
sources:
  - location: "zk1:2181"
    credential: "app:secret"
    paths: ["/app/a"]
  - location: "zk2:2181"
    paths: ["/app/b"]
    encoding: "ISO-8859-1"
"#,
    )
    .unwrap();

    let store = MemoryStore::new();
    store.put("/app/a", "a=1");
    store.put("/app/b", b"name=caf\xe9".to_vec());

    let engine = ReloadEngine::builder()
        .with_connector(store.clone())
        .with_settings_file(&settings)
        .build()
        .unwrap();

    assert_eq!(engine.property("a").as_deref(), Some("1"));
    assert_eq!(engine.property("name").as_deref(), Some("café"));
    assert_eq!(store.connection_count(), 2);
}

#[test]
fn test_invalid_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("reload.yaml");
    fs::write(&settings, "sources:\n  - credential: only\n").unwrap();

    let result = ReloadEngine::builder()
        .with_connector(MemoryStore::new())
        .with_settings_file(&settings)
        .build();

    assert!(matches!(result, Err(ReloadError::Settings(_))));
}

#[test]
fn test_unsupported_encoding_rejected() {
    let store = store_with(&[("/app", "a=1")]);

    let result = ReloadEngine::builder()
        .with_connector(store)
        .with_source(
            ReloadSource::new("zk1:2181")
                .with_path("/app")
                .with_encoding("UTF-16"),
        )
        .build();

    assert!(matches!(result, Err(ReloadError::Configuration(_))));
}

#[test]
fn test_empty_bootstrap_payload_still_watched() {
    let store = store_with(&[("/app", "")]);

    let engine = ReloadEngine::builder()
        .with_connector(store.clone())
        .with_source(ReloadSource::new("zk1:2181").with_path("/app"))
        .with_property("a", "0")
        .build()
        .unwrap();

    let value = engine.bind::<i32>("${a}").unwrap();
    store.put("/app", "a=5");

    assert_eq!(*value.get(), 5);
}
