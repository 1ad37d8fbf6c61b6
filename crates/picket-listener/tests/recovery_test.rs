//! Integration tests for boot-time recovery and manifest loading.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use picket_core::error::ErrorKind;
use picket_database::MemoryListenerStore;
use picket_listener::{
    LifecycleController, ListenerFactories, ListenerFactory, ListenerManifest, ListenerPlugin,
};

use helpers::{Behaviour, FlakyStore, MockPlugin};

#[tokio::test]
async fn test_orphan_row_is_reported_and_others_recover() {
    let plugin = MockPlugin::new(Behaviour::Accept);
    let store = MemoryListenerStore::with_rows(vec![
        helpers::row("http", "http", "http://10.0.0.1", "80"),
        helpers::row("dbx", "dropbox", "http://10.0.0.2", "80"),
        helpers::row("backup", "http", "http://10.0.0.3:8080", "8080"),
    ]);
    let control = helpers::controller(&[("http", plugin.clone())], Arc::new(store.clone()));

    let report = control.recover_all().await.unwrap();

    assert_eq!(report.recovered, vec!["http", "backup"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.count(ErrorKind::OrphanRecord), 1);
    assert!(report.failures[0].message.contains("dropbox"));

    // Persisted options were applied before start.
    let options = plugin.started_with("backup").unwrap();
    assert_eq!(options.value("Host"), "http://10.0.0.3:8080");
    assert_eq!(options.value("Name"), "backup");

    // Recovery does not write rows, and orphans are left in place.
    assert_eq!(store.rows().await.len(), 3);
}

#[tokio::test]
async fn test_recovered_name_collision_is_suffixed() {
    let plugin = MockPlugin::new(Behaviour::Accept);
    let store = MemoryListenerStore::with_rows(vec![
        helpers::row("http", "http", "http://10.0.0.1", "80"),
        helpers::row("http", "http", "http://10.0.0.9", "80"),
    ]);
    let control = helpers::controller(&[("http", plugin.clone())], Arc::new(store));

    let report = control.recover_all().await.unwrap();

    assert_eq!(report.recovered, vec!["http", "http1"]);
    let second = control.active_listener("http1").await.unwrap();
    assert_eq!(second.options.value("Host"), "http://10.0.0.9");
    assert_eq!(second.options.value("Name"), "http1");
}

#[tokio::test]
async fn test_undecodable_and_failed_rows() {
    let plugin = MockPlugin::new(Behaviour::Accept);
    let broken = MockPlugin::new(Behaviour::Fail("certificate not found".to_string()));

    let mut newer = helpers::row("future", "http", "http://10.0.0.1", "80");
    newer.options = serde_json::json!({ "version": 2, "options": {} });
    let mut garbage = helpers::row("garbage", "http", "http://10.0.0.1", "80");
    garbage.options = serde_json::json!("not a document");

    let store = MemoryListenerStore::with_rows(vec![
        newer,
        garbage,
        helpers::row("https", "https", "https://10.0.0.1", "443"),
        helpers::row("http", "http", "http://10.0.0.1", "80"),
    ]);
    let control = helpers::controller(
        &[("http", plugin), ("https", broken)],
        Arc::new(store.clone()),
    );

    let report = control.recover_all().await.unwrap();

    assert_eq!(report.recovered, vec!["http"]);
    assert_eq!(report.count(ErrorKind::Serialization), 2);
    assert_eq!(report.count(ErrorKind::StartFailure), 1);
    assert!(!control.is_active("https").await);
    assert_eq!(store.rows().await.len(), 4);
}

#[tokio::test]
async fn test_row_listing_failure_fails_recovery() {
    let store = FlakyStore::new(MemoryListenerStore::new());
    store.fail_list.store(true, Ordering::SeqCst);
    let control = helpers::controller(&[("http", MockPlugin::new(Behaviour::Accept))], store);

    let err = control.recover_all().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[tokio::test]
async fn test_kill_after_recovery_deletes_row() {
    let plugin = MockPlugin::new(Behaviour::Accept);
    let store = MemoryListenerStore::with_rows(vec![helpers::row(
        "http",
        "http",
        "http://10.0.0.1",
        "80",
    )]);
    let control = helpers::controller(&[("http", plugin.clone())], Arc::new(store.clone()));

    control.recover_all().await.unwrap();
    assert_eq!(control.kill_listener("http").await.unwrap(), vec!["http"]);
    assert_eq!(plugin.stopped(), vec!["http"]);
    assert!(store.rows().await.is_empty());
}

#[derive(Debug)]
struct SharedFactory(Arc<MockPlugin>);

impl ListenerFactory for SharedFactory {
    fn kind(&self) -> &str {
        "mock"
    }

    fn create(&self, _manifest: &ListenerManifest) -> Result<Arc<dyn ListenerPlugin>, String> {
        let plugin: Arc<dyn ListenerPlugin> = self.0.clone();
        Ok(plugin)
    }
}

const MANIFEST: &str = r#"
kind = "mock"
category = "client_server"
description = "Starts an HTTP listener."

[options.Name]
value = "http"
required = true

[options.Host]
value = ""
required = true

[options.Port]
value = ""
required = true

[options.StagingKey]
value = ""
required = true
"#;

#[tokio::test]
async fn test_load_from_directory_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("hop")).unwrap();
    std::fs::write(dir.path().join("http.toml"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("hop/http_hop.toml"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("http_template.toml"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("broken.toml"), "kind = ").unwrap();

    let plugin = MockPlugin::new(Behaviour::Accept);
    let mut factories = ListenerFactories::new();
    factories
        .register(Arc::new(SharedFactory(plugin.clone())))
        .unwrap();

    let store = MemoryListenerStore::new();
    let control =
        LifecycleController::load(dir.path(), &factories, Arc::new(store.clone())).unwrap();

    assert_eq!(control.loaded_modules().await, vec!["hop/http_hop", "http"]);
    assert_eq!(control.discovery_failures().await.len(), 1);
    assert_eq!(
        control.module_description("http").await.as_deref(),
        Some("Starts an HTTP listener.")
    );
    assert!(control.module_description("ghost").await.is_none());

    control.set_option("http", "Host", "10.0.0.1:8080").await.unwrap();
    control.set_option("http", "StagingKey", "password").await.unwrap();
    let record = control.start_listener("http").await.unwrap();
    assert_eq!(record.options.value("Host"), "http://10.0.0.1:8080");
    assert_eq!(record.options.value("Port"), "8080");
    assert_eq!(
        record.options.value("StagingKey"),
        "5f4dcc3b5aa765d61d8327deb882cf99"
    );

    // A second process over the same store restarts the listener.
    control.shutdown_all().await;
    let restarted =
        LifecycleController::load(dir.path(), &factories, Arc::new(store.clone())).unwrap();
    let report = restarted.recover_all().await.unwrap();
    assert_eq!(report.recovered, vec!["http"]);
    let options = restarted.module_options("http").await.unwrap();
    assert_eq!(options.value("Port"), "8080");
    assert_eq!(
        options.value("StagingKey"),
        "5f4dcc3b5aa765d61d8327deb882cf99"
    );
}
