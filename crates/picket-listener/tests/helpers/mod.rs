//! Shared helpers for listener control-plane tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use picket_core::error::AppError;
use picket_core::result::AppResult;
use picket_database::{ListenerStore, MemoryListenerStore};
use picket_entity::listener::{
    ListenerOptions, ListenerRow, NewListenerRow, OptionValue, PersistedOptions,
};
use picket_listener::{LifecycleController, ListenerPlugin, PluginCatalog, PluginDefinition};

/// How a [`MockPlugin`] answers `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behaviour {
    Accept,
    Decline,
    Fail(String),
    Panic,
}

/// Plugin that records the calls it receives.
#[derive(Debug)]
pub struct MockPlugin {
    behaviour: Mutex<Behaviour>,
    started: Mutex<Vec<(String, ListenerOptions)>>,
    stopped: Mutex<Vec<String>>,
}

impl MockPlugin {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Mutex::new(behaviour),
            started: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
        })
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn started(&self) -> Vec<String> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn started_with(&self, name: &str) -> Option<ListenerOptions> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, options)| options.clone())
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListenerPlugin for MockPlugin {
    async fn start(&self, name: &str, options: &ListenerOptions) -> Result<bool, String> {
        let behaviour = self.behaviour.lock().unwrap().clone();
        match behaviour {
            Behaviour::Accept => {
                self.started
                    .lock()
                    .unwrap()
                    .push((name.to_string(), options.clone()));
                Ok(true)
            }
            Behaviour::Decline => Ok(false),
            Behaviour::Fail(reason) => Err(reason),
            Behaviour::Panic => panic!("listener thread died"),
        }
    }

    async fn shutdown(&self, name: &str) {
        self.stopped.lock().unwrap().push(name.to_string());
    }
}

/// Store that can be told to fail specific operations.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryListenerStore,
    pub fail_insert: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_delete_for: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryListenerStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            ..Self::default()
        })
    }

    pub fn fail_delete(&self, name: &str) {
        self.fail_delete_for.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl ListenerStore for FlakyStore {
    async fn insert(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.insert(row).await
    }

    async fn replace(&self, row: NewListenerRow) -> AppResult<ListenerRow> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.replace(row).await
    }

    async fn delete_by_name(&self, name: &str) -> AppResult<u64> {
        if self.fail_delete_for.lock().unwrap().iter().any(|n| n == name) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.delete_by_name(name).await
    }

    async fn list_all(&self) -> AppResult<Vec<ListenerRow>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.list_all().await
    }

    async fn find_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>> {
        self.inner.find_id(name_or_id).await
    }

    async fn find_name(&self, id_or_name: &str) -> AppResult<Option<String>> {
        self.inner.find_name(id_or_name).await
    }

    async fn find_module(&self, name: &str) -> AppResult<Option<String>> {
        self.inner.find_module(name).await
    }

    async fn find_options(&self, name: &str) -> AppResult<Option<serde_json::Value>> {
        self.inner.find_options(name).await
    }
}

/// Option schema shared by the test modules.
pub fn http_schema(name: &str) -> ListenerOptions {
    let mut options = ListenerOptions::new();
    options.insert("Name", OptionValue::new(name, true, "Name for the listener."));
    options.insert("Host", OptionValue::new("", true, "Callback host."));
    options.insert("Port", OptionValue::new("", true, "Bind port."));
    options.insert("CertPath", OptionValue::new("", false, "Certificate path."));
    options.insert("DefaultDelay", OptionValue::new("5", true, "Agent delay."));
    options
}

/// Controller with one module per `(name, plugin)` pair.
pub fn controller(
    modules: &[(&str, Arc<MockPlugin>)],
    store: Arc<dyn ListenerStore>,
) -> LifecycleController {
    let mut catalog = PluginCatalog::new();
    for (name, plugin) in modules {
        let plugin: Arc<dyn ListenerPlugin> = plugin.clone();
        catalog
            .register(PluginDefinition::new(
                *name,
                "client_server",
                http_schema(name),
                plugin,
            ))
            .unwrap();
    }
    LifecycleController::new(catalog, store)
}

/// A persisted row as an earlier run would have left it.
pub fn row(name: &str, module: &str, host: &str, port: &str) -> ListenerRow {
    let mut options = http_schema(name);
    options.set_value("Host", host);
    options.set_value("Port", port);
    NewListenerRow {
        name: name.to_string(),
        module: module.to_string(),
        listener_category: "client_server".to_string(),
        options: PersistedOptions::new(options).to_json().unwrap(),
    }
    .into_row()
}
