//! Lifecycle controller — the control surface for listeners.
//!
//! Every mutation of module options, the active registry and the store runs
//! under one async mutex. Plugin calls are awaited while it is held.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use picket_core::error::{AppError, ErrorKind};
use picket_core::result::AppResult;
use picket_database::ListenerStore;
use picket_entity::listener::options::NAME;
use picket_entity::listener::{ActiveListener, ListenerOptions, ListenerRow};

use crate::catalog::{PluginCatalog, PluginDefinition};
use crate::persistence::PersistenceGateway;
use crate::plugin::{ListenerFactories, contain_shutdown, contain_start, contain_validate};
use crate::registry::ListenerRegistry;
use crate::resolver::OptionResolver;

/// Target selecting every module or every active listener.
pub const ALL: &str = "all";

fn is_all(target: &str) -> bool {
    target.eq_ignore_ascii_case(ALL)
}

/// Outcome of boot-time recovery.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Names of listeners restarted, in row order.
    pub recovered: Vec<String>,
    /// One entry per row that could not be restarted.
    pub failures: Vec<AppError>,
}

impl RecoveryReport {
    /// Number of failures of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.failures.iter().filter(|e| e.kind == kind).count()
    }
}

#[derive(Debug)]
struct ControlState {
    catalog: PluginCatalog,
    registry: ListenerRegistry,
}

/// Orchestrates start, shutdown, kill and recovery of listeners.
#[derive(Debug)]
pub struct LifecycleController {
    state: Mutex<ControlState>,
    persistence: PersistenceGateway,
}

impl LifecycleController {
    /// Creates a controller over an already built catalog.
    pub fn new(catalog: PluginCatalog, store: Arc<dyn ListenerStore>) -> Self {
        Self {
            state: Mutex::new(ControlState {
                catalog,
                registry: ListenerRegistry::new(),
            }),
            persistence: PersistenceGateway::new(store),
        }
    }

    /// Discovers listener modules under `root` and creates a controller.
    pub fn load(
        root: &Path,
        factories: &ListenerFactories,
        store: Arc<dyn ListenerStore>,
    ) -> AppResult<Self> {
        let catalog = PluginCatalog::discover(root, factories)?;
        if catalog.is_empty() {
            warn!(root = %root.display(), "No listener modules loaded");
        }
        Ok(Self::new(catalog, store))
    }

    // ── Options ──────────────────────────────────────────────────

    /// Sets an option on one module, or on every module with `all`.
    ///
    /// Returns the number of modules updated.
    pub async fn set_option(&self, target: &str, option: &str, value: &str) -> AppResult<usize> {
        let mut state = self.state.lock().await;

        if is_all(target) {
            return OptionResolver::set_option_all(&mut state.catalog, option, value);
        }

        let definition = state
            .catalog
            .get_mut(target)
            .ok_or_else(|| unknown_module(target))?;
        OptionResolver::set_option(&mut definition.options, option, value)?;
        Ok(1)
    }

    // ── Start ────────────────────────────────────────────────────

    /// Starts a listener from a module's current options.
    pub async fn start_listener(&self, module: &str) -> AppResult<ActiveListener> {
        let mut state = self.state.lock().await;
        let ControlState { catalog, registry } = &mut *state;

        let definition = catalog.get_mut(module).ok_or_else(|| unknown_module(module))?;

        if let Err(reason) = contain_validate(definition.plugin(), &definition.options) {
            warn!(module = %module, reason = %reason, "Listener options rejected");
            return Err(AppError::validation(format!(
                "Listener module '{module}' options are invalid: {reason}"
            )));
        }

        let base = match definition.options.value(NAME) {
            "" => definition.name.clone(),
            name => name.to_string(),
        };
        let name = registry.resolve_name(&base);
        if name != base {
            info!(requested = %base, listener = %name, "Listener name already in use; renamed");
        }
        definition.options.set_value(NAME, name.as_str());

        let record = launch(definition, registry, &name).await?;

        if let Err(e) = self.persistence.record_started(&record).await {
            error!(listener = %name, error = %e, "Listener started but could not be recorded");
            return Err(AppError::with_source(
                ErrorKind::Database,
                format!("Listener '{name}' is running but was not recorded"),
                e,
            ));
        }

        Ok(record)
    }

    // ── Recovery ─────────────────────────────────────────────────

    /// Restarts every persisted listener.
    ///
    /// Per-row failures are collected in the report; only a failure to read
    /// the rows fails the call.
    pub async fn recover_all(&self) -> AppResult<RecoveryReport> {
        let mut state = self.state.lock().await;
        let rows = self.persistence.load_all().await?;

        info!(rows = rows.len(), "Recovering persisted listeners");

        let mut report = RecoveryReport::default();
        for row in &rows {
            match recover_row(&mut state, row).await {
                Ok(name) => report.recovered.push(name),
                Err(e) => {
                    error!(
                        listener = %row.name,
                        module = %row.module,
                        error = %e,
                        "Listener recovery failed"
                    );
                    report.failures.push(e);
                }
            }
        }

        info!(
            recovered = report.recovered.len(),
            failed = report.failures.len(),
            orphaned = report.count(ErrorKind::OrphanRecord),
            "Listener recovery complete"
        );
        Ok(report)
    }

    // ── Shutdown / kill ──────────────────────────────────────────

    /// Stops a listener, or every listener with `all`. Rows are kept.
    pub async fn shutdown_listener(&self, target: &str) -> AppResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let names = select_targets(&state.registry, target)?;

        for name in &names {
            stop(&mut state, name).await;
        }
        Ok(names)
    }

    /// Stops a listener, or every listener with `all`, and deletes its rows.
    pub async fn kill_listener(&self, target: &str) -> AppResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let names = select_targets(&state.registry, target)?;

        let mut undeleted = Vec::new();
        for name in &names {
            stop(&mut state, name).await;

            match self.persistence.forget(name).await {
                Ok(_) => info!(listener = %name, "Listener killed"),
                Err(e) => {
                    error!(listener = %name, error = %e, "Failed to delete listener row");
                    if !is_all(target) {
                        return Err(AppError::with_source(
                            ErrorKind::Database,
                            format!("Listener '{name}' was stopped but its record was not deleted"),
                            e,
                        ));
                    }
                    undeleted.push(name.clone());
                }
            }
        }

        if !undeleted.is_empty() {
            return Err(AppError::database(format!(
                "Listeners were stopped but their records were not deleted: {}",
                undeleted.join(", ")
            )));
        }
        Ok(names)
    }

    /// Stops every active listener without deleting rows.
    pub async fn shutdown_all(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        let names: Vec<String> = state.registry.names().into_iter().collect();

        for name in &names {
            stop(&mut state, name).await;
        }
        if !names.is_empty() {
            info!(count = names.len(), "All listeners shut down");
        }
        names
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Whether a listener with this name is running.
    pub async fn is_active(&self, name: &str) -> bool {
        self.state.lock().await.registry.contains(name)
    }

    /// Names of all running listeners.
    pub async fn list_active_names(&self) -> BTreeSet<String> {
        self.state.lock().await.registry.names()
    }

    /// Snapshot of one running listener.
    pub async fn active_listener(&self, name: &str) -> Option<ActiveListener> {
        self.state.lock().await.registry.get(name).cloned()
    }

    /// Names of loaded modules.
    pub async fn loaded_modules(&self) -> Vec<String> {
        self.state.lock().await.catalog.names()
    }

    /// Copy of a module's current options.
    pub async fn module_options(&self, module: &str) -> Option<ListenerOptions> {
        self.state
            .lock()
            .await
            .catalog
            .get(module)
            .map(|definition| definition.options.clone())
    }

    /// Description declared by a module's manifest.
    pub async fn module_description(&self, module: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .catalog
            .get(module)
            .map(|definition| definition.description.clone())
    }

    /// Manifests that failed to load.
    pub async fn discovery_failures(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .catalog
            .discovery_failures()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Row id of a persisted listener, by name or id.
    pub async fn resolve_id(&self, name_or_id: &str) -> AppResult<Option<Uuid>> {
        self.persistence.resolve_id(name_or_id).await
    }

    /// Name of a persisted listener, by id or name.
    pub async fn resolve_name(&self, id_or_name: &str) -> AppResult<Option<String>> {
        self.persistence.resolve_name(id_or_name).await
    }

    /// Module of a persisted listener.
    pub async fn resolve_module(&self, name: &str) -> AppResult<Option<String>> {
        self.persistence.resolve_module(name).await
    }

    /// Options recorded for a persisted listener.
    pub async fn persisted_options(&self, name: &str) -> AppResult<Option<ListenerOptions>> {
        self.persistence.persisted_options(name).await
    }
}

fn unknown_module(module: &str) -> AppError {
    AppError::not_found(format!("Listener module '{module}' is not loaded"))
}

fn select_targets(registry: &ListenerRegistry, target: &str) -> AppResult<Vec<String>> {
    if is_all(target) {
        return Ok(registry.names().into_iter().collect());
    }
    if !registry.contains(target) {
        return Err(AppError::not_active(format!(
            "Listener '{target}' is not active"
        )));
    }
    Ok(vec![target.to_string()])
}

/// Calls `start` and registers the listener on success.
async fn launch(
    definition: &PluginDefinition,
    registry: &mut ListenerRegistry,
    name: &str,
) -> AppResult<ActiveListener> {
    info!(listener = %name, module = %definition.name, "Starting listener");

    match contain_start(definition.plugin(), name, &definition.options).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(listener = %name, "Listener plugin declined to start");
            return Err(AppError::start_failure(format!(
                "Listener '{name}' failed to start: declined"
            )));
        }
        Err(reason) => {
            error!(listener = %name, reason = %reason, "Listener failed to start");
            return Err(AppError::start_failure(format!(
                "Listener '{name}' failed to start: {reason}"
            )));
        }
    }

    let record = ActiveListener::new(
        name,
        definition.name.as_str(),
        definition.category.as_str(),
        definition.options.clone(),
    );
    registry.insert(record.clone())?;

    info!(listener = %name, module = %definition.name, "Listener started");
    Ok(record)
}

async fn recover_row(state: &mut ControlState, row: &ListenerRow) -> AppResult<String> {
    let ControlState { catalog, registry } = state;

    let definition = catalog.get_mut(&row.module).ok_or_else(|| {
        AppError::orphan_record(format!(
            "Listener '{}' references module '{}' which is not loaded",
            row.name, row.module
        ))
    })?;

    let options = PersistenceGateway::decode(row)?;

    let name = registry.resolve_name(&row.name);
    definition.options.overlay(&options);
    definition.options.set_value(NAME, name.as_str());

    launch(definition, registry, &name).await?;
    Ok(name)
}

/// Shuts down one active listener and drops its record.
async fn stop(state: &mut ControlState, name: &str) {
    let Some(record) = state.registry.get(name) else {
        return;
    };

    match state.catalog.get(&record.module) {
        Some(definition) => contain_shutdown(definition.plugin(), name).await,
        None => warn!(
            listener = %name,
            module = %record.module,
            "Owning module is not loaded; dropping record"
        ),
    }

    state.registry.remove(name);
    info!(listener = %name, "Listener shut down");
}
