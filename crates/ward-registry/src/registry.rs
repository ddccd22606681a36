// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Scope registry.
//!
//! The registry owns every loaded [`ScopeData`], the mirror table and the
//! global groups. Lookups never fail: an unknown scope falls back to the
//! catch-all scope, then to the default scope.
//!
//! # Lock order
//!
//! 1. registry state
//! 2. scope tables (users before groups)
//! 3. global groups
//!
//! Host callbacks and notifications run without the registry state lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn};
use ward_config::{MirrorEntry, WardConfig};
use ward_core::{
    now_millis, ClientInfo, EffectivePermissions, GlobalGroups, LoggingNotifier,
    PermissionNotifier, ScopeData, ScopeHost, StaticHost, TableKind, GLOBAL_SCOPE,
};
use ward_store::{LoadReport, SyncOutcome, YamlSource};

use crate::error::{RegistryError, RegistryResult};
use crate::mirror::MirrorMap;
use crate::report::SyncReport;

// =============================================================================
// Registry state
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    scopes: BTreeMap<String, ScopeData>,
    mirrors: MirrorMap,
}

impl RegistryState {
    fn has_own_data(&self, scope: &str) -> bool {
        let key = scope.to_lowercase();
        self.scopes.contains_key(&key) && !self.mirrors.is_full_mirror(&key)
    }
}

/// Sets the loaded flag back when a reload pass ends.
struct ReloadGuard<'a>(&'a AtomicBool);

impl<'a> ReloadGuard<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        flag.store(false, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

// =============================================================================
// ScopeRegistry
// =============================================================================

/// Registry of all scopes known to the process.
pub struct ScopeRegistry {
    source: YamlSource,
    global: Arc<GlobalGroups>,
    state: RwLock<RegistryState>,
    loaded: AtomicBool,
    default_scope: String,
    catch_all: String,
    mirror_entries: Vec<MirrorEntry>,
    host: Arc<dyn ScopeHost>,
    notifier: Arc<dyn PermissionNotifier>,
}

impl ScopeRegistry {
    /// Creates a builder around a persistence source.
    pub fn builder(source: YamlSource) -> ScopeRegistryBuilder {
        ScopeRegistryBuilder::new(source)
    }

    /// Returns the persistence source.
    pub fn source(&self) -> &YamlSource {
        &self.source
    }

    /// Returns the global groups.
    pub fn global(&self) -> &Arc<GlobalGroups> {
        &self.global
    }

    /// Returns the default scope name, lowercase.
    pub fn default_scope_name(&self) -> &str {
        &self.default_scope
    }

    /// Returns the catch-all scope name, lowercase.
    pub fn catch_all_name(&self) -> &str {
        &self.catch_all
    }

    /// Returns `true` once a load completed and no reload is running.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Drops all loaded data and loads everything from disk.
    ///
    /// Order: global groups, the default scope, mirror sources, mirror
    /// targets, then host scopes and scope folders.
    ///
    /// # Errors
    ///
    /// Fails if the default scope or a configured mirror cannot be loaded.
    /// Scope folders found on disk that fail to load are skipped.
    pub fn reset(&self) -> RegistryResult<()> {
        self.loaded.store(false, Ordering::Release);
        let host_scopes = self.host.active_scopes();
        let mut state = self.state.write();
        *state = RegistryState {
            scopes: BTreeMap::new(),
            mirrors: MirrorMap::build(&self.mirror_entries, &self.default_scope),
        };

        self.source.init_global()?;
        self.source.reload_global(&self.global)?;

        self.source.init_scope(&self.default_scope, false, false)?;
        self.load_scope(&mut state, &self.default_scope)?;

        for source in state.mirrors.sources() {
            self.init_scope(&state, &source)?;
            self.load_scope(&mut state, &source)?;
        }

        for target in state.mirrors.targets() {
            if !state.scopes.contains_key(&target) {
                debug!(scope = %target, "No data for mirror target, initializing");
                self.init_scope(&state, &target)?;
                self.load_scope(&mut state, &target)?;
            }
        }

        self.load_all_searched_scopes(&mut state, host_scopes)?;

        info!(
            scopes = state.scopes.len(),
            default_scope = %self.default_scope,
            "Scope registry loaded"
        );
        drop(state);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn init_scope(&self, state: &RegistryState, scope: &str) -> RegistryResult<()> {
        self.source.init_scope(
            scope,
            state.mirrors.has_groups_mirror(scope),
            state.mirrors.has_users_mirror(scope),
        )?;
        Ok(())
    }

    /// Loads a scope and registers it. Mirrored tables are shared with the
    /// source scope, which is loaded first if needed.
    fn load_scope(&self, state: &mut RegistryState, scope: &str) -> RegistryResult<ScopeData> {
        self.load_scope_guarded(state, scope, &mut Vec::new())
    }

    fn load_scope_guarded(
        &self,
        state: &mut RegistryState,
        scope: &str,
        visiting: &mut Vec<String>,
    ) -> RegistryResult<ScopeData> {
        let key = scope.to_lowercase();
        if let Some(data) = state.scopes.get(&key) {
            return Ok(data.clone());
        }
        if visiting.contains(&key) {
            return Err(RegistryError::MirrorCycle { scope: key });
        }
        visiting.push(key.clone());

        let groups_source = state.mirrors.groups_source(&key).map(str::to_string);
        let users_source = state.mirrors.users_source(&key).map(str::to_string);

        let groups = match groups_source {
            Some(source) => self
                .load_scope_guarded(state, &source, visiting)?
                .groups()
                .clone(),
            None => {
                let (table, _report) = self.source.load_groups_table(&key, &self.global)?;
                Arc::new(RwLock::new(table))
            }
        };

        let users = match users_source {
            Some(source) => self
                .load_scope_guarded(state, &source, visiting)?
                .users()
                .clone(),
            None => {
                let (table, _report) = {
                    let groups = groups.read();
                    self.source.load_users_table(&key, &groups, &self.global)?
                };
                Arc::new(RwLock::new(table))
            }
        };

        visiting.pop();
        let data = ScopeData::with_tables(key.clone(), groups, users);
        state.scopes.insert(key.clone(), data.clone());
        debug!(
            scope = %key,
            groups_mirror = state.mirrors.has_groups_mirror(&key),
            users_mirror = state.mirrors.has_users_mirror(&key),
            "Loaded scope"
        );
        Ok(data)
    }

    /// Prepares host scopes and loads every scope folder not yet loaded.
    fn load_all_searched_scopes(
        &self,
        state: &mut RegistryState,
        host_scopes: Vec<String>,
    ) -> RegistryResult<()> {
        for scope in host_scopes {
            let key = scope.to_lowercase();
            if state.has_own_data(&key) || state.mirrors.is_full_mirror(&key) {
                continue;
            }
            if state.has_own_data(&self.catch_all) {
                state.mirrors.inherit(&key, &self.catch_all);
            }
            debug!(scope = %key, "Creating folders for host scope");
            self.init_scope(state, &key)?;
        }

        for folder in self.source.discover_scopes()? {
            if state.has_own_data(&folder) || state.mirrors.is_full_mirror(&folder) {
                continue;
            }
            info!(scope = %folder, "Found scope folder");
            self.init_scope(state, &folder)?;
            if let Err(e) = self.load_scope(state, &folder) {
                error!(
                    scope = %folder,
                    error = %e,
                    error_type = e.error_type(),
                    "Failed to load scope; skipped"
                );
            }
        }
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Returns the data for `scope`: the scope itself, else the catch-all
    /// scope, else the default scope. `None` only before the first load.
    pub fn resolve_scope(&self, scope: &str) -> Option<ScopeData> {
        let state = self.state.read();
        let key = scope.to_lowercase();
        if let Some(data) = state.scopes.get(&key) {
            return Some(data.clone());
        }
        if let Some(data) = state.scopes.get(&self.catch_all) {
            trace!(scope = %key, "Scope not found, using catch-all scope");
            return Some(data.clone());
        }
        trace!(scope = %key, "Scope not found, using default scope");
        state.scopes.get(&self.default_scope).cloned()
    }

    /// Returns the default scope's data.
    pub fn default_scope(&self) -> Option<ScopeData> {
        self.state.read().scopes.get(&self.default_scope).cloned()
    }

    /// Returns the data of an exactly named, loaded scope.
    pub fn scope(&self, scope: &str) -> Option<ScopeData> {
        self.state.read().scopes.get(&scope.to_lowercase()).cloned()
    }

    /// Resolves the effective permissions of `user_id` in `scope`.
    pub fn resolve_permissions(
        &self,
        scope: &str,
        user_id: &str,
    ) -> RegistryResult<EffectivePermissions> {
        let data = self.resolve_scope(scope).ok_or(RegistryError::NotLoaded)?;
        Ok(data.resolve_permissions(user_id, &self.global, now_millis())?)
    }

    /// Returns the data for the scope a connected client is in.
    pub fn resolve_scope_for_client(&self, client_id: &str) -> Option<ScopeData> {
        let scope = self.host.client_scope(client_id)?;
        self.resolve_scope(&scope)
    }

    /// Returns the data for the scope of the single client matching
    /// `fragment`. No match and an ambiguous match both yield `None`.
    pub fn resolve_scope_by_client_name(&self, fragment: &str) -> Option<ScopeData> {
        let client = self.host.match_clients(fragment).into_single()?;
        self.resolve_scope(&client.scope)
    }

    /// Returns `true` if `scope` is loaded or mirrors anything.
    pub fn is_in_list(&self, scope: &str) -> bool {
        let state = self.state.read();
        let key = scope.to_lowercase();
        state.scopes.contains_key(&key) || state.mirrors.contains(&key)
    }

    /// Returns `true` if `scope` is loaded and not fully mirrored.
    pub fn has_own_data(&self, scope: &str) -> bool {
        self.state.read().has_own_data(scope)
    }

    /// Returns `true` if the group table of `scope` is mirrored.
    pub fn has_groups_mirror(&self, scope: &str) -> bool {
        self.state.read().mirrors.has_groups_mirror(scope)
    }

    /// Returns `true` if the user table of `scope` is mirrored.
    pub fn has_users_mirror(&self, scope: &str) -> bool {
        self.state.read().mirrors.has_users_mirror(scope)
    }

    /// Returns the names of all loaded scopes.
    pub fn scope_names(&self) -> Vec<String> {
        self.state.read().scopes.keys().cloned().collect()
    }

    /// Returns the loaded scopes that hold at least one table of their own.
    ///
    /// A full mirror of a single source is represented by that source. The
    /// catch-all scope is left out.
    pub fn all_scopes_data_list(&self) -> Vec<ScopeData> {
        let state = self.state.read();
        let mut list: Vec<ScopeData> = Vec::new();

        for (key, data) in &state.scopes {
            if *key == self.catch_all {
                continue;
            }
            let candidate = match (
                state.mirrors.users_source(key),
                state.mirrors.groups_source(key),
            ) {
                (Some(users), Some(groups)) if users == groups => state.scopes.get(users),
                _ => Some(data),
            };
            if let Some(candidate) = candidate {
                if !list.iter().any(|d| d.name() == candidate.name()) {
                    list.push(candidate.clone());
                }
            }
        }
        list
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Reloads the global groups, then every scope's own tables. All groups
    /// are reloaded before any users.
    ///
    /// A table that fails to reload keeps its previous content; the first
    /// error is returned after the pass.
    pub fn reload_all(&self) -> RegistryResult<Vec<LoadReport>> {
        let guard = ReloadGuard::begin(&self.loaded);
        let mut reports = Vec::new();
        let mut first_error: Option<RegistryError> = None;

        match self.source.reload_global(&self.global) {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(error = %e, "Failed to reload global groups");
                first_error.get_or_insert(e.into());
            }
        }

        let owned = self.owned_tables();
        for kind in [TableKind::Groups, TableKind::Users] {
            for (data, groups_own, users_own) in &owned {
                let own = match kind {
                    TableKind::Groups => *groups_own,
                    TableKind::Users => *users_own,
                };
                if !own {
                    continue;
                }
                let result = match kind {
                    TableKind::Groups => self.source.reload_groups(data, &self.global),
                    TableKind::Users => self.source.reload_users(data, &self.global),
                };
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        error!(scope = %data.name(), table = %kind, error = %e, "Reload failed");
                        first_error.get_or_insert(e.into());
                    }
                }
            }
        }
        drop(guard);

        self.notify_where(|_, _| true);
        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    /// Reloads the own tables of one scope, groups before users.
    pub fn reload_scope(&self, scope: &str) -> RegistryResult<Vec<LoadReport>> {
        let data = self.scope(scope).ok_or_else(|| RegistryError::UnknownScope {
            scope: scope.to_string(),
        })?;
        let (groups_own, users_own) = {
            let state = self.state.read();
            (
                !state.mirrors.has_groups_mirror(data.name()),
                !state.mirrors.has_users_mirror(data.name()),
            )
        };

        let guard = ReloadGuard::begin(&self.loaded);
        let mut reports = Vec::new();
        if groups_own {
            reports.push(self.source.reload_groups(&data, &self.global)?);
        }
        if users_own {
            reports.push(self.source.reload_users(&data, &self.global)?);
        }
        drop(guard);

        self.notify_where(|_, client_data| {
            client_data.shares_groups_with(&data) || client_data.shares_users_with(&data)
        });
        Ok(reports)
    }

    /// Drops expired permissions and sub-groups everywhere.
    ///
    /// Connected users whose data changed are notified. Returns `true` if
    /// anything was removed.
    pub fn purge_expired_permissions(&self) -> bool {
        let now = now_millis();
        let global_changed = self.global.write().purge_expired(now);

        let scopes: Vec<ScopeData> = self.state.read().scopes.values().cloned().collect();
        let mut outcomes = Vec::new();
        for data in scopes {
            let outcome = data.purge_expired_permissions(now);
            if outcome.changed() {
                outcomes.push((data, outcome));
            }
        }

        let changed = global_changed || !outcomes.is_empty();
        if changed {
            info!(
                global = global_changed,
                scopes = outcomes.len(),
                "Purged expired permissions"
            );
            self.notify_where(|client, client_data| {
                global_changed
                    || outcomes.iter().any(|(data, outcome)| {
                        (outcome.groups && client_data.shares_groups_with(data))
                            || (client_data.shares_users_with(data)
                                && outcome
                                    .users
                                    .iter()
                                    .any(|u| u.eq_ignore_ascii_case(&client.id)))
                    })
            });
        }
        changed
    }

    /// Runs the sync protocol on the global groups and on every table a
    /// scope owns.
    ///
    /// Tables are synced independently; see [`SyncReport`].
    pub fn save_changes(&self, overwrite: bool) -> SyncReport {
        let mut report = SyncReport::new();
        let mut reloaded: Vec<(ScopeData, TableKind)> = Vec::new();

        let global = self.source.sync_global(&self.global, overwrite);
        let global_reloaded = matches!(global, Ok(SyncOutcome::Reloaded(_)));
        log_sync(GLOBAL_SCOPE, TableKind::Groups, &global);
        report.push(GLOBAL_SCOPE, TableKind::Groups, global);

        for (data, groups_own, users_own) in self.owned_tables() {
            if groups_own {
                let result = self.source.sync_groups(&data, &self.global, overwrite);
                log_sync(data.name(), TableKind::Groups, &result);
                if matches!(result, Ok(SyncOutcome::Reloaded(_))) {
                    reloaded.push((data.clone(), TableKind::Groups));
                }
                report.push(data.name(), TableKind::Groups, result);
            }
            if users_own {
                let result = self.source.sync_users(&data, &self.global, overwrite);
                log_sync(data.name(), TableKind::Users, &result);
                if matches!(result, Ok(SyncOutcome::Reloaded(_))) {
                    reloaded.push((data.clone(), TableKind::Users));
                }
                report.push(data.name(), TableKind::Users, result);
            }
        }

        if global_reloaded || !reloaded.is_empty() {
            self.notify_where(|_, client_data| {
                global_reloaded
                    || reloaded.iter().any(|(data, kind)| match kind {
                        TableKind::Groups => client_data.shares_groups_with(data),
                        TableKind::Users => client_data.shares_users_with(data),
                    })
            });
        }
        report
    }

    /// Returns each loaded scope with flags telling which of its tables it
    /// owns. Fully mirrored scopes are left out.
    fn owned_tables(&self) -> Vec<(ScopeData, bool, bool)> {
        let state = self.state.read();
        state
            .scopes
            .values()
            .map(|data| {
                (
                    data.clone(),
                    !state.mirrors.has_groups_mirror(data.name()),
                    !state.mirrors.has_users_mirror(data.name()),
                )
            })
            .filter(|(_, groups, users)| *groups || *users)
            .collect()
    }

    /// Notifies every connected client for which `affected` holds.
    fn notify_where<F>(&self, affected: F)
    where
        F: Fn(&ClientInfo, &ScopeData) -> bool,
    {
        for client in self.host.online_clients() {
            let Some(data) = self.resolve_scope(&client.scope) else {
                continue;
            };
            if affected(&client, &data) {
                self.notifier.permissions_changed(&client.id, data.name());
            }
        }
    }
}

fn log_sync(scope: &str, table: TableKind, result: &Result<SyncOutcome, ward_store::StoreError>) {
    match result {
        Ok(SyncOutcome::Saved) => info!(scope = %scope, table = %table, "Saved changes"),
        Ok(SyncOutcome::Reloaded(_)) => {
            warn!(scope = %scope, table = %table, "Newer file found on disk; reloaded")
        }
        Ok(SyncOutcome::Unchanged) => {}
        Err(e) => error!(
            scope = %scope,
            table = %table,
            error = %e,
            error_type = e.error_kind(),
            "Unable to save changes"
        ),
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ScopeRegistry")
            .field("default_scope", &self.default_scope)
            .field("catch_all", &self.catch_all)
            .field("scopes", &state.scopes.keys().collect::<Vec<_>>())
            .field("mirrors", &state.mirrors)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// =============================================================================
// ScopeRegistryBuilder
// =============================================================================

/// Builder for [`ScopeRegistry`].
pub struct ScopeRegistryBuilder {
    source: YamlSource,
    global: Option<Arc<GlobalGroups>>,
    default_scope: String,
    catch_all: String,
    mirrors: Vec<MirrorEntry>,
    host: Option<Arc<dyn ScopeHost>>,
    notifier: Option<Arc<dyn PermissionNotifier>>,
}

impl ScopeRegistryBuilder {
    /// Creates a builder with the stock scope names.
    pub fn new(source: YamlSource) -> Self {
        Self {
            source,
            global: None,
            default_scope: ward_config::schema::DEFAULT_SCOPE.to_string(),
            catch_all: ward_config::schema::DEFAULT_CATCH_ALL_SCOPE.to_string(),
            mirrors: Vec::new(),
            host: None,
            notifier: None,
        }
    }

    /// Creates a builder from a loaded configuration.
    ///
    /// The host reports `scopes.active`; changes are logged.
    pub fn from_config(config: &WardConfig) -> RegistryResult<Self> {
        let source = YamlSource::new(
            config.data.scopes_path(),
            config.data.backup_path(),
            config.data.global_groups_path(),
        );
        let mut mirrors = Vec::new();
        for (scope, spec) in &config.mirrors {
            let entries = spec
                .entries(scope)
                .map_err(|e| RegistryError::UnknownMirrorFormat {
                    scope: scope.clone(),
                    message: e.to_string(),
                })?;
            mirrors.extend(entries);
        }
        Ok(Self::new(source)
            .default_scope(&config.scopes.default)
            .catch_all(&config.scopes.catch_all)
            .mirrors(mirrors)
            .host(Arc::new(StaticHost::new(config.scopes.active.clone())))
            .notifier(Arc::new(LoggingNotifier)))
    }

    /// Sets the default scope name.
    pub fn default_scope(mut self, name: impl Into<String>) -> Self {
        self.default_scope = name.into();
        self
    }

    /// Sets the catch-all scope name.
    pub fn catch_all(mut self, name: impl Into<String>) -> Self {
        self.catch_all = name.into();
        self
    }

    /// Sets the mirror entries.
    pub fn mirrors(mut self, mirrors: Vec<MirrorEntry>) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Shares an existing global group registry.
    pub fn global(mut self, global: Arc<GlobalGroups>) -> Self {
        self.global = Some(global);
        self
    }

    /// Sets the host.
    pub fn host(mut self, host: Arc<dyn ScopeHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the notifier.
    pub fn notifier(mut self, notifier: Arc<dyn PermissionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Builds the registry. Nothing is loaded until [`ScopeRegistry::reset`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoDefaultScope`] if the default scope name
    /// is empty.
    pub fn build(self) -> RegistryResult<ScopeRegistry> {
        let default_scope = self.default_scope.trim().to_lowercase();
        if default_scope.is_empty() {
            return Err(RegistryError::NoDefaultScope);
        }
        Ok(ScopeRegistry {
            source: self.source,
            global: self.global.unwrap_or_default(),
            state: RwLock::new(RegistryState::default()),
            loaded: AtomicBool::new(false),
            default_scope,
            catch_all: self.catch_all.trim().to_lowercase(),
            mirror_entries: self.mirrors,
            host: self
                .host
                .unwrap_or_else(|| Arc::new(StaticHost::new(Vec::<String>::new()))),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LoggingNotifier)),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
