// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Host collaborator traits.
//!
//! ward does not know how clients connect or how scopes come into being.
//! The embedding host supplies that through [`ScopeHost`], and is told
//! about permission changes through [`PermissionNotifier`].

use std::collections::HashMap;

use parking_lot::RwLock;

// =============================================================================
// ScopeHost
// =============================================================================

/// A connected client as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Stable identity; the user id in the user table.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Scope the client is currently in.
    pub scope: String,
}

/// Result of a client name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMatch {
    /// No client matched.
    None,
    /// Exactly one client matched.
    One(ClientInfo),
    /// Several clients matched; the number is informational.
    Ambiguous(usize),
}

impl ClientMatch {
    /// Returns the client only for an unambiguous match.
    pub fn into_single(self) -> Option<ClientInfo> {
        match self {
            ClientMatch::One(client) => Some(client),
            ClientMatch::None | ClientMatch::Ambiguous(_) => None,
        }
    }
}

/// Services the embedding host provides.
pub trait ScopeHost: Send + Sync {
    /// Returns the names of the scopes currently active on the host.
    fn active_scopes(&self) -> Vec<String>;

    /// Returns the scope a connected client is in.
    fn client_scope(&self, client_id: &str) -> Option<String>;

    /// Matches a name fragment against connected clients.
    fn match_clients(&self, fragment: &str) -> ClientMatch;

    /// Returns the clients currently connected.
    fn online_clients(&self) -> Vec<ClientInfo>;

    /// Returns `true` if the client is connected.
    fn is_online(&self, client_id: &str) -> bool {
        self.client_scope(client_id).is_some()
    }
}

/// In-memory host with a fixed scope list and a mutable client list.
///
/// Used by the operator binary, which has no live clients, and by tests.
#[derive(Debug, Default)]
pub struct StaticHost {
    scopes: Vec<String>,
    clients: RwLock<HashMap<String, ClientInfo>>,
}

impl StaticHost {
    /// Creates a host reporting `scopes` as active.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connected client.
    pub fn connect(&self, id: &str, name: &str, scope: &str) {
        self.clients.write().insert(
            id.to_ascii_lowercase(),
            ClientInfo {
                id: id.to_string(),
                name: name.to_string(),
                scope: scope.to_string(),
            },
        );
    }

    /// Removes a connected client.
    pub fn disconnect(&self, id: &str) {
        self.clients.write().remove(&id.to_ascii_lowercase());
    }
}

impl ScopeHost for StaticHost {
    fn active_scopes(&self) -> Vec<String> {
        self.scopes.clone()
    }

    fn client_scope(&self, client_id: &str) -> Option<String> {
        self.clients
            .read()
            .get(&client_id.to_ascii_lowercase())
            .map(|c| c.scope.clone())
    }

    fn match_clients(&self, fragment: &str) -> ClientMatch {
        let clients = self.clients.read();
        if let Some(exact) = clients
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(fragment))
        {
            return ClientMatch::One(exact.clone());
        }

        let fragment = fragment.to_ascii_lowercase();
        let mut matches = clients
            .values()
            .filter(|c| c.name.to_ascii_lowercase().starts_with(&fragment));
        match (matches.next(), matches.count()) {
            (None, _) => ClientMatch::None,
            (Some(client), 0) => ClientMatch::One(client.clone()),
            (Some(_), rest) => ClientMatch::Ambiguous(rest + 1),
        }
    }

    fn online_clients(&self) -> Vec<ClientInfo> {
        self.clients.read().values().cloned().collect()
    }
}

// =============================================================================
// PermissionNotifier
// =============================================================================

/// Receives notice that a user's effective permissions may have changed.
pub trait PermissionNotifier: Send + Sync {
    /// Called for each affected connected user.
    fn permissions_changed(&self, user_id: &str, scope: &str);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl PermissionNotifier for NoOpNotifier {
    fn permissions_changed(&self, _user_id: &str, _scope: &str) {}
}

/// Notifier that logs every change.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl PermissionNotifier for LoggingNotifier {
    fn permissions_changed(&self, user_id: &str, scope: &str) {
        tracing::info!(user = %user_id, scope = %scope, "Permissions changed");
    }
}

// =============================================================================
// Tests
// =============================================================================
