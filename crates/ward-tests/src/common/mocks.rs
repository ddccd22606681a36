// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Collaborators that record their interactions for verification.

use parking_lot::Mutex;

use ward_core::PermissionNotifier;

// =============================================================================
// Recording Notifier
// =============================================================================

/// A notifier that records every `(user, scope)` pair it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded calls in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Returns the ids of notified users, sorted and deduplicated.
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.calls.lock().iter().map(|(u, _)| u.clone()).collect();
        users.sort();
        users.dedup();
        users
    }

    /// Returns `true` if `user_id` was notified.
    pub fn was_notified(&self, user_id: &str) -> bool {
        self.calls.lock().iter().any(|(u, _)| u == user_id)
    }

    /// Returns the number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl PermissionNotifier for RecordingNotifier {
    fn permissions_changed(&self, user_id: &str, scope: &str) {
        self.calls
            .lock()
            .push((user_id.to_string(), scope.to_string()));
    }
}
