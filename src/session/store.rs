//! Call-partitioned storage for [`SessionContext`]s.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::context::{ContextUpdate, SessionContext};

/// Whether a handle points at the shared per-call context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextScope {
    /// Shared by every persona of the call through the store
    Call,
    /// Private to one persona instance; nothing carries over a handoff
    Local,
}

/// Shared reference to one call's context.
///
/// Access is closure-scoped so no lock guard can be held across an await.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    inner: Arc<RwLock<SessionContext>>,
    scope: ContextScope,
}

impl ContextHandle {
    fn call_scoped(context: SessionContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
            scope: ContextScope::Call,
        }
    }

    /// Context for a persona running without a call-scoped store
    pub fn local(call_id: impl Into<String>) -> Self {
        let call_id = call_id.into();
        warn!(call_id = %call_id, "No call-scoped session store, using a persona-local context");
        Self {
            inner: Arc::new(RwLock::new(SessionContext::new(call_id))),
            scope: ContextScope::Local,
        }
    }

    pub fn scope(&self) -> ContextScope {
        self.scope
    }

    pub fn call_id(&self) -> String {
        self.inner.read().call_id().to_string()
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionContext) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn update(&self, update: ContextUpdate) {
        self.inner.write().apply(update);
    }

    /// Apply several updates under one write lock
    pub fn update_all(&self, updates: impl IntoIterator<Item = ContextUpdate>) {
        self.inner.write().apply_all(updates);
    }

    pub fn snapshot(&self) -> SessionContext {
        self.inner.read().clone()
    }

    /// Handle to give the next persona instance of this call
    pub fn for_successor(&self) -> ContextHandle {
        match self.scope {
            ContextScope::Call => self.clone(),
            ContextScope::Local => ContextHandle::local(self.call_id()),
        }
    }

    /// Whether two handles share the same underlying context
    pub fn same_context(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Process-local map from call id to that call's context
#[derive(Debug, Default)]
pub struct SessionStore {
    calls: RwLock<HashMap<String, ContextHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh context for a call, replacing any stale one
    pub fn open(&self, call_id: &str) -> ContextHandle {
        let handle = ContextHandle::call_scoped(SessionContext::new(call_id));
        if self
            .calls
            .write()
            .insert(call_id.to_string(), handle.clone())
            .is_some()
        {
            warn!(call_id = %call_id, "Replaced stale session context at call start");
        }
        debug!(call_id = %call_id, "Session context opened");
        handle
    }

    pub fn get(&self, call_id: &str) -> Option<ContextHandle> {
        self.calls.read().get(call_id).cloned()
    }

    /// Drop a call's context, returning its final state
    pub fn close(&self, call_id: &str) -> Option<SessionContext> {
        let handle = self.calls.write().remove(call_id)?;
        debug!(call_id = %call_id, "Session context closed");
        Some(handle.snapshot())
    }

    pub fn active_calls(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.calls.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }
}
