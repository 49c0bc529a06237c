//! Access audit logging.
//!
//! Administrative mutations (role lifecycle, assignments, permission
//! changes) each emit one event. Recording is fire-and-forget: sinks are
//! infallible at the trait boundary and can never block or fail the action
//! being audited.

use crate::SecurityRole;
use chrono::{DateTime, Utc};
use hearth_core::{AuditEventId, RequestId, RoleId, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event ID.
    pub id: AuditEventId,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event kind.
    pub kind: AuditEventKind,
    /// Who performed the action.
    pub actor_id: UserId,
    /// The user acted upon, for assignments and permission changes.
    pub target_user_id: Option<UserId>,
    /// The role involved, if any.
    pub role_id: Option<RoleId>,
    /// Action name.
    pub action: String,
    /// State before the change.
    pub before: Option<serde_json::Value>,
    /// State after the change.
    pub after: Option<serde_json::Value>,
    /// Originating request, when known.
    pub request_id: Option<RequestId>,
}

impl AuditEvent {
    /// Creates a new audit event.
    pub fn new(kind: AuditEventKind, actor_id: UserId, action: impl Into<String>) -> Self {
        Self {
            id: AuditEventId::new(),
            timestamp: Utc::now(),
            kind,
            actor_id,
            target_user_id: None,
            role_id: None,
            action: action.into(),
            before: None,
            after: None,
            request_id: None,
        }
    }

    /// Sets the target user.
    #[must_use]
    pub fn with_target_user(mut self, user_id: UserId) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    /// Sets the before state.
    #[must_use]
    pub fn with_before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Sets the after state.
    #[must_use]
    pub fn with_after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }

    /// Sets the originating request.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Audit event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A role was created.
    RoleCreated,
    /// A role was updated.
    RoleUpdated,
    /// A role was deleted.
    RoleDeleted,
    /// A role was assigned to a user.
    RoleAssigned,
    /// A role was removed from a user.
    RoleRevoked,
    /// A custom permission override changed.
    PermissionChanged,
}

/// Audit log sink trait.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);

    /// Flushes any buffered events.
    fn flush(&self);
}

/// In-memory audit sink (for testing/development).
pub struct InMemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Creates a new in-memory sink.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events,
        }
    }

    /// Returns all events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Clears all events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: AuditEventKind) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        let mut events = self.events.write();
        events.push(event.clone());

        // Trim if over limit
        if events.len() > self.max_events {
            events.remove(0);
        }
    }

    fn flush(&self) {
        // No-op for in-memory
    }
}

/// Audit sink that logs structured tracing events.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            kind = ?event.kind,
            actor_id = %event.actor_id,
            target_user_id = ?event.target_user_id,
            role_id = ?event.role_id,
            action = %event.action,
            "Access audit"
        );
    }

    fn flush(&self) {
        // No-op for tracing
    }
}

/// Access audit service fanning events out to every registered sink.
#[derive(Default)]
pub struct AccessAudit {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AccessAudit {
    /// Creates a new audit service with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn add_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    /// Records an event to all sinks.
    pub fn record(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }

    /// Records a role creation.
    pub fn record_role_created(&self, actor_id: UserId, role: &SecurityRole) {
        let event = AuditEvent::new(AuditEventKind::RoleCreated, actor_id, "create_role")
            .with_role(role.id)
            .with_after(snapshot(role));
        self.record(&event);
    }

    /// Records a role update with before/after snapshots.
    pub fn record_role_updated(&self, actor_id: UserId, before: &SecurityRole, after: &SecurityRole) {
        let event = AuditEvent::new(AuditEventKind::RoleUpdated, actor_id, "update_role")
            .with_role(after.id)
            .with_before(snapshot(before))
            .with_after(snapshot(after));
        self.record(&event);
    }

    /// Records a role deletion.
    pub fn record_role_deleted(&self, actor_id: UserId, role: &SecurityRole) {
        let event = AuditEvent::new(AuditEventKind::RoleDeleted, actor_id, "delete_role")
            .with_role(role.id)
            .with_before(snapshot(role));
        self.record(&event);
    }

    /// Records a role assignment or revocation.
    pub fn record_role_assignment(
        &self,
        actor_id: UserId,
        target_user_id: UserId,
        role_id: RoleId,
        assigned: bool,
    ) {
        let kind = if assigned {
            AuditEventKind::RoleAssigned
        } else {
            AuditEventKind::RoleRevoked
        };
        let action = if assigned { "assign_role" } else { "revoke_role" };
        let event = AuditEvent::new(kind, actor_id, action)
            .with_target_user(target_user_id)
            .with_role(role_id);
        self.record(&event);
    }

    /// Records a custom-permission change.
    pub fn record_permission_change(
        &self,
        actor_id: UserId,
        target_user_id: UserId,
        permission: &str,
        granted: bool,
    ) {
        let event = AuditEvent::new(AuditEventKind::PermissionChanged, actor_id, "set_custom_permission")
            .with_target_user(target_user_id)
            .with_after(serde_json::json!({ "permission": permission, "granted": granted }));
        self.record(&event);
    }

    /// Flushes all sinks.
    pub fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

/// Serializes a role for before/after snapshots; serialization failures are
/// recorded as null rather than surfaced.
fn snapshot(role: &SecurityRole) -> serde_json::Value {
    serde_json::to_value(role).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_sink_limit() {
        let sink = InMemoryAuditSink::new(5);

        for _ in 0..10 {
            let event = AuditEvent::new(AuditEventKind::RoleAssigned, UserId::new(), "assign_role");
            sink.record(&event);
        }

        assert_eq!(sink.events().len(), 5);
    }

    #[test]
    fn test_fan_out_and_filtering() {
        let sink = Arc::new(InMemoryAuditSink::new(100));
        let mut audit = AccessAudit::new();
        audit.add_sink(sink.clone());
        audit.add_sink(Arc::new(TracingAuditSink));

        let actor = UserId::new();
        let target = UserId::new();
        let role_id = RoleId::new();
        audit.record_role_assignment(actor, target, role_id, true);
        audit.record_role_assignment(actor, target, role_id, false);
        audit.record_permission_change(actor, target, "special:approve_content", true);

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.events_of_kind(AuditEventKind::RoleAssigned).len(), 1);
        assert_eq!(sink.events_of_kind(AuditEventKind::RoleRevoked).len(), 1);

        let change = &sink.events_of_kind(AuditEventKind::PermissionChanged)[0];
        assert_eq!(change.target_user_id, Some(target));
        assert_eq!(change.after.as_ref().unwrap()["granted"], true);
    }

    #[test]
    fn test_role_snapshots() {
        let sink = Arc::new(InMemoryAuditSink::new(10));
        let mut audit = AccessAudit::new();
        audit.add_sink(sink.clone());

        let role = crate::role::seeds::guest();
        audit.record_role_created(UserId::new(), &role);

        let event = &sink.events()[0];
        assert_eq!(event.role_id, Some(role.id));
        assert_eq!(event.after.as_ref().unwrap()["name"], "Guest");
    }
}
