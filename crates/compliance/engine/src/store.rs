//! The instance store: versioned compare-and-swap persistence
//!
//! The store is the only shared mutable state in the engine. Writers
//! never hold the lock across computation: they read a clone, compute,
//! and swap back conditioned on the version they read. A stale writer
//! gets `VersionConflict` and retries from a fresh read.

use std::collections::HashMap;
use std::sync::RwLock;

use compliance_types::{
    BusinessEntityId, InstanceId, WorkflowError, WorkflowInstance, WorkflowKind, WorkflowResult,
};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreInner {
    instances: HashMap<InstanceId, WorkflowInstance>,
    /// One non-terminal instance per (entity, kind)
    active: HashMap<(BusinessEntityId, WorkflowKind), InstanceId>,
}

/// In-memory instance store guarded by a single `RwLock`
#[derive(Debug, Default)]
pub struct InstanceStore {
    inner: RwLock<StoreInner>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh instance, enforcing the one-active-instance
    /// invariant per (entity, kind).
    pub fn create(&self, instance: WorkflowInstance) -> WorkflowResult<()> {
        let mut inner = self.inner.write().map_err(|_| WorkflowError::StorePoisoned)?;
        let key = (instance.business_entity_id.clone(), instance.kind);
        if let Some(existing) = inner.active.get(&key) {
            // A stale index entry pointing at a terminal instance does
            // not block a new run.
            let still_active = inner
                .instances
                .get(existing)
                .map(|i| !i.is_terminal())
                .unwrap_or(false);
            if still_active {
                return Err(WorkflowError::ActiveInstanceExists {
                    entity: instance.business_entity_id.clone(),
                    kind: instance.kind,
                });
            }
        }
        info!(
            instance = %instance.id.short(),
            entity = %instance.business_entity_id,
            kind = %instance.kind,
            "created workflow instance"
        );
        inner.active.insert(key, instance.id.clone());
        inner.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    /// A clone of the stored instance
    pub fn get(&self, id: &InstanceId) -> WorkflowResult<WorkflowInstance> {
        let inner = self.inner.read().map_err(|_| WorkflowError::StorePoisoned)?;
        inner
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.clone()))
    }

    /// The active instance for an (entity, kind), if any
    pub fn active_for(
        &self,
        entity: &BusinessEntityId,
        kind: WorkflowKind,
    ) -> WorkflowResult<Option<WorkflowInstance>> {
        let inner = self.inner.read().map_err(|_| WorkflowError::StorePoisoned)?;
        Ok(inner
            .active
            .get(&(entity.clone(), kind))
            .and_then(|id| inner.instances.get(id))
            .filter(|i| !i.is_terminal())
            .cloned())
    }

    /// Replace the stored instance iff its version still equals
    /// `expected`. On success the stored version becomes `expected + 1`
    /// and a terminal instance is dropped from the active index.
    pub fn compare_and_swap(
        &self,
        id: &InstanceId,
        expected: u64,
        mut updated: WorkflowInstance,
    ) -> WorkflowResult<WorkflowInstance> {
        let mut inner = self.inner.write().map_err(|_| WorkflowError::StorePoisoned)?;
        let current = inner
            .instances
            .get(id)
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.clone()))?;

        if current.version != expected {
            debug!(
                instance = %id.short(),
                expected,
                actual = current.version,
                "version conflict"
            );
            return Err(WorkflowError::VersionConflict {
                instance: id.clone(),
                expected,
                actual: current.version,
            });
        }

        updated.version = expected + 1;
        if updated.is_terminal() {
            // Only evict the index entry if it still points at this
            // instance; a newer active run may have claimed the slot.
            let key = (updated.business_entity_id.clone(), updated.kind);
            if inner.active.get(&key) == Some(id) {
                inner.active.remove(&key);
            }
        }
        inner.instances.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.instances.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::{PhaseDefinition, TaskDefinition, WorkflowDefinition};

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new(WorkflowKind::Dissolution, "Dissolution").with_phase(
            PhaseDefinition::new("one", "One", 1).with_task(TaskDefinition::new("t", "T")),
        )
    }

    fn instance(entity: &str) -> WorkflowInstance {
        WorkflowInstance::from_definition(&definition(), BusinessEntityId::new(entity))
    }

    #[test]
    fn test_create_and_get() {
        let store = InstanceStore::new();
        let inst = instance("biz-1");
        let id = inst.id.clone();
        store.create(inst).unwrap();

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.version, 0);
    }

    #[test]
    fn test_one_active_instance_per_entity_and_kind() {
        let store = InstanceStore::new();
        store.create(instance("biz-1")).unwrap();

        assert!(matches!(
            store.create(instance("biz-1")),
            Err(WorkflowError::ActiveInstanceExists { .. })
        ));
        // A different entity is unaffected.
        store.create(instance("biz-2")).unwrap();
    }

    #[test]
    fn test_terminal_instance_frees_the_slot() {
        let store = InstanceStore::new();
        let inst = instance("biz-1");
        let id = inst.id.clone();
        store.create(inst).unwrap();

        let mut cancelled = store.get(&id).unwrap();
        cancelled.cancel();
        store.compare_and_swap(&id, 0, cancelled).unwrap();

        assert!(store.active_for(&BusinessEntityId::new("biz-1"), WorkflowKind::Dissolution)
            .unwrap()
            .is_none());
        store.create(instance("biz-1")).unwrap();
        // History of the cancelled run is retained.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_terminal_cas_on_old_run_keeps_newer_active_entry() {
        let store = InstanceStore::new();
        let old = instance("biz-1");
        let old_id = old.id.clone();
        store.create(old).unwrap();

        let mut cancelled = store.get(&old_id).unwrap();
        cancelled.cancel();
        store.compare_and_swap(&old_id, 0, cancelled).unwrap();

        // A newer run claims the (entity, kind) slot.
        let newer = instance("biz-1");
        let newer_id = newer.id.clone();
        store.create(newer).unwrap();

        // A late write against the old terminal run must not evict the
        // newer run's index entry.
        let stale = store.get(&old_id).unwrap();
        store
            .compare_and_swap(&old_id, stale.version, stale)
            .unwrap();

        let active = store
            .active_for(&BusinessEntityId::new("biz-1"), WorkflowKind::Dissolution)
            .unwrap()
            .unwrap();
        assert_eq!(active.id, newer_id);
        assert!(matches!(
            store.create(instance("biz-1")),
            Err(WorkflowError::ActiveInstanceExists { .. })
        ));
    }

    #[test]
    fn test_cas_advances_version_by_one() {
        let store = InstanceStore::new();
        let inst = instance("biz-1");
        let id = inst.id.clone();
        store.create(inst).unwrap();

        let read = store.get(&id).unwrap();
        let stored = store.compare_and_swap(&id, read.version, read).unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(store.get(&id).unwrap().version, 1);
    }

    #[test]
    fn test_stale_writer_gets_version_conflict() {
        let store = InstanceStore::new();
        let inst = instance("biz-1");
        let id = inst.id.clone();
        store.create(inst).unwrap();

        let stale = store.get(&id).unwrap();
        let fresh = store.get(&id).unwrap();
        store.compare_and_swap(&id, fresh.version, fresh).unwrap();

        match store.compare_and_swap(&id, stale.version, stale) {
            Err(WorkflowError::VersionConflict { expected, actual, .. }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected VersionConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_instance() {
        let store = InstanceStore::new();
        let id = InstanceId::new("nope");
        assert!(matches!(
            store.get(&id),
            Err(WorkflowError::InstanceNotFound(_))
        ));
        assert!(matches!(
            store.compare_and_swap(&id, 0, instance("biz-1")),
            Err(WorkflowError::InstanceNotFound(_))
        ));
    }
}
