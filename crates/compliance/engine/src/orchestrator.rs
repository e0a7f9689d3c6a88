//! The orchestrator: sole public facade over the engine
//!
//! Every mutation follows the same shape: read a clone of the instance,
//! validate against the definition, apply the change, and write back
//! through compare-and-swap. A version conflict means another writer won
//! the race; the operation retries from a fresh read up to a bounded
//! number of attempts before surfacing `ConcurrentModification`.
//!
//! Derived views (eligibility, progress, alerts) are recomputed for the
//! snapshot every operation returns; they are never persisted.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};
use compliance_discovery::{
    BusinessProfile, DiscoveryEngine, DiscoveryReport, Requirement, RequirementLedger, RuleCorpus,
};
use compliance_types::{
    AlertThresholds, BusinessEntityId, InstanceId, StatusSnapshot, TaskKey, TaskOutcome,
    TaskStatus, WorkflowDefinition, WorkflowError, WorkflowInstance, WorkflowKind, WorkflowResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{CompletionAggregator, DeadlineTracker, DefinitionRegistry, DependencyResolver, InstanceStore};

// ── Configuration ────────────────────────────────────────────────────

/// Tunable orchestrator behavior
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Alert severity windows
    pub thresholds: AlertThresholds,
    /// Attempts per mutation before a version conflict escalates to
    /// `ConcurrentModification`
    pub cas_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            cas_attempts: 4,
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────

/// Coordinates the registry, store, and derived-view computation.
/// Exclusively owns instance mutation.
pub struct WorkflowOrchestrator {
    registry: DefinitionRegistry,
    store: InstanceStore,
    resolver: DependencyResolver,
    aggregator: CompletionAggregator,
    tracker: DeadlineTracker,
    discovery: DiscoveryEngine,
    corpus: RuleCorpus,
    ledgers: RwLock<HashMap<BusinessEntityId, RequirementLedger>>,
    config: OrchestratorConfig,
}

impl WorkflowOrchestrator {
    pub fn new(registry: DefinitionRegistry) -> Self {
        Self {
            registry,
            store: InstanceStore::new(),
            resolver: DependencyResolver::new(),
            aggregator: CompletionAggregator::new(),
            tracker: DeadlineTracker::new(),
            discovery: DiscoveryEngine::new(),
            corpus: RuleCorpus::standard(),
            ledgers: RwLock::new(HashMap::new()),
            config: OrchestratorConfig::default(),
        }
    }

    /// An orchestrator over the shipped workflow catalog
    pub fn builtin() -> WorkflowResult<Self> {
        Ok(Self::new(DefinitionRegistry::builtin()?))
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_corpus(mut self, corpus: RuleCorpus) -> Self {
        self.corpus = corpus;
        self
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Start a workflow for a business entity. Fails if a non-terminal
    /// instance of the same kind already exists for the entity.
    pub fn initiate(
        &self,
        entity: BusinessEntityId,
        kind: WorkflowKind,
        metadata: HashMap<String, String>,
    ) -> WorkflowResult<StatusSnapshot> {
        let definition = self.registry.get(kind)?;
        let mut instance = WorkflowInstance::from_definition(definition, entity);
        instance.metadata = metadata;

        self.store.create(instance.clone())?;
        info!(
            instance = %instance.id.short(),
            kind = %kind,
            tasks = instance.tasks.len(),
            "workflow initiated"
        );
        Ok(self.snapshot(definition, instance, Utc::now().date_naive()))
    }

    /// Mark an eligible task in progress
    pub fn begin(&self, id: &InstanceId, task: &TaskKey) -> WorkflowResult<StatusSnapshot> {
        let stored = self.mutate(id, |resolver, definition, instance| {
            resolver.ensure_actionable(definition, instance, task)?;
            instance.begin_task(task);
            Ok(())
        })?;
        let definition = self.registry.get(stored.kind)?;
        Ok(self.snapshot(definition, stored, Utc::now().date_naive()))
    }

    /// Close a task with an outcome and caller metadata.
    ///
    /// Completing the final open task completes the instance. A rejected
    /// task leaves the instance active with its dependents locked.
    pub fn advance(
        &self,
        id: &InstanceId,
        task: &TaskKey,
        outcome: TaskOutcome,
        metadata: HashMap<String, String>,
    ) -> WorkflowResult<StatusSnapshot> {
        let stored = self.mutate(id, |resolver, definition, instance| {
            resolver.ensure_actionable(definition, instance, task)?;
            instance.close_task(task, outcome, metadata.clone());
            Self::sync_blocked(definition, instance);
            if instance.all_completed() {
                instance.complete();
            }
            Ok(())
        })?;

        info!(
            instance = %stored.id.short(),
            task = %task,
            outcome = ?outcome,
            state = %stored.state,
            "task closed"
        );
        let definition = self.registry.get(stored.kind)?;
        Ok(self.snapshot(definition, stored, Utc::now().date_naive()))
    }

    /// Current status, evaluated as of today
    pub fn get_status(&self, id: &InstanceId) -> WorkflowResult<StatusSnapshot> {
        self.status_at(id, Utc::now().date_naive())
    }

    /// Status with deadlines evaluated as of an arbitrary date
    pub fn status_at(&self, id: &InstanceId, as_of: NaiveDate) -> WorkflowResult<StatusSnapshot> {
        let instance = self.store.get(id)?;
        let definition = self.registry.get(instance.kind)?;
        Ok(self.snapshot(definition, instance, as_of))
    }

    /// Cancel an active instance, retaining all task history
    pub fn cancel(&self, id: &InstanceId) -> WorkflowResult<StatusSnapshot> {
        let stored = self.mutate(id, |_, _, instance| {
            instance.cancel();
            Ok(())
        })?;
        info!(instance = %stored.id.short(), "workflow cancelled");
        let definition = self.registry.get(stored.kind)?;
        Ok(self.snapshot(definition, stored, Utc::now().date_naive()))
    }

    /// Run license discovery for a license-discovery instance.
    ///
    /// Evaluates the rule corpus against the profile, records the result
    /// as a new ledger generation for the entity, and completes the
    /// instance's discovery task through the normal advance path with the
    /// requirement count in its metadata.
    pub fn run_discovery(
        &self,
        id: &InstanceId,
        profile: &BusinessProfile,
    ) -> WorkflowResult<(DiscoveryReport, StatusSnapshot)> {
        let instance = self.store.get(id)?;
        let report = self.discovery.discover(profile, &self.corpus);
        debug!(
            instance = %id.short(),
            requirements = report.requirements.len(),
            partial = report.partial,
            "discovery evaluated"
        );

        let mut metadata = HashMap::new();
        metadata.insert(
            "requirement_count".to_string(),
            report.requirements.len().to_string(),
        );
        metadata.insert("partial".to_string(), report.partial.to_string());

        let snapshot = self.advance(
            id,
            &TaskKey::new("run_discovery"),
            TaskOutcome::Completed,
            metadata,
        )?;

        // Record a ledger generation only for a run that actually closed
        // the discovery task.
        let mut ledgers = self
            .ledgers
            .write()
            .map_err(|_| WorkflowError::StorePoisoned)?;
        ledgers
            .entry(instance.business_entity_id)
            .or_default()
            .record(report.requirements.clone());

        Ok((report, snapshot))
    }

    /// The current (latest-generation) requirements for an entity
    pub fn requirements(&self, entity: &BusinessEntityId) -> WorkflowResult<Vec<Requirement>> {
        let ledgers = self
            .ledgers
            .read()
            .map_err(|_| WorkflowError::StorePoisoned)?;
        Ok(ledgers
            .get(entity)
            .map(|l| l.current().to_vec())
            .unwrap_or_default())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Read-validate-write with bounded CAS retry.
    ///
    /// Invariant violations from `apply` are surfaced immediately; only
    /// version conflicts are retried.
    fn mutate<F>(&self, id: &InstanceId, mut apply: F) -> WorkflowResult<WorkflowInstance>
    where
        F: FnMut(
            &DependencyResolver,
            &WorkflowDefinition,
            &mut WorkflowInstance,
        ) -> WorkflowResult<()>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let current = self.store.get(id)?;
            if current.is_terminal() {
                return Err(WorkflowError::InstanceTerminal {
                    instance: current.id,
                    state: current.state,
                });
            }
            let definition = self.registry.get(current.kind)?;
            let expected = current.version;
            let mut next = current;
            apply(&self.resolver, definition, &mut next)?;

            match self.store.compare_and_swap(id, expected, next) {
                Ok(stored) => return Ok(stored),
                Err(WorkflowError::VersionConflict { .. })
                    if attempts < self.config.cas_attempts =>
                {
                    debug!(instance = %id.short(), attempts, "retrying after version conflict");
                }
                Err(WorkflowError::VersionConflict { .. }) => {
                    return Err(WorkflowError::ConcurrentModification {
                        instance: id.clone(),
                        attempts,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Recompute stored blocked flags from the dependency graph so the
    /// persisted task statuses match derived eligibility.
    fn sync_blocked(definition: &WorkflowDefinition, instance: &mut WorkflowInstance) {
        for task in definition.tasks() {
            let satisfied = task.depends_on.iter().all(|dep| {
                instance
                    .task(dep)
                    .map(|s| s.status == TaskStatus::Completed)
                    .unwrap_or(false)
            });
            instance.set_blocked(&task.key, !satisfied);
        }
    }

    fn snapshot(
        &self,
        definition: &WorkflowDefinition,
        instance: WorkflowInstance,
        as_of: NaiveDate,
    ) -> StatusSnapshot {
        let eligibility = self.resolver.resolve(definition, &instance);
        let current_phase = self.resolver.current_phase(definition, &instance);
        let progress = self.aggregator.aggregate(definition, &instance);
        let alerts = self
            .tracker
            .alerts(definition, &instance, as_of, &self.config.thresholds);
        StatusSnapshot {
            instance,
            eligibility,
            current_phase,
            progress,
            alerts,
        }
    }
}
