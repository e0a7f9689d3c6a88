//! Registry of validated workflow definitions
//!
//! Definitions are validated on registration and immutable afterwards.
//! A malformed definition is rejected at load time, never skipped.

use std::collections::HashMap;

use compliance_types::{WorkflowDefinition, WorkflowError, WorkflowKind, WorkflowResult};
use tracing::info;

use crate::catalog;

/// Holds one validated definition per workflow kind
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<WorkflowKind, WorkflowDefinition>,
}

impl DefinitionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the shipped catalog
    pub fn builtin() -> WorkflowResult<Self> {
        let mut registry = Self::new();
        registry.register(catalog::dissolution())?;
        registry.register(catalog::name_change())?;
        registry.register(catalog::license_discovery())?;
        Ok(registry)
    }

    /// Validate and register a definition, replacing any existing one
    /// for the same kind
    pub fn register(&mut self, definition: WorkflowDefinition) -> WorkflowResult<()> {
        definition.validate()?;
        info!(
            kind = %definition.kind,
            name = %definition.name,
            phases = definition.phases.len(),
            tasks = definition.task_count(),
            "registered workflow definition"
        );
        self.definitions.insert(definition.kind, definition);
        Ok(())
    }

    /// Look up the definition for a kind
    pub fn get(&self, kind: WorkflowKind) -> WorkflowResult<&WorkflowDefinition> {
        self.definitions
            .get(&kind)
            .ok_or(WorkflowError::UnknownWorkflowKind(kind))
    }

    /// Registered kinds, in no particular order
    pub fn kinds(&self) -> impl Iterator<Item = WorkflowKind> + '_ {
        self.definitions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
