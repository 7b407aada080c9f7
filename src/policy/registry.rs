//! Policy registry: the static catalog of registered policies.
//!
//! Policies are loaded once at startup (see [`super::catalog`]) but late
//! registration is supported: the engine never caches an unknown-policy
//! denial, so a policy registered mid-flight is picked up immediately.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use super::{EntityAccessPolicy, PolicySummary};

/// Registration errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A policy with this id is already registered. Overwriting is refused
    /// because it could silently widen access.
    #[error("policy already registered: {0}")]
    Duplicate(String),
}

/// Lookup table of registered policies.
///
/// Reads vastly outnumber writes; a sync [`RwLock`] is fine because every
/// critical section is short and synchronous.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, EntityAccessPolicy>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the id is already taken.
    pub fn register(&self, policy: EntityAccessPolicy) -> Result<(), RegistryError> {
        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if policies.contains_key(&policy.id) {
            return Err(RegistryError::Duplicate(policy.id));
        }
        tracing::debug!(policy = %policy.id, entity_type = %policy.entity_type, "policy registered");
        policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    /// Look up a policy by id.
    pub fn get(&self, id: &str) -> Option<EntityAccessPolicy> {
        let policies = self
            .policies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        policies.get(id).cloned()
    }

    /// Administrative summaries of all registered policies, sorted by id.
    ///
    /// Rule bodies are not included (see [`PolicySummary`]).
    pub fn summaries(&self) -> Vec<PolicySummary> {
        let policies = self
            .policies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut summaries: Vec<PolicySummary> = policies.values().map(PolicySummary::from).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        let policies = self
            .policies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        policies.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
