//! The evaluation engine. Decides access for one principal and one
//! entity instance.
//!
//! Evaluation order: cache lookup → policy lookup → admin bypass → rule
//! walk → cache store. The admin bypass precedes rule evaluation for every
//! policy uniformly; it is not a rule, so policies cannot opt out of it.
//!
//! Failure semantics: collaborator/storage failure propagates as
//! [`EngineError`] to the caller. Authorization fails closed and visibly;
//! an outage is never converted into a quiet denial.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::cache::{AccessCache, CacheKey};
use crate::directory::{Directory, DirectoryError, PermissionChecker};
use crate::linkage::{self, LinkageContext};
use crate::policy::{Condition, EntityAccessPolicy, PolicyRegistry, Rule};
use crate::types::{AccessResult, Principal};

/// Errors surfaced by evaluation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A collaborator lookup failed at the infrastructure level.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Per-call evaluation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateOptions {
    /// Bypass the decision cache for this call (the fresh result is still
    /// stored).
    pub skip_cache: bool,
}

/// The access evaluation engine.
///
/// Explicitly constructed at the composition root with its registry, cache,
/// and collaborators injected; tests build isolated instances without any
/// shared global state.
pub struct AccessEngine {
    registry: Arc<PolicyRegistry>,
    cache: Arc<AccessCache>,
    permissions: Arc<dyn PermissionChecker>,
    directory: Arc<dyn Directory>,
    admin_permission: String,
}

impl AccessEngine {
    /// Build an engine.
    ///
    /// `admin_permission` is the global permission key whose holders bypass
    /// rule evaluation entirely.
    pub fn new(
        registry: Arc<PolicyRegistry>,
        cache: Arc<AccessCache>,
        permissions: Arc<dyn PermissionChecker>,
        directory: Arc<dyn Directory>,
        admin_permission: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            cache,
            permissions,
            directory,
            admin_permission: admin_permission.into(),
        }
    }

    /// Evaluate whether `principal` may act on `entity_id` under the policy
    /// named `policy_id`.
    ///
    /// An unknown policy id yields a denial that is deliberately not
    /// cached: the policy may be registered later in the same process
    /// lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when a collaborator lookup fails.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        policy_id: &str,
        entity_id: &str,
        opts: EvaluateOptions,
    ) -> Result<AccessResult, EngineError> {
        let key = CacheKey::new(&principal.id, policy_id, entity_id);

        if !opts.skip_cache {
            if let Some(hit) = self.cache.get(&key) {
                debug!(
                    principal = %principal.id,
                    policy = policy_id,
                    entity = entity_id,
                    granted = hit.granted,
                    "access decision served from cache"
                );
                return Ok(hit);
            }
        }

        let Some(policy) = self.registry.get(policy_id) else {
            debug!(principal = %principal.id, policy = policy_id, "unknown policy, denying");
            return Ok(AccessResult::denied("unknown policy"));
        };

        if self
            .permissions
            .has_permission(&principal.id, &self.admin_permission)
            .await?
        {
            let result = AccessResult::granted("admin bypass");
            debug!(
                principal = %principal.id,
                policy = policy_id,
                entity = entity_id,
                "access granted via admin bypass"
            );
            self.cache.insert(key, result.clone());
            return Ok(result);
        }

        let mut granted = false;
        // Top-level rules are implicitly OR'd; stop at the first satisfied one.
        for rule in &policy.rules {
            if self.eval_rule(rule, principal, &policy, entity_id).await? {
                granted = true;
                break;
            }
        }

        let result = if granted {
            AccessResult::granted("access rule matched")
        } else {
            AccessResult::denied("no matching access rules")
        };
        debug!(
            principal = %principal.id,
            policy = policy_id,
            entity = entity_id,
            granted = result.granted,
            "access decision computed"
        );
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Evaluate one policy across many entity ids concurrently.
    ///
    /// Each id is evaluated independently (own cache hit or miss, no shared
    /// transaction); results are keyed by entity id. Callers bound the
    /// batch size: the HTTP layer caps it before reaching here.
    ///
    /// # Errors
    ///
    /// Returns the first [`EngineError`] any evaluation hits.
    pub async fn evaluate_batch(
        &self,
        principal: &Principal,
        policy_id: &str,
        entity_ids: &[String],
        opts: EvaluateOptions,
    ) -> Result<HashMap<String, AccessResult>, EngineError> {
        let evaluations = entity_ids.iter().map(|entity_id| async move {
            let result = self.evaluate(principal, policy_id, entity_id, opts).await?;
            Ok::<_, EngineError>((entity_id.clone(), result))
        });
        let pairs = futures::future::try_join_all(evaluations).await?;
        Ok(pairs.into_iter().collect())
    }

    async fn eval_rule(
        &self,
        rule: &Rule,
        principal: &Principal,
        policy: &EntityAccessPolicy,
        entity_id: &str,
    ) -> Result<bool, EngineError> {
        match rule {
            Rule::Condition(condition) => {
                self.eval_condition(condition, principal, policy, entity_id)
                    .await
            }
            Rule::Any { any } => {
                for condition in any {
                    if self
                        .eval_condition(condition, principal, policy, entity_id)
                        .await?
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::All { all } => {
                // An empty requirement list grants nothing.
                if all.is_empty() {
                    return Ok(false);
                }
                for condition in all {
                    if !self
                        .eval_condition(condition, principal, policy, entity_id)
                        .await?
                    {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    async fn eval_condition(
        &self,
        condition: &Condition,
        principal: &Principal,
        policy: &EntityAccessPolicy,
        entity_id: &str,
    ) -> Result<bool, EngineError> {
        if let Some(permission) = &condition.permission {
            if !self
                .permissions
                .has_permission(&principal.id, permission)
                .await?
            {
                // Missing permission decides the condition; the linkage is
                // not consulted.
                return Ok(false);
            }
            if condition.linkage.is_none() {
                return Ok(true);
            }
        }

        match condition.linkage {
            Some(kind) => {
                let ctx = LinkageContext {
                    principal_id: &principal.id,
                    principal_email: &principal.email,
                    entity_type: policy.entity_type,
                    entity_id,
                };
                Ok(linkage::resolve(kind, &ctx, self.directory.as_ref()).await?)
            }
            // A condition with neither field is vacuously false.
            None => Ok(false),
        }
    }
}
